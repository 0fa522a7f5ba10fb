use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// How the candidate JSON substring is located in raw model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionStrategy {
    /// First `{` through last `}` inclusive, with no structural check.
    #[default]
    OuterBraces,
    /// First `{` that starts a complete JSON object, ending at its matching `}`.
    Balanced,
}

impl FromStr for ExtractionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outer" | "outer_braces" => Ok(Self::OuterBraces),
            "balanced" => Ok(Self::Balanced),
            other => Err(format!("expected \"outer\" or \"balanced\", got {other:?}")),
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OuterBraces => f.write_str("outer"),
            Self::Balanced => f.write_str("balanced"),
        }
    }
}

impl ExtractionStrategy {
    /// Returns the candidate substring, or `None` when no object can be located.
    pub fn candidate<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self {
            Self::OuterBraces => outer_braces(text),
            Self::Balanced => balanced(text),
        }
    }
}

fn outer_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn balanced(text: &str) -> Option<&str> {
    text.match_indices('{').find_map(|(start, _)| {
        let rest = &text[start..];
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(_))) => Some(&rest[..stream.byte_offset()]),
            _ => None,
        }
    })
}
