use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed mirror of the JSON shape the prompt asks the model for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub grammar: GrammarAnalysis,
    pub readability: ReadabilityAnalysis,
    pub seo: SeoAnalysis,
    pub writing_style: WritingStyle,
    pub summary: String,
    pub improvement_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarAnalysis {
    pub score: f64,
    pub errors: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadabilityAnalysis {
    pub score: f64,
    pub level: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoAnalysis {
    pub score: f64,
    pub keywords: Vec<KeywordUsage>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordUsage {
    pub word: String,
    /// Accepts `3` as well as `3.0`.
    pub count: f64,
    pub density: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritingStyle {
    pub tone: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

const SCORE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// Checks `value` against [`AnalysisReport`] without altering it.
pub fn validate(value: &Value) -> Result<(), String> {
    let report = AnalysisReport::deserialize(value).map_err(|e| e.to_string())?;

    for (section, score) in [
        ("grammar", report.grammar.score),
        ("readability", report.readability.score),
        ("seo", report.seo.score),
    ] {
        if !SCORE_RANGE.contains(&score) {
            return Err(format!("{section}.score {score} is outside 0-100"));
        }
    }

    Ok(())
}
