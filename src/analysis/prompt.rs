const INSTRUCTIONS: &str = r#"Analyze the following content and provide a JSON response with:
{
    "grammar": {
        "score": <0-100>,
        "errors": ["error1", "error2"],
        "suggestions": ["suggestion1", "suggestion2"]
    },
    "readability": {
        "score": <0-100>,
        "level": "<level>",
        "suggestions": ["suggestion1", "suggestion2"]
    },
    "seo": {
        "score": <0-100>,
        "keywords": [{"word": "<word>", "count": <number>, "density": <number>}],
        "suggestions": ["suggestion1", "suggestion2"]
    },
    "writingStyle": {
        "tone": "<tone>",
        "strengths": ["strength1", "strength2"],
        "improvements": ["improvement1", "improvement2"]
    },
    "summary": "<summary>",
    "improvementSuggestions": ["suggestion1", "suggestion2"]
}
"#;

const ADVANCED_CLAUSE: &str =
    "\nProvide detailed analysis with specific examples and comprehensive suggestions.";

pub const CONTENT_MARKER: &str = "Content to analyze: ";

/// Assembles the full prompt. `content` is inserted verbatim.
pub fn build_prompt(content: &str, is_advanced: bool) -> String {
    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + content.len() + 128);
    prompt.push_str(INSTRUCTIONS);
    if is_advanced {
        prompt.push_str(ADVANCED_CLAUSE);
    }
    prompt.push_str("\n\n");
    prompt.push_str(CONTENT_MARKER);
    prompt.push_str(content);
    prompt
}
