use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use serde_json::Value;
use thiserror::Error;

use super::extract::ExtractionStrategy;
use super::prompt::build_prompt;
use super::schema;
use crate::config::Config;
use crate::llm::{GenerateRequest, LlmClient};
use crate::telemetry::metrics::{ANALYSIS_DURATION, ANALYSIS_OUTCOMES};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Model not initialized")]
    ModelUnavailable,

    #[error("{0}")]
    Generation(anyhow::Error),

    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("{0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response does not match the analysis schema: {0}")]
    Schema(String),
}

impl AnalysisError {
    fn outcome(&self) -> &'static str {
        match self {
            AnalysisError::ModelUnavailable => "model_unavailable",
            AnalysisError::Generation(_) => "generation_error",
            AnalysisError::NoJsonObject => "no_json",
            AnalysisError::InvalidJson(_) => "invalid_json",
            AnalysisError::Schema(_) => "schema_mismatch",
        }
    }
}

/// Fixed decoding and post-processing settings applied to every request.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub extraction: ExtractionStrategy,
    pub validate_schema: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1000,
            extraction: ExtractionStrategy::OuterBraces,
            validate_schema: false,
        }
    }
}

impl From<&Config> for AnalysisSettings {
    fn from(config: &Config) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            extraction: config.json_extraction,
            validate_schema: config.validate_schema,
        }
    }
}

pub struct Analyzer {
    llm: Option<Arc<LlmClient>>,
    settings: AnalysisSettings,
}

impl Analyzer {
    pub fn new(llm: Option<Arc<LlmClient>>, settings: AnalysisSettings) -> Self {
        Self { llm, settings }
    }

    pub fn llm(&self) -> Option<&LlmClient> {
        self.llm.as_deref()
    }

    #[tracing::instrument(
        name = "analysis",
        skip(self, content),
        fields(
            analysis.content_chars = content.chars().count(),
            analysis.extraction = %self.settings.extraction,
            analysis.candidate_bytes,
            analysis.outcome,
        )
    )]
    pub async fn analyze(&self, content: &str, is_advanced: bool) -> Result<Value, AnalysisError> {
        let start = Instant::now();
        let result = self.run(content, is_advanced).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.outcome(),
        };
        tracing::Span::current().record("analysis.outcome", outcome);

        let attrs = [
            KeyValue::new("analysis.outcome", outcome),
            KeyValue::new("analysis.advanced", is_advanced),
        ];
        ANALYSIS_OUTCOMES.add(1, &attrs);
        ANALYSIS_DURATION.record(start.elapsed().as_secs_f64(), &attrs);

        if let Err(err) = &result {
            tracing::error!(error = %err, outcome, "Content analysis failed");
        }

        result
    }

    async fn run(&self, content: &str, is_advanced: bool) -> Result<Value, AnalysisError> {
        let llm = self.llm.as_deref().ok_or(AnalysisError::ModelUnavailable)?;

        let resp = llm
            .generate(&GenerateRequest {
                model: llm.model().to_string(),
                prompt: build_prompt(content, is_advanced),
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
                do_sample: true,
            })
            .await
            .map_err(AnalysisError::Generation)?;

        let candidate = self
            .settings
            .extraction
            .candidate(&resp.content)
            .ok_or(AnalysisError::NoJsonObject)?;
        tracing::Span::current().record("analysis.candidate_bytes", candidate.len());

        let value: Value = serde_json::from_str(candidate)?;

        if self.settings.validate_schema {
            schema::validate(&value).map_err(AnalysisError::Schema)?;
        }

        Ok(value)
    }
}
