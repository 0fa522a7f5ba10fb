use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::analysis::ExtractionStrategy;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub cors_allowed_origin: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub ollama_base_url: String,
    pub tgi_base_url: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub hf_api_token: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub check_model_on_startup: bool,
    pub json_extraction: ExtractionStrategy,
    pub validate_schema: bool,
    pub request_timeout: Option<Duration>,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            port: parse(&lookup, "APP_PORT", "8000")?,
            environment: var("APP_ENVIRONMENT", "development"),
            cors_allowed_origin: var("CORS_ALLOWED_ORIGIN", "http://localhost:5173"),
            llm_provider: var("LLM_PROVIDER", "ollama"),
            llm_model: var("LLM_MODEL", "mistral"),
            ollama_base_url: var("OLLAMA_BASE_URL", "http://localhost:11434"),
            tgi_base_url: var("TGI_BASE_URL", "http://localhost:8080"),
            openai_api_key: lookup("OPENAI_API_KEY"),
            anthropic_api_key: lookup("ANTHROPIC_API_KEY"),
            google_api_key: lookup("GOOGLE_API_KEY"),
            hf_api_token: lookup("HF_API_TOKEN"),
            temperature: parse(&lookup, "LLM_TEMPERATURE", "0.3")?,
            max_tokens: parse(&lookup, "LLM_MAX_TOKENS", "1000")?,
            check_model_on_startup: parse(&lookup, "MODEL_CHECK_ON_STARTUP", "true")?,
            json_extraction: parse(&lookup, "JSON_EXTRACTION", "outer")?,
            validate_schema: parse(&lookup, "VALIDATE_SCHEMA", "false")?,
            request_timeout: lookup("REQUEST_TIMEOUT_SECS")
                .map(|secs| {
                    secs.parse()
                        .map(Duration::from_secs)
                        .with_context(|| format!("REQUEST_TIMEOUT_SECS must be a number, got {secs:?}"))
                })
                .transpose()?,
            otel_service_name: var("OTEL_SERVICE_NAME", "content-analyzer"),
            otel_exporter_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{key} has an invalid value {raw:?}: {e}"))
}
