pub mod anthropic;
pub mod client;
pub mod openai;
#[cfg(test)]
pub mod stub;
pub mod tgi;

use std::sync::Arc;

use anyhow::Context;

pub use client::LlmClient;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub do_sample: bool,
}

impl GenerateRequest {
    /// Temperature actually sent to the backend; greedy decoding when sampling is off.
    pub fn effective_temperature(&self) -> f32 {
        if self.do_sample { self.temperature } else { 0.0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    fn name(&self) -> &str;

    /// Confirms the backend is reachable and serves `model`.
    async fn check_model(&self, model: &str) -> anyhow::Result<()>;
}

/// Builds the backend selected by `LLM_PROVIDER`.
pub fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match config.llm_provider.as_str() {
        "ollama" => Arc::new(openai::OpenAIProvider::new_ollama(&config.ollama_base_url)),
        "openai" => Arc::new(openai::OpenAIProvider::new(
            config
                .openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY must be set for the openai provider")?,
        )),
        "google" => Arc::new(openai::OpenAIProvider::new_google(
            config
                .google_api_key
                .as_deref()
                .context("GOOGLE_API_KEY must be set for the google provider")?,
        )),
        "anthropic" => Arc::new(anthropic::AnthropicProvider::new(
            config
                .anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY must be set for the anthropic provider")?,
        )),
        "tgi" => Arc::new(tgi::TgiProvider::new(
            &config.tgi_base_url,
            config.hf_api_token.as_deref(),
        )),
        other => anyhow::bail!("unknown LLM_PROVIDER {other:?}"),
    };

    Ok(provider)
}

/// Wraps `provider` in the shared handle, checking the model first when `check` is set.
pub async fn initialize(
    provider: Arc<dyn Provider>,
    model: &str,
    check: bool,
) -> anyhow::Result<LlmClient> {
    let client = LlmClient::new(provider, model);
    if check {
        client
            .check_model()
            .await
            .with_context(|| format!("{} cannot serve model {model:?}", client.provider_name()))?;
    }
    Ok(client)
}

/// Builds the process-wide model handle. Any failure leaves it unset; it is never retried.
pub async fn load_model(config: &Config) -> Option<Arc<LlmClient>> {
    let loaded = match build_provider(config) {
        Ok(provider) => initialize(provider, &config.llm_model, config.check_model_on_startup).await,
        Err(err) => Err(err),
    };

    match loaded {
        Ok(client) => {
            tracing::info!(
                provider = %config.llm_provider,
                model = %config.llm_model,
                checked = config.check_model_on_startup,
                "Model initialized"
            );
            Some(Arc::new(client))
        }
        Err(err) => {
            tracing::error!(
                provider = %config.llm_provider,
                model = %config.llm_model,
                error = format!("{err:#}"),
                "Error loading model, analysis requests will fail"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(provider: &str) -> Config {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.llm_provider = provider.to_string();
        config
    }

    #[test]
    fn test_build_default_provider() {
        let provider = build_provider(&config_with("ollama")).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_build_tgi_provider_without_token() {
        let provider = build_provider(&config_with("tgi")).unwrap();
        assert_eq!(provider.name(), "tgi");
    }

    #[test]
    fn test_missing_api_key_fails() {
        for name in ["openai", "google", "anthropic"] {
            let err = build_provider(&config_with(name)).err().unwrap();
            assert!(err.to_string().contains("must be set"), "{name}: {err}");
        }
    }

    #[test]
    fn test_keyed_provider_builds() {
        let mut config = config_with("anthropic");
        config.anthropic_api_key = Some("sk-test".to_string());
        assert_eq!(build_provider(&config).unwrap().name(), "anthropic");
    }

    #[test]
    fn test_unknown_provider_fails() {
        let err = build_provider(&config_with("mystery")).err().unwrap();
        assert!(err.to_string().contains("unknown LLM_PROVIDER"));
    }

    #[tokio::test]
    async fn test_initialize_with_failing_model_check_is_an_error() {
        let stub = Arc::new(stub::StubProvider::fixed("{}").with_model_check_failure("model not found"));
        let err = initialize(stub.clone(), "mistral", true).await.err().unwrap();
        assert!(format!("{err:#}").contains("model not found"));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_initialize_without_check_skips_backend() {
        let stub = Arc::new(stub::StubProvider::fixed("{}").with_model_check_failure("unreachable"));
        let client = initialize(stub.clone(), "mistral", false).await.unwrap();
        assert_eq!(client.model(), "mistral");
        assert_eq!(stub.model_checks(), 0);
    }

    #[tokio::test]
    async fn test_initialize_checks_configured_model() {
        let stub = Arc::new(stub::StubProvider::fixed("{}"));
        initialize(stub.clone(), "mistral:7b", true).await.unwrap();
        assert_eq!(stub.model_checks(), 1);
        assert_eq!(stub.checked_models(), vec!["mistral:7b".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_default_backend_leaves_handle_unset() {
        let mut config = config_with("ollama");
        config.ollama_base_url = "http://127.0.0.1:1".to_string();
        assert!(config.check_model_on_startup);
        assert!(load_model(&config).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_leaves_handle_unset() {
        assert!(load_model(&config_with("openai")).await.is_none());
    }

    #[tokio::test]
    async fn test_unchecked_handle_is_set() {
        let mut config = config_with("ollama");
        config.check_model_on_startup = false;
        let client = load_model(&config).await.unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_effective_temperature() {
        let mut req = GenerateRequest {
            model: "m".to_string(),
            prompt: "p".to_string(),
            temperature: 0.3,
            max_tokens: 10,
            do_sample: true,
        };
        assert_eq!(req.effective_temperature(), 0.3);
        req.do_sample = false;
        assert_eq!(req.effective_temperature(), 0.0);
    }
}
