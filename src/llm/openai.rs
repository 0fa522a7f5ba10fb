use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
};

use super::{GenerateRequest, GenerateResponse, Provider};

/// How the startup check confirms that the configured model is served.
enum ModelCheck {
    /// `GET {api_base}/models/{model}` on the chat-completions API.
    Retrieve { api_base: String, api_key: String },
    /// `POST {root}/api/show` on Ollama's native API.
    OllamaShow { root: String },
}

/// Chat-completions backend for OpenAI and the OpenAI-compatible Google and Ollama endpoints.
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    provider_name: String,
    model_check: ModelCheck,
}

impl OpenAIProvider {
    const OPENAI_API_BASE: &'static str = "https://api.openai.com/v1";
    const GOOGLE_API_BASE: &'static str = "https://generativelanguage.googleapis.com/v1beta/openai";

    fn with_base(name: &str, api_key: &str, api_base: String, model_check: ModelCheck) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self {
            client: Client::with_config(config),
            http: reqwest::Client::new(),
            provider_name: name.to_string(),
            model_check,
        }
    }

    pub fn new(api_key: &str) -> Self {
        Self::with_base(
            "openai",
            api_key,
            Self::OPENAI_API_BASE.to_string(),
            ModelCheck::Retrieve {
                api_base: Self::OPENAI_API_BASE.to_string(),
                api_key: api_key.to_string(),
            },
        )
    }

    pub fn new_google(api_key: &str) -> Self {
        Self::with_base(
            "google",
            api_key,
            Self::GOOGLE_API_BASE.to_string(),
            ModelCheck::Retrieve {
                api_base: Self::GOOGLE_API_BASE.to_string(),
                api_key: api_key.to_string(),
            },
        )
    }

    pub fn new_ollama(base_url: &str) -> Self {
        let root = base_url.trim_end_matches('/').to_string();
        Self::with_base(
            "ollama",
            "ollama",
            format!("{root}/v1"),
            ModelCheck::OllamaShow { root },
        )
    }

    fn model_check_request(&self, model: &str) -> reqwest::RequestBuilder {
        match &self.model_check {
            ModelCheck::Retrieve { api_base, api_key } => self
                .http
                .get(format!("{api_base}/models/{model}"))
                .bearer_auth(api_key),
            ModelCheck::OllamaShow { root } => self
                .http
                .post(format!("{root}/api/show"))
                .json(&serde_json::json!({ "model": model })),
        }
    }
}

#[async_trait::async_trait]
impl Provider for OpenAIProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(req.prompt.clone()),
                name: None,
            },
        )];

        #[allow(deprecated)]
        let request = CreateChatCompletionRequest {
            model: req.model.clone(),
            messages,
            temperature: Some(req.effective_temperature()),
            max_completion_tokens: Some(req.max_tokens),
            n: Some(1),
            ..Default::default()
        };

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let finish_reason = response
            .choices
            .first()
            .and_then(|c| c.finish_reason)
            .map(|r| format!("{r:?}").to_lowercase())
            .unwrap_or_default();

        let (input_tokens, output_tokens) = match &response.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => (0, 0),
        };

        Ok(GenerateResponse {
            content,
            model: response.model,
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn check_model(&self, model: &str) -> anyhow::Result<()> {
        let response = self.model_check_request(model).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "{} has no model {model:?} ({status}): {body}",
                self.provider_name
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::Value;
    use tokio::net::TcpListener;

    use super::*;

    /// Serves a minimal `/api/show` that knows a single model.
    async fn spawn_ollama(known: &'static str) -> String {
        let app = Router::new().route(
            "/api/show",
            post(move |Json(body): Json<Value>| async move {
                if body["model"] == known {
                    (StatusCode::OK, Json(serde_json::json!({ "details": {} })))
                } else {
                    (
                        StatusCode::NOT_FOUND,
                        Json(serde_json::json!({ "error": "model not found" })),
                    )
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(OpenAIProvider::new("sk").name(), "openai");
        assert_eq!(OpenAIProvider::new_google("key").name(), "google");
        assert_eq!(
            OpenAIProvider::new_ollama("http://localhost:11434").name(),
            "ollama"
        );
    }

    #[test]
    fn test_chat_backends_retrieve_the_model() {
        let request = OpenAIProvider::new("sk-test")
            .model_check_request("gpt-4o-mini")
            .build()
            .unwrap();
        assert_eq!(request.method(), &reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://api.openai.com/v1/models/gpt-4o-mini"
        );
        assert_eq!(request.headers()["authorization"], "Bearer sk-test");

        let request = OpenAIProvider::new_google("key")
            .model_check_request("gemini-2.0-flash")
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/openai/models/gemini-2.0-flash"
        );
    }

    #[test]
    fn test_ollama_shows_the_model() {
        let request = OpenAIProvider::new_ollama("http://gpu-box:11434/")
            .model_check_request("mistral")
            .build()
            .unwrap();
        assert_eq!(request.method(), &reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "http://gpu-box:11434/api/show");
    }

    #[tokio::test]
    async fn test_ollama_check_accepts_pulled_model() {
        let base = spawn_ollama("mistral").await;
        assert!(OpenAIProvider::new_ollama(&base).check_model("mistral").await.is_ok());
    }

    #[tokio::test]
    async fn test_ollama_check_rejects_missing_model() {
        let base = spawn_ollama("mistral").await;
        let err = OpenAIProvider::new_ollama(&base)
            .check_model("llama3")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"), "{err}");
    }

    #[tokio::test]
    async fn test_unreachable_ollama_fails_check() {
        let provider = OpenAIProvider::new_ollama("http://127.0.0.1:1");
        assert!(provider.check_model("mistral").await.is_err());
    }
}
