//! Hugging Face text-generation-inference backend.
//!
//! Unlike the chat backends this sends the raw prompt and gets back a plain
//! continuation, so the decoding parameters map one-to-one.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{GenerateRequest, GenerateResponse, Provider};

pub struct TgiProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl TgiProvider {
    pub fn new(base_url: &str, api_token: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.map(str::to_string),
        }
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.api_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| anyhow::anyhow!("invalid API token header: {e}"))?,
            );
        }
        Ok(headers)
    }
}

#[derive(Serialize)]
struct TgiRequest<'a> {
    inputs: &'a str,
    parameters: TgiParameters,
}

#[derive(Serialize)]
struct TgiParameters {
    max_new_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    do_sample: bool,
    return_full_text: bool,
    details: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TgiResponse {
    Single(TgiGeneration),
    Batch(Vec<TgiGeneration>),
}

#[derive(Deserialize)]
struct TgiGeneration {
    generated_text: String,
    details: Option<TgiDetails>,
}

#[derive(Deserialize)]
struct TgiDetails {
    finish_reason: Option<String>,
    generated_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct TgiInfo {
    model_id: String,
}

impl TgiInfo {
    /// TGI reports the full hub id, so `Mistral-7B-v0.1` matches `mistralai/Mistral-7B-v0.1`.
    fn serves(&self, model: &str) -> bool {
        self.model_id == model || self.model_id.rsplit('/').next() == Some(model)
    }
}

#[derive(Deserialize)]
struct TgiError {
    error: String,
}

impl TgiRequest<'_> {
    fn from_generate(req: &GenerateRequest) -> TgiRequest<'_> {
        TgiRequest {
            inputs: &req.prompt,
            parameters: TgiParameters {
                max_new_tokens: req.max_tokens,
                // TGI rejects a zero temperature, greedy decoding is expressed via do_sample
                temperature: req.do_sample.then_some(req.temperature),
                do_sample: req.do_sample,
                return_full_text: false,
                details: true,
            },
        }
    }
}

impl TgiResponse {
    fn into_first(self) -> Option<TgiGeneration> {
        match self {
            TgiResponse::Single(generation) => Some(generation),
            TgiResponse::Batch(generations) => generations.into_iter().next(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for TgiProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .headers(self.headers()?)
            .json(&TgiRequest::from_generate(req))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TgiError>(&error_body)
                .map(|e| e.error)
                .unwrap_or(error_body);
            return Err(anyhow::anyhow!("TGI error ({status}): {message}"));
        }

        let generation = response
            .json::<TgiResponse>()
            .await?
            .into_first()
            .ok_or_else(|| anyhow::anyhow!("TGI returned no generations"))?;

        let (finish_reason, output_tokens) = generation
            .details
            .map(|d| (d.finish_reason.unwrap_or_default(), d.generated_tokens.unwrap_or(0)))
            .unwrap_or_default();

        Ok(GenerateResponse {
            content: generation.generated_text,
            model: req.model.clone(),
            input_tokens: 0,
            output_tokens,
            finish_reason,
        })
    }

    fn name(&self) -> &str {
        "tgi"
    }

    async fn check_model(&self, model: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .get(format!("{}/info", self.base_url))
            .headers(self.headers()?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("TGI info failed ({status})");
        }

        let info = response.json::<TgiInfo>().await?;
        if !info.serves(model) {
            anyhow::bail!("TGI serves {:?}, not {model:?}", info.model_id);
        }
        Ok(())
    }
}
