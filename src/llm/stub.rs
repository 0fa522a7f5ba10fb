use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{GenerateRequest, GenerateResponse, Provider};
use crate::analysis::prompt::CONTENT_MARKER;

enum Behavior {
    Fixed(String),
    Failing(String),
    /// Echoes the submitted content back inside a JSON object after a delay.
    Echo(Duration),
}

/// In-process provider for exercising the pipeline without a model.
pub struct StubProvider {
    behavior: Behavior,
    model_check_failure: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    checked_models: Mutex<Vec<String>>,
}

impl StubProvider {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            model_check_failure: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            checked_models: Mutex::new(Vec::new()),
        }
    }

    pub fn fixed(output: &str) -> Self {
        Self::with(Behavior::Fixed(output.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Behavior::Failing(message.to_string()))
    }

    pub fn echo(delay: Duration) -> Self {
        Self::with(Behavior::Echo(delay))
    }

    /// Makes the startup model check fail with `message`.
    pub fn with_model_check_failure(mut self, message: &str) -> Self {
        self.model_check_failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn model_checks(&self) -> usize {
        self.checked_models.lock().unwrap().len()
    }

    pub fn checked_models(&self) -> Vec<String> {
        self.checked_models.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for StubProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(req.prompt.clone());

        let content = match &self.behavior {
            Behavior::Fixed(output) => output.clone(),
            Behavior::Failing(message) => anyhow::bail!("{message}"),
            Behavior::Echo(delay) => {
                tokio::time::sleep(*delay).await;
                let submitted = req
                    .prompt
                    .rsplit_once(CONTENT_MARKER)
                    .map(|(_, content)| content)
                    .unwrap_or_default();
                format!(
                    "Sure, here is the analysis: {}",
                    serde_json::json!({ "summary": submitted })
                )
            }
        };

        Ok(GenerateResponse {
            content,
            model: req.model.clone(),
            ..Default::default()
        })
    }

    fn name(&self) -> &str {
        "stub"
    }

    async fn check_model(&self, model: &str) -> anyhow::Result<()> {
        self.checked_models.lock().unwrap().push(model.to_string());
        match &self.model_check_failure {
            Some(message) => anyhow::bail!("{message}"),
            None => Ok(()),
        }
    }
}
