use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::analysis::AnalysisError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid request body: {0}")]
    Rejected(#[from] JsonRejection),

    #[error("Model not initialized")]
    ModelUnavailable,

    #[error("Analysis failed: {0}")]
    Analysis(AnalysisError),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::ModelUnavailable => AppError::ModelUnavailable,
            other => AppError::Analysis(other),
        }
    }
}

impl AppError {
    /// Status code and the `detail` string exposed to callers.
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Rejected(rejection) => (rejection.status(), rejection.body_text()),
            AppError::ModelUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Analysis(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        }
    }
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();

        match &self {
            AppError::Validation(_) | AppError::Rejected(_) => {
                tracing::warn!(error = %self, "Rejected analysis request");
            }
            AppError::ModelUnavailable => {
                tracing::error!("Analysis requested but no model is loaded");
            }
            AppError::Analysis(_) => {}
        }

        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "detail": detail,
                "status": status.as_u16(),
                "trace_id": trace_id,
            })
        } else {
            json!({
                "detail": detail,
                "status": status.as_u16(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_of(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_validation_error() {
        let error = AppError::Validation("content must not be empty".to_string());
        assert_eq!(
            error.to_string(),
            "Validation error: content must not be empty"
        );
    }

    #[test]
    fn test_model_unavailable_maps_from_analysis() {
        let error = AppError::from(AnalysisError::ModelUnavailable);
        assert!(matches!(error, AppError::ModelUnavailable));
    }

    #[test]
    fn test_analysis_error_keeps_original_text() {
        let error = AppError::from(AnalysisError::NoJsonObject);
        assert_eq!(
            error.to_string(),
            "Analysis failed: no JSON object found in model output"
        );
    }

    #[test]
    fn test_error_status_codes() {
        let test_cases = vec![
            (
                AppError::Validation("test".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::ModelUnavailable, StatusCode::INTERNAL_SERVER_ERROR),
            (
                AppError::from(AnalysisError::NoJsonObject),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::from(AnalysisError::Generation(anyhow::anyhow!("boom"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            let (status, _) = error.status_and_detail();
            assert_eq!(status, expected_status, "{error}");
        }
    }

    #[tokio::test]
    async fn test_model_unavailable_body() {
        let (status, body) = body_of(AppError::ModelUnavailable).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Model not initialized");
        assert_eq!(body["status"], 500);
        assert!(body.get("trace_id").is_none());
    }

    #[tokio::test]
    async fn test_analysis_body_carries_raw_error() {
        let parse_err = serde_json::from_str::<Value>("{oops}").unwrap_err();
        let expected = parse_err.to_string();
        let (status, body) = body_of(AppError::from(AnalysisError::InvalidJson(parse_err))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], expected.as_str());
    }

    #[test]
    fn test_app_result_err() {
        fn returns_err() -> AppResult<i32> {
            Err(AppError::Validation("test".to_string()))
        }
        assert!(returns_err().is_err());
    }
}
