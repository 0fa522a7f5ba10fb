use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.analyzer.llm() {
        Some(llm) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "model": "ready",
                "provider": llm.provider_name(),
                "model_name": llm.model(),
                "service": "content-analyzer",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "model": "unavailable",
                "service": "content-analyzer",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        ),
    }
}
