use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub content: String,
    #[serde(rename = "isAdvanced", default)]
    pub is_advanced: bool,
}

pub async fn analyze_content(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(request) = payload?;

    if request.content.trim().is_empty() {
        return Err(AppError::Validation("content must not be empty".into()));
    }

    let result = state
        .analyzer
        .analyze(&request.content, request.is_advanced)
        .await?;

    Ok(Json(result))
}
