//! Axum route handlers for the flow endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::flows::definitions::{ResumeOptimizationInput, ResumeOptimizationOutput};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// POST /api/gemini
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Prompt is required".to_string()))?;

    let reply = state.flows.chat(&prompt).await?;
    Ok(Json(ChatResponse { reply }))
}

/// POST /api/v1/flows/:name
///
/// Generic entry point: the body is the flow input, the response its output.
pub async fn handle_invoke_flow(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.flows.invoke(&name, input).await?))
}

/// POST /api/v1/resume/optimize
pub async fn handle_optimize_resume(
    State(state): State<AppState>,
    Json(input): Json<ResumeOptimizationInput>,
) -> Result<Json<ResumeOptimizationOutput>, AppError> {
    Ok(Json(state.flows.optimize_resume(&input).await?))
}
