//! API Handlers

use axum::{extract::State, http::StatusCode, Json};
use sakumon_core::{PipelineState, PipelineStatus, ProblemSpec, SAKUMON_VERSION};
use sakumon_pipeline::Pipeline;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// State carried over from the previous turn; a fresh session omits it.
    #[serde(default)]
    pub state: Option<PipelineState>,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    /// Either a completed spec, or a full state from the chat phase.
    #[serde(default)]
    pub spec: Option<ProblemSpec>,
    #[serde(default)]
    pub state: Option<PipelineState>,
}

pub async fn chat(
    State(app): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, Json<Value>) {
    let pipeline = Pipeline::new(app.generator.as_ref(), app.config.clone());
    let mut state = request
        .state
        .unwrap_or_else(|| PipelineState::new(ProblemSpec::default(), Vec::new()));
    pipeline.handle_turn(&mut state, &request.message).await;

    let reply = state
        .conversation
        .last()
        .map(|turn| turn.content.clone())
        .unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "reply": reply,
            "is_complete": state.status == PipelineStatus::Drafting,
            "state": state,
        })),
    )
}

pub async fn generate(
    State(app): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> (StatusCode, Json<Value>) {
    let mut state = match (request.state, request.spec) {
        (Some(state), _) => state,
        (None, Some(spec)) => {
            let mut state = PipelineState::new(spec, Vec::new());
            state.status = PipelineStatus::Drafting;
            state
        }
        (None, None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "spec または state を指定してください" })),
            );
        }
    };

    let pipeline = Pipeline::new(app.generator.as_ref(), app.config.clone());
    match pipeline.run(&mut state).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": state.status,
                "problem": state.draft,
                "verification": state.verification,
                "revisions": state.revision_count,
                "markup": state.markup,
            })),
        ),
        Err(e) => {
            error!("generation failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": state.status,
                    "error": e.to_string(),
                })),
            )
        }
    }
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": SAKUMON_VERSION })),
    )
}
