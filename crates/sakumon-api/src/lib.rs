//! Sakumon API /v1: REST endpoints
pub mod handlers;
pub mod openai;

use axum::{
    routing::{get, post},
    Router,
};
use sakumon_core::{PipelineConfig, TextGenerator};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared per-process state: one generator client, one config.
///
/// Per-request pipeline state never lives here; it travels in the request
/// and response bodies.
pub struct AppState {
    pub generator: Box<dyn TextGenerator>,
    pub config: PipelineConfig,
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat", post(handlers::chat))
        .route("/v1/generate", post(handlers::generate))
        .route("/v1/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: &str, state: Arc<AppState>) {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    tracing::info!("Sakumon API listening on {}", addr);
    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use sakumon_core::ScriptedGenerator;
    use tower::util::ServiceExt;

    fn app(responses: Vec<&str>) -> Router {
        let state = Arc::new(AppState {
            generator: Box::new(ScriptedGenerator::new(responses)),
            config: PipelineConfig::default(),
        });
        create_app(state)
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(vec![])
            .oneshot(Request::get("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["version"], sakumon_core::SAKUMON_VERSION);
    }

    #[tokio::test]
    async fn test_chat_turn_carries_state() {
        let slot_reply = r#"{
          "problem_spec": {"topic": "図形"},
          "is_complete": false,
          "missing_slots": ["difficulty", "format", "count"],
          "next_question": "難易度（小学生、中学生、高校生）を教えてください。",
          "validation_errors": []
        }"#;
        let request = Request::post("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message": "図形の問題をお願いします"}"#))
            .unwrap();
        let response = app(vec![slot_reply]).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["is_complete"], false);
        assert_eq!(value["state"]["spec"]["topic"], "図形");
        assert!(value["reply"].as_str().unwrap().contains("難易度"));
    }

    #[tokio::test]
    async fn test_generate_requires_spec_or_state() {
        let request = Request::post("/v1/generate")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app(vec![]).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
