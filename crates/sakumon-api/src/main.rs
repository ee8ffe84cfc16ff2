//! Binary entrypoint for the Sakumon API server.
use sakumon_api::openai::OpenAiGenerator;
use sakumon_api::{run, AppState};
use sakumon_core::PipelineConfig;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = PipelineConfig::from_env();
    let generator = match OpenAiGenerator::from_env(&config) {
        Ok(g) => g,
        Err(e) => {
            tracing::error!("cannot start: {e}");
            std::process::exit(1);
        }
    };
    let state = Arc::new(AppState { generator: Box::new(generator), config });

    // Default listen address can be overridden with SAKUMON_ADDR
    let addr = std::env::var("SAKUMON_ADDR").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
    run(&addr, state).await;
}
