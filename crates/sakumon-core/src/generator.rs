//! Generative-service boundary
//!
//! The text-generation service is an external collaborator with no latency
//! or correctness guarantees. The pipeline sees it only through this trait.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::ServiceError;

/// `generate(prompt) -> text`, with failures surfaced as typed errors.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Test double that replays a fixed script of responses in order.
///
/// Once the script is exhausted it returns `ServiceError::EmptyResponse`,
/// which doubles as a way to exercise failure paths.
pub struct ScriptedGenerator {
    responses: Mutex<std::vec::IntoIter<Result<String, ServiceError>>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<&str>) -> Self {
        let script: Vec<Result<String, ServiceError>> =
            responses.into_iter().map(|r| Ok(r.to_string())).collect();
        Self { responses: Mutex::new(script.into_iter()) }
    }

    pub fn from_results(responses: Vec<Result<String, ServiceError>>) -> Self {
        Self { responses: Mutex::new(responses.into_iter()) }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, ServiceError> {
        let mut script = self.responses.lock().expect("script lock poisoned");
        script.next().unwrap_or(Err(ServiceError::EmptyResponse))
    }
}
