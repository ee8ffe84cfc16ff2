//! Sakumon Core: data model, pipeline state and the generator boundary
//!
//! Shared types for the math-problem generation pipeline. Every other
//! crate in the workspace builds on these.

pub mod config;
pub mod data_model;
pub mod error;
pub mod generator;
pub mod state;

pub use config::PipelineConfig;
pub use data_model::{
    ChatRole, ChatTurn, CriterionScore, Difficulty, ProblemDraft, ProblemFormat, ProblemSpec,
    VerificationResult, COUNT_RANGE,
};
pub use error::{
    ExtractionError, PipelineError, RenderingError, ServiceError, ValidationError,
};
pub use generator::{ScriptedGenerator, TextGenerator};
pub use state::{PipelineState, PipelineStatus};

/// Engine version reported by the health endpoint
pub const SAKUMON_VERSION: &str = "0.3.0";
