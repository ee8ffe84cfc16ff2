//! Sakumon-Pipeline: the generation state machine.
//!
//! One request flows through an explicit sequence of stages:
//!
//! ```text
//! CollectingSpec -> Drafting -> Verifying -> Formatting -> Done
//!                                  ^   |
//!                                  |   v
//!                                Revising   (bounded by max_revisions)
//! ```
//!
//! Each stage is its own module ([`draft`], [`verify`], [`revise`],
//! [`format`]) and [`machine`] owns the transitions. All state lives in
//! one [`PipelineState`](sakumon_core::PipelineState) record threaded
//! through the stages; there is no shared or global state.

pub mod draft;
pub mod format;
pub mod machine;
pub mod prompts;
pub mod revise;
pub mod verify;

pub use machine::Pipeline;
pub use prompts::PromptRenderer;
