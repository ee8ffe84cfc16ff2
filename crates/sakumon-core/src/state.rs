//! Pipeline state: one owned record threaded through every stage
use serde::{Deserialize, Serialize};

use crate::data_model::{ChatTurn, ProblemDraft, ProblemSpec, VerificationResult};
use crate::error::ValidationError;

/// Where a request currently sits in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    CollectingSpec,
    Drafting,
    Verifying,
    Revising,
    Formatting,
    Done,
    /// Finished with the best available draft after the revision ceiling.
    MaxRevisionsReached,
    Failed,
}

impl PipelineStatus {
    /// No further transition fires from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::MaxRevisionsReached | Self::Failed)
    }
}

/// The single mutable record for one generation request.
///
/// Created per request, owned exclusively by the driver, discarded after the
/// response is returned. Never shared across concurrent requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub spec: ProblemSpec,
    pub conversation: Vec<ChatTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<ProblemDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    pub revision_count: u32,
    /// The assembled markup document, set by the formatting stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    /// Rejected slot candidates from this request, most recent last.
    #[serde(default)]
    pub validation_errors: Vec<ValidationError>,
    pub status: PipelineStatus,
    /// Human-readable explanation set on any failure path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineState {
    pub fn new(spec: ProblemSpec, conversation: Vec<ChatTurn>) -> Self {
        Self {
            spec,
            conversation,
            draft: None,
            verification: None,
            revision_count: 0,
            markup: None,
            validation_errors: Vec::new(),
            status: PipelineStatus::CollectingSpec,
            error: None,
        }
    }

    /// Mark the state failed, keeping everything accumulated so far so the
    /// caller can resume or restart.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = PipelineStatus::Failed;
        self.error = Some(reason.into());
    }

    /// Latest user turn, if the conversation ends with one.
    pub fn last_user_turn(&self) -> Option<&ChatTurn> {
        self.conversation
            .last()
            .filter(|t| t.role == crate::data_model::ChatRole::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::ChatTurn;

    #[test]
    fn test_terminal_states() {
        assert!(PipelineStatus::Done.is_terminal());
        assert!(PipelineStatus::MaxRevisionsReached.is_terminal());
        assert!(PipelineStatus::Failed.is_terminal());
        assert!(!PipelineStatus::Verifying.is_terminal());
    }

    #[test]
    fn test_fail_preserves_state() {
        let mut state = PipelineState::new(
            ProblemSpec::default(),
            vec![ChatTurn::user("高校生向けの問題")],
        );
        state.fail("SERVICE/TIMEOUT: generation call exceeded 60s");
        assert_eq!(state.status, PipelineStatus::Failed);
        assert_eq!(state.conversation.len(), 1);
        assert!(state.error.as_deref().unwrap().starts_with("SERVICE/"));
    }

    #[test]
    fn test_last_user_turn() {
        let mut state = PipelineState::new(ProblemSpec::default(), vec![ChatTurn::user("3問")]);
        assert!(state.last_user_turn().is_some());
        state.conversation.push(ChatTurn::assistant("分野を教えてください"));
        assert!(state.last_user_turn().is_none());
    }
}
