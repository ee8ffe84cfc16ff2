//! Pipeline driver.
//!
//! Owns nothing long-lived: the caller holds the [`PipelineState`] and the
//! driver advances it in place. Two entry points cover the two phases of a
//! session: [`Pipeline::handle_turn`] runs one round of slot filling on a
//! user message, [`Pipeline::run`] drives a complete spec through draft,
//! verification, bounded revision and formatting.

use sakumon_core::{
    ChatTurn, PipelineConfig, PipelineError, PipelineState, PipelineStatus, TextGenerator,
    ValidationError,
};
use sakumon_extract::SlotFillingEngine;
use tracing::{info, warn};

use crate::draft::DraftEngine;
use crate::format::DocumentFormatter;
use crate::prompts::PromptRenderer;
use crate::revise::Reviser;
use crate::verify::Verifier;

pub struct Pipeline<'a> {
    generator: &'a dyn TextGenerator,
    config: PipelineConfig,
    prompts: PromptRenderer,
}

impl<'a> Pipeline<'a> {
    pub fn new(generator: &'a dyn TextGenerator, config: PipelineConfig) -> Self {
        Self { generator, config, prompts: PromptRenderer::new() }
    }

    /// One round of slot filling.
    ///
    /// Appends the user turn, merges whatever the turn pins down, and
    /// leaves the state with an assistant reply appended. Once every slot
    /// holds a validated value the state moves to `Drafting` and is ready
    /// for [`run`](Self::run).
    pub async fn handle_turn(&self, state: &mut PipelineState, user_message: &str) {
        if !user_message.trim().is_empty() {
            state.conversation.push(ChatTurn::user(user_message));
        }
        let engine = SlotFillingEngine::new(self.generator);
        let spec = std::mem::take(&mut state.spec);
        let conversation = std::mem::take(&mut state.conversation);
        let outcome = engine.step(spec, conversation).await;
        state.spec = outcome.spec;
        state.conversation = outcome.conversation;
        state.validation_errors = outcome.validation_errors;
        if outcome.is_complete {
            info!(spec = ?state.spec, "specification complete");
            state.status = PipelineStatus::Drafting;
        } else {
            state.status = PipelineStatus::CollectingSpec;
        }
    }

    /// Drives a completed specification to a finished document.
    ///
    /// The revision loop is bounded by `max_revisions`; hitting the ceiling
    /// is not an error. The latest draft is formatted anyway and the state
    /// lands on `MaxRevisionsReached` so the caller can surface the caveat.
    /// On `Err` the state is left on `Failed` with the reason recorded.
    pub async fn run(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        if state.status == PipelineStatus::CollectingSpec {
            if !state.spec.is_complete() {
                return Err(self.abort(state, ValidationError::new("spec", "仕様が未完成です")));
            }
            state.status = PipelineStatus::Drafting;
        }

        let drafter = DraftEngine::new(self.generator, &self.prompts);
        let verifier = Verifier::new(self.generator, &self.prompts);
        let reviser = Reviser::new(self.generator, &self.prompts);
        let formatter = DocumentFormatter::new(&self.prompts);
        let mut ceiling_hit = false;

        loop {
            match state.status {
                PipelineStatus::Drafting => match drafter.draft(&state.spec).await {
                    Ok(draft) => {
                        state.draft = Some(draft);
                        state.status = PipelineStatus::Verifying;
                    }
                    Err(e) => {
                        state.fail(e.to_string());
                        return Err(e);
                    }
                },
                PipelineStatus::Verifying => {
                    let Some(draft) = state.draft.as_ref() else {
                        return Err(
                            self.abort(state, ValidationError::new("draft", "ドラフトがありません"))
                        );
                    };
                    let result = verifier.verify(draft).await;
                    let valid = result.is_valid;
                    state.verification = Some(result);
                    if valid {
                        state.status = PipelineStatus::Formatting;
                    } else if state.revision_count < self.config.max_revisions {
                        state.status = PipelineStatus::Revising;
                    } else {
                        warn!(
                            revisions = state.revision_count,
                            "revision ceiling reached, formatting latest draft"
                        );
                        ceiling_hit = true;
                        if let Some(v) = state.verification.as_mut() {
                            v.feedback = format!(
                                "{} (注意: この問題は最大修正回数に達したため、完全には検証されていません)",
                                v.feedback
                            );
                        }
                        state.status = PipelineStatus::Formatting;
                    }
                }
                PipelineStatus::Revising => {
                    // Revising is only entered from Verifying with both set.
                    let (Some(draft), Some(verification)) =
                        (state.draft.as_ref(), state.verification.as_ref())
                    else {
                        return Err(
                            self.abort(state, ValidationError::new("draft", "修正対象がありません"))
                        );
                    };
                    match reviser.revise(draft, verification).await {
                        Ok(revised) => {
                            state.draft = Some(revised);
                            state.revision_count += 1;
                            state.status = PipelineStatus::Verifying;
                        }
                        Err(e) => {
                            state.fail(e.to_string());
                            return Err(e);
                        }
                    }
                }
                PipelineStatus::Formatting => {
                    let Some(draft) = state.draft.as_ref() else {
                        return Err(
                            self.abort(state, ValidationError::new("draft", "ドラフトがありません"))
                        );
                    };
                    match formatter.format(draft) {
                        Ok(markup) => {
                            state.markup = Some(markup);
                            state.status = if ceiling_hit {
                                PipelineStatus::MaxRevisionsReached
                            } else {
                                PipelineStatus::Done
                            };
                            info!(status = ?state.status, revisions = state.revision_count,
                                  "pipeline finished");
                            return Ok(());
                        }
                        Err(e) => {
                            let e = PipelineError::from(e);
                            state.fail(e.to_string());
                            return Err(e);
                        }
                    }
                }
                PipelineStatus::CollectingSpec
                | PipelineStatus::Done
                | PipelineStatus::MaxRevisionsReached
                | PipelineStatus::Failed => return Ok(()),
            }
        }
    }

    fn abort(&self, state: &mut PipelineState, err: ValidationError) -> PipelineError {
        let err = PipelineError::from(err);
        state.fail(err.to_string());
        err
    }
}
