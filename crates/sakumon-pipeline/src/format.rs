//! LaTeX document assembly.
//!
//! Fills the four regions of the document template from a finished draft.
//! Figure emission is contained: a payload the figure crate cannot render
//! becomes a comment line inside the document, never a formatting error.

use sakumon_core::{ProblemDraft, RenderingError};
use serde_json::json;
use tracing::debug;

use crate::prompts::{PromptRenderer, DOCUMENT_TEMPLATE};

pub struct DocumentFormatter<'a> {
    prompts: &'a PromptRenderer,
}

impl<'a> DocumentFormatter<'a> {
    pub fn new(prompts: &'a PromptRenderer) -> Self {
        Self { prompts }
    }

    pub fn format(&self, draft: &ProblemDraft) -> Result<String, RenderingError> {
        let figure = match &draft.visualization {
            Some(raw) => sakumon_figure::render(raw),
            None => String::new(),
        };
        let data = json!({
            "PROBLEM_TEXT": escape_text(&draft.question),
            "ANSWER_TEXT": escape_text(&draft.answer),
            "EXPLANATION_TEXT": escape_text(&draft.explanation),
            "FIGURE_CODE": figure,
        });
        let markup = self.prompts.render(DOCUMENT_TEMPLATE, &data)?;
        debug!(id = %draft.id, bytes = markup.len(), "document assembled");
        Ok(markup)
    }
}

/// Escapes the one character that breaks LaTeX silently in prose.
/// Drafts are expected to carry their own math markup, so the usual
/// special characters pass through untouched.
fn escape_text(text: &str) -> String {
    text.replace('%', "\\%")
}
