//! Draft revision driven by verification feedback.

use sakumon_core::{
    ExtractionError, PipelineError, ProblemDraft, TextGenerator, VerificationResult,
};
use sakumon_extract::extract_json;
use serde_json::{json, Value};
use tracing::debug;

use crate::prompts::{PromptRenderer, REVISE_TEMPLATE};

pub struct Reviser<'a> {
    generator: &'a dyn TextGenerator,
    prompts: &'a PromptRenderer,
}

impl<'a> Reviser<'a> {
    pub fn new(generator: &'a dyn TextGenerator, prompts: &'a PromptRenderer) -> Self {
        Self { generator, prompts }
    }

    /// Produces a revised draft. Revising an already-valid draft is a no-op.
    ///
    /// The revised reply must carry non-empty question, answer and
    /// explanation; they replace the originals together or not at all.
    /// Identity and figure payload survive the revision untouched.
    pub async fn revise(
        &self,
        draft: &ProblemDraft,
        verification: &VerificationResult,
    ) -> Result<ProblemDraft, PipelineError> {
        if verification.is_valid {
            return Ok(draft.clone());
        }

        let suggestions = if verification.suggestions.is_empty() {
            "特に指定なし".to_string()
        } else {
            verification.suggestions.join(", ")
        };
        let data = json!({
            "id": draft.id,
            "question": draft.question,
            "answer": draft.answer,
            "explanation": draft.explanation,
            "feedback": verification.feedback,
            "suggestions": suggestions,
        });
        let prompt = self.prompts.render(REVISE_TEMPLATE, &data)?;
        let reply = self.generator.generate(&prompt).await?;
        // Some models emit the plus-minus sign as a literal escape.
        let reply = reply.replace("\\u00b1", "±");
        let value = extract_json(&reply)?;

        let question = required_field(&value, "question")?;
        let answer = required_field(&value, "answer")?;
        let explanation = required_field(&value, "explanation")?;

        let mut revised = draft.clone();
        revised.question = question;
        revised.answer = answer;
        revised.explanation = explanation;
        debug!(id = %revised.id, "draft revised");
        Ok(revised)
    }
}

fn required_field(value: &Value, field: &str) -> Result<String, PipelineError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ExtractionError::Parse(format!("revised reply missing field: {field}")).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sakumon_core::ScriptedGenerator;

    fn draft() -> ProblemDraft {
        let mut d = ProblemDraft::new(
            "x^2 = -4 を実数の範囲で解け。".into(),
            "x = 2".into(),
            "両辺の平方根をとる。".into(),
        );
        d.id = "prob-keep".into();
        d.visualization = Some(json!({"type": "function_graph"}));
        d
    }

    fn invalid() -> VerificationResult {
        let mut v = VerificationResult::failure("解が存在しない方程式です");
        v.suggestions = vec!["問題設定を見直す".into()];
        v
    }

    #[tokio::test]
    async fn test_valid_draft_passes_through() {
        let gen = ScriptedGenerator::new(vec![]);
        let prompts = PromptRenderer::new();
        let mut v = invalid();
        v.is_valid = true;
        let original = draft();
        let out = Reviser::new(&gen, &prompts).revise(&original, &v).await.unwrap();
        assert_eq!(out, original);
    }

    #[tokio::test]
    async fn test_revision_keeps_identity_and_figure() {
        let gen = ScriptedGenerator::new(vec![
            r#"{"id": "prob-new", "question": "x^2 = 4 を実数の範囲で解け。",
                "answer": "x = ±2",
                "explanation": "両辺の平方根をとると x = ±2 が得られる。"}"#,
        ]);
        let prompts = PromptRenderer::new();
        let out = Reviser::new(&gen, &prompts)
            .revise(&draft(), &invalid())
            .await
            .unwrap();
        assert_eq!(out.id, "prob-keep");
        assert!(out.visualization.is_some());
        assert_eq!(out.answer, "x = ±2");
    }

    #[tokio::test]
    async fn test_partial_reply_is_rejected() {
        let gen = ScriptedGenerator::new(vec![
            r#"{"question": "修正後の問題", "answer": ""}"#,
        ]);
        let prompts = PromptRenderer::new();
        let err = Reviser::new(&gen, &prompts)
            .revise(&draft(), &invalid())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("answer"));
    }
}
