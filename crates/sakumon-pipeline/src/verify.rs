//! Draft verification against the scoring rubric.
//!
//! A structurally broken draft (empty question or answer) short-circuits to
//! a failed result without spending a model call. Everything else goes
//! through the rubric prompt, and any failure on the way back (service
//! error, unparseable reply) degrades to [`VerificationResult::failure`]
//! so the revision loop always has something to act on.

use sakumon_core::{CriterionScore, ProblemDraft, TextGenerator, VerificationResult};
use sakumon_extract::extract_json;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::prompts::{PromptRenderer, VERIFY_TEMPLATE};

const MIN_EXPLANATION_CHARS: usize = 20;

pub struct Verifier<'a> {
    generator: &'a dyn TextGenerator,
    prompts: &'a PromptRenderer,
}

impl<'a> Verifier<'a> {
    pub fn new(generator: &'a dyn TextGenerator, prompts: &'a PromptRenderer) -> Self {
        Self { generator, prompts }
    }

    pub async fn verify(&self, draft: &ProblemDraft) -> VerificationResult {
        if draft.question.trim().is_empty() {
            return VerificationResult::failure("問題文が空です");
        }
        if draft.answer.trim().is_empty() {
            return VerificationResult::failure("解答が空です");
        }
        if draft.explanation.chars().count() < MIN_EXPLANATION_CHARS {
            return VerificationResult::failure("解説が短すぎます");
        }

        let data = json!({
            "id": draft.id,
            "question": draft.question,
            "answer": draft.answer,
            "explanation": draft.explanation,
        });
        let prompt = match self.prompts.render(VERIFY_TEMPLATE, &data) {
            Ok(p) => p,
            Err(e) => return VerificationResult::failure(e.to_string()),
        };
        let reply = match self.generator.generate(&prompt).await {
            Ok(r) => r,
            Err(e) => {
                warn!("verification call failed: {e}");
                return VerificationResult::failure(e.to_string());
            }
        };
        match extract_json(&reply).map(|v| parse_rubric(&v)) {
            Ok(result) => {
                debug!(id = %draft.id, valid = result.is_valid, score = result.overall_score,
                       "verification complete");
                result
            }
            Err(e) => {
                warn!("verification reply unparseable: {e}");
                VerificationResult::failure(e.to_string())
            }
        }
    }
}

fn parse_rubric(value: &Value) -> VerificationResult {
    VerificationResult {
        is_valid: value.get("is_valid").and_then(Value::as_bool).unwrap_or(false),
        overall_score: score_of(value),
        accuracy: criterion(value.get("math_accuracy"), "is_correct", "error_details"),
        completeness: criterion(
            value.get("solution_completeness"),
            "has_all_steps",
            "missing_steps",
        ),
        educational_value: criterion(
            value.get("educational_value"),
            "is_instructive",
            "improvement_areas",
        ),
        feedback: value
            .get("feedback")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        suggestions: string_list(value.get("suggestions")),
    }
}

fn criterion(section: Option<&Value>, passed_key: &str, notes_key: &str) -> CriterionScore {
    let Some(section) = section else {
        return CriterionScore::failed("評価なし");
    };
    CriterionScore {
        passed: section.get(passed_key).and_then(Value::as_bool).unwrap_or(false),
        score: score_of(section),
        notes: string_list(section.get(notes_key)),
    }
}

fn score_of(value: &Value) -> u32 {
    let raw = value.get("score").and_then(Value::as_f64).unwrap_or(0.0);
    raw.clamp(0.0, 100.0).round() as u32
}

/// Accepts either a string or an array of strings for the notes fields.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sakumon_core::ScriptedGenerator;

    fn draft() -> ProblemDraft {
        ProblemDraft::new(
            "二次方程式 x^2 - 4 = 0 を解け。".into(),
            "x = ±2".into(),
            "両辺に4を加えて平方根をとると x = ±2 が得られる。".into(),
        )
    }

    #[tokio::test]
    async fn test_valid_rubric_parsed() {
        let gen = ScriptedGenerator::new(vec![
            r#"{"is_valid": true, "score": 92,
                "math_accuracy": {"is_correct": true, "error_details": "", "score": 95},
                "solution_completeness": {"has_all_steps": true, "missing_steps": [], "score": 90},
                "educational_value": {"is_instructive": true, "improvement_areas": ["図を追加"], "score": 88},
                "feedback": "良問", "suggestions": []}"#,
        ]);
        let prompts = PromptRenderer::new();
        let result = Verifier::new(&gen, &prompts).verify(&draft()).await;
        assert!(result.is_valid);
        assert_eq!(result.overall_score, 92);
        assert_eq!(result.accuracy.score, 95);
        assert_eq!(result.educational_value.notes, vec!["図を追加"]);
    }

    #[tokio::test]
    async fn test_empty_question_skips_model() {
        // No scripted replies: a model call would error out.
        let gen = ScriptedGenerator::new(vec![]);
        let prompts = PromptRenderer::new();
        let mut d = draft();
        d.question = "  ".into();
        let result = Verifier::new(&gen, &prompts).verify(&d).await;
        assert!(!result.is_valid);
        assert_eq!(result.feedback, "問題文が空です");
    }

    #[tokio::test]
    async fn test_thin_explanation_fails_fast() {
        let gen = ScriptedGenerator::new(vec![]);
        let prompts = PromptRenderer::new();
        let mut d = draft();
        d.explanation = "計算する。".into();
        let result = Verifier::new(&gen, &prompts).verify(&d).await;
        assert!(!result.is_valid);
        assert_eq!(result.feedback, "解説が短すぎます");
    }

    #[tokio::test]
    async fn test_garbage_reply_degrades() {
        let gen = ScriptedGenerator::new(vec!["の検証は完了しました。"]);
        let prompts = PromptRenderer::new();
        let result = Verifier::new(&gen, &prompts).verify(&draft()).await;
        assert!(!result.is_valid);
        assert_eq!(result.overall_score, 0);
        assert!(!result.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_error_details_as_string() {
        let gen = ScriptedGenerator::new(vec![
            r#"{"is_valid": false, "score": 40,
                "math_accuracy": {"is_correct": false, "error_details": "符号の誤り", "score": 30},
                "solution_completeness": {"has_all_steps": false, "missing_steps": ["検算"], "score": 50},
                "educational_value": {"is_instructive": true, "improvement_areas": [], "score": 60},
                "feedback": "符号を修正してください", "suggestions": ["符号の確認"]}"#,
        ]);
        let prompts = PromptRenderer::new();
        let result = Verifier::new(&gen, &prompts).verify(&draft()).await;
        assert!(!result.is_valid);
        assert_eq!(result.accuracy.notes, vec!["符号の誤り"]);
        assert_eq!(result.completeness.notes, vec!["検算"]);
    }
}
