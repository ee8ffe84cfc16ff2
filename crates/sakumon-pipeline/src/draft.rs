//! Problem drafting.
//!
//! Builds the generation prompt from a completed [`ProblemSpec`], calls the
//! text generator, and repairs the common shapes a model returns instead of
//! the single-object schema it was asked for: JSON arrays, structured
//! answer/explanation objects, and raw expression remnants.

use sakumon_core::{PipelineError, ProblemDraft, ProblemSpec, TextGenerator};
use sakumon_extract::{expr, extract_json};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::prompts::{PromptRenderer, DRAFT_TEMPLATE};

pub struct DraftEngine<'a> {
    generator: &'a dyn TextGenerator,
    prompts: &'a PromptRenderer,
}

impl<'a> DraftEngine<'a> {
    pub fn new(generator: &'a dyn TextGenerator, prompts: &'a PromptRenderer) -> Self {
        Self { generator, prompts }
    }

    pub async fn draft(&self, spec: &ProblemSpec) -> Result<ProblemDraft, PipelineError> {
        let count = spec.count.unwrap_or(1);
        let data = json!({
            "difficulty": spec.difficulty.map(|d| d.label()).unwrap_or("中学生"),
            "topic": spec.topic.as_deref().unwrap_or("数と式"),
            "format": spec.format.map(|f| f.label()).unwrap_or("記述式"),
            "count": count,
            "details": spec.details,
        });
        let prompt = self.prompts.render(DRAFT_TEMPLATE, &data)?;
        let reply = self.generator.generate(&prompt).await?;
        let folded = expr::fold_expressions(&reply);
        let value = extract_json(&folded)?;
        let value = restructure(value);
        let mut draft = into_draft(value)?;

        if count > 1 && !draft.question.contains("問1") && !draft.question.contains("問１") {
            draft.question = format!(
                "以下の{count}問の問題に答えなさい。\n\n{}",
                draft.question
            );
        }
        for issue in validate_draft(&draft) {
            warn!("draft quality: {issue}");
        }
        debug!(id = %draft.id, "draft produced");
        Ok(draft)
    }
}

/// Collapses an array reply into a single object. A one-element array
/// unwraps; a multi-problem array is merged into one numbered question
/// with combined answers and explanations, keeping the first figure.
fn restructure(value: Value) -> Value {
    let arr = match value {
        Value::Array(a) => a,
        other => return other,
    };
    match arr.len() {
        0 => Value::Object(Map::new()),
        1 => arr.into_iter().next().unwrap_or_default(),
        _ => merge_problems(&arr),
    }
}

fn merge_problems(items: &[Value]) -> Value {
    let mut questions = Vec::new();
    let mut answers = Vec::new();
    let mut explanations = Vec::new();
    let mut visualization = None;
    for (i, item) in items.iter().enumerate() {
        let n = i + 1;
        if let Some(q) = field_text(item, "question") {
            questions.push(format!("問{n}. {q}"));
        }
        if let Some(a) = field_text(item, "answer") {
            answers.push(format!("問{n}の解答: {a}"));
        }
        if let Some(e) = field_text(item, "explanation") {
            explanations.push(format!("問{n}の解説:\n{e}"));
        }
        if visualization.is_none() {
            visualization = item.get("visualization").filter(|v| !v.is_null()).cloned();
        }
    }
    let mut merged = Map::new();
    merged.insert("question".into(), Value::String(questions.join("\n\n")));
    merged.insert("answer".into(), Value::String(answers.join("\n")));
    merged.insert(
        "explanation".into(),
        Value::String(explanations.join("\n\n")),
    );
    if let Some(v) = visualization {
        merged.insert("visualization".into(), v);
    }
    Value::Object(merged)
}

fn into_draft(value: Value) -> Result<ProblemDraft, PipelineError> {
    let question = field_text(&value, "question").unwrap_or_default();
    let answer = field_text(&value, "answer").unwrap_or_default();
    let explanation = field_text(&value, "explanation").unwrap_or_default();
    let mut draft = ProblemDraft::new(question, answer, explanation);
    if let Some(id) = value.get("id").and_then(Value::as_str) {
        if !id.is_empty() {
            draft.id = id.to_string();
        }
    }
    draft.visualization = value.get("visualization").filter(|v| !v.is_null()).cloned();
    Ok(draft)
}

/// Textual content of a draft field, flattening structured replies.
fn field_text(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => Some(object_to_text(map)),
        Value::Array(items) => Some(
            items
                .iter()
                .map(scalar_text)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Flattens a structured answer or explanation into readable prose.
/// Models sometimes return `{"steps": [...]}` or `{"process": [...]}`
/// instead of a single string.
fn object_to_text(map: &Map<String, Value>) -> String {
    if let Some(Value::Array(steps)) = map.get("steps") {
        return steps
            .iter()
            .enumerate()
            .map(|(i, s)| format!("ステップ{}: {}", i + 1, scalar_text(s)))
            .collect::<Vec<_>>()
            .join("\n\n");
    }
    if let Some(Value::Array(process)) = map.get("process") {
        return process
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, scalar_text(s)))
            .collect::<Vec<_>>()
            .join("\n\n");
    }
    map.iter()
        .map(|(k, v)| format!("{k}: {}", scalar_text(v)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Soft quality checks. Failures are logged, never fatal: a short
/// explanation still renders, and verification catches real defects.
fn validate_draft(draft: &ProblemDraft) -> Vec<String> {
    let mut issues = Vec::new();
    if draft.question.chars().count() < 10 {
        issues.push(format!("question too short ({})", draft.id));
    }
    if draft.answer.chars().count() < 1 {
        issues.push(format!("answer empty ({})", draft.id));
    }
    if draft.explanation.chars().count() < 20 {
        issues.push(format!("explanation too short ({})", draft.id));
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use sakumon_core::{Difficulty, ProblemFormat, ScriptedGenerator};

    fn spec() -> ProblemSpec {
        ProblemSpec {
            topic: Some("関数".into()),
            difficulty: Some(Difficulty::High),
            format: Some(ProblemFormat::FreeResponse),
            count: Some(1),
            details: String::new(),
        }
    }

    #[tokio::test]
    async fn test_single_object_reply() {
        let gen = ScriptedGenerator::new(vec![
            r#"{"id": "prob-9", "question": "x^2 + 2x + 1 = 0 を解け。", "answer": "x = -1", "explanation": "左辺は (x+1)^2 と因数分解できるので、x = -1 が重解となる。"}"#,
        ]);
        let prompts = PromptRenderer::new();
        let engine = DraftEngine::new(&gen, &prompts);
        let draft = engine.draft(&spec()).await.unwrap();
        assert_eq!(draft.id, "prob-9");
        assert_eq!(draft.answer, "x = -1");
    }

    #[tokio::test]
    async fn test_array_reply_is_merged() {
        let gen = ScriptedGenerator::new(vec![
            r#"[{"question": "1+1は?", "answer": "2", "explanation": "加法。"},
                {"question": "2+2は?", "answer": "4", "explanation": "加法。"}]"#,
        ]);
        let prompts = PromptRenderer::new();
        let engine = DraftEngine::new(&gen, &prompts);
        let mut s = spec();
        s.count = Some(2);
        let draft = engine.draft(&s).await.unwrap();
        assert!(draft.question.contains("問1. 1+1は?"));
        assert!(draft.question.contains("問2. 2+2は?"));
        assert!(draft.answer.contains("問1の解答: 2"));
        assert!(draft.explanation.contains("問2の解説:"));
    }

    #[tokio::test]
    async fn test_multi_count_prefix() {
        let gen = ScriptedGenerator::new(vec![
            r#"{"question": "次の式を計算せよ。(1) 1+1 (2) 2+2 (3) 3+3", "answer": "2, 4, 6", "explanation": "それぞれ加法を適用すればよい。"}"#,
        ]);
        let prompts = PromptRenderer::new();
        let engine = DraftEngine::new(&gen, &prompts);
        let mut s = spec();
        s.count = Some(3);
        let draft = engine.draft(&s).await.unwrap();
        assert!(draft.question.starts_with("以下の3問の問題に答えなさい。\n\n"));
    }

    #[tokio::test]
    async fn test_structured_explanation_flattened() {
        let gen = ScriptedGenerator::new(vec![
            r#"{"question": "x^2 = 4 を解け。", "answer": "x = ±2", "explanation": {"steps": ["両辺の平方根をとる", "x = ±2 を得る"]}}"#,
        ]);
        let prompts = PromptRenderer::new();
        let engine = DraftEngine::new(&gen, &prompts);
        let draft = engine.draft(&spec()).await.unwrap();
        assert!(draft.explanation.contains("ステップ1: 両辺の平方根をとる"));
        assert!(draft.explanation.contains("ステップ2:"));
    }

    #[tokio::test]
    async fn test_expression_remnants_folded() {
        let gen = ScriptedGenerator::new(vec![
            r#"{"question": "円の面積を求めよ。半径は2とする。", "answer": "Math.PI * 4", "explanation": "面積は πr^2 なので、半径2のとき 4π となる。"}"#,
        ]);
        let prompts = PromptRenderer::new();
        let engine = DraftEngine::new(&gen, &prompts);
        let draft = engine.draft(&spec()).await.unwrap();
        assert_eq!(draft.answer, "12.566370614359172");
    }
}
