//! Conversational slot filling for the problem specification.
//!
//! Each step takes the conversation so far plus the partially-filled
//! [`ProblemSpec`], runs deterministic extraction over the latest user
//! turn, then asks the model to fill whatever is still missing. Filled
//! slots are never overwritten by later turns, and a candidate that fails
//! validation leaves its slot empty and produces user-facing feedback
//! instead.

use crate::numbers;
use crate::payload::StructuredExtractor;
use sakumon_core::{
    ChatRole, ChatTurn, Difficulty, ProblemFormat, ProblemSpec, TextGenerator,
    ValidationError, COUNT_RANGE,
};
use tracing::{debug, warn};

/// Topic keywords and the canonical category they map to.
const TOPIC_KEYWORDS: &[(&str, &str)] = &[
    ("関数", "関数"),
    ("図形", "図形"),
    ("確率", "確率・統計"),
    ("統計", "確率・統計"),
    ("方程式", "数と式"),
    ("数と式", "数と式"),
    ("数列", "数列"),
    ("ベクトル", "ベクトル"),
    ("微分", "微分・積分"),
    ("積分", "微分・積分"),
];

const FALLBACK_QUESTION: &str = "難易度（小学生、中学生、高校生）を教えてください。";
const COMPLETION_MESSAGE: &str = "問題仕様の入力が完了しました。問題を生成します。";
const APOLOGY_MESSAGE: &str = "すみません、エラーが発生しました。もう一度お試しください。";

const SLOT_FILLING_PROMPT: &str = r#"あなたは数学の問題仕様を決定するためのスロットフィリングエージェントです。
ユーザーとの対話を通じて、問題生成に必要な情報を収集してください。

現在の会話履歴:
{chat_history}

現在の問題仕様:
{problem_spec}

以下の項目が必須です：
- difficulty: 難易度（小学生、中学生、高校生のみ有効）
- topic: 数学分野（数と式、関数、図形、確率・統計など）
- format: 出題形式（計算問題、記述式、選択式）
- count: 問題数（1〜10問の整数のみ有効）

オプション項目 details にはユーザーの入力履歴が蓄積されています。
問題生成時の参考情報なので尊重してください。

入力値が制約を満たさない場合はフィールドを空のままにし、
validation_errors に {"field": ..., "message": ...} を記録してください。

出力は以下のJSON形式で返してください：
{
  "problem_spec": {"difficulty": "...", "topic": "...", "format": "...", "count": 0},
  "is_complete": true/false,
  "missing_slots": ["..."],
  "next_question": "次の質問文",
  "validation_errors": []
}"#;

/// Result of one slot-filling step.
#[derive(Debug, Clone)]
pub struct SlotFillingOutcome {
    pub spec: ProblemSpec,
    pub conversation: Vec<ChatTurn>,
    pub is_complete: bool,
    pub validation_errors: Vec<ValidationError>,
}

/// Drives the specification-collection loop.
pub struct SlotFillingEngine<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> SlotFillingEngine<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Run one step of slot filling over the latest user turn.
    ///
    /// Never fails: a generator or parse error keeps the accumulated spec
    /// and appends an apology turn so the user can simply retry.
    pub async fn step(
        &self,
        mut spec: ProblemSpec,
        mut conversation: Vec<ChatTurn>,
    ) -> SlotFillingOutcome {
        let mut validation_errors = Vec::new();

        if let Some(turn) = conversation.iter().rev().find(|t| t.role == ChatRole::User) {
            let input = turn.content.clone();
            self.extract_local(&mut spec, &input, &mut validation_errors);
        }

        // A turn that pins down every slot locally needs no model round
        // trip, and cannot be derailed by one.
        if spec.is_complete() && validation_errors.is_empty() {
            if ends_with_user(&conversation) {
                conversation.push(ChatTurn::assistant(COMPLETION_MESSAGE));
            }
            return SlotFillingOutcome {
                spec,
                conversation,
                is_complete: true,
                validation_errors,
            };
        }

        let reply = match self.ask_model(&spec, &conversation).await {
            Ok(reply) => reply,
            Err(reason) => {
                warn!(%reason, "slot filling model call failed, keeping state");
                conversation.push(ChatTurn::assistant(APOLOGY_MESSAGE));
                let is_complete = spec.is_complete() && validation_errors.is_empty();
                return SlotFillingOutcome {
                    spec,
                    conversation,
                    is_complete,
                    validation_errors,
                };
            }
        };

        self.merge_model_spec(&mut spec, &reply.problem_spec, &mut validation_errors);

        // Completeness is judged from the merged spec, not the model's
        // own claim.
        let is_complete = spec.is_complete() && validation_errors.is_empty();

        if ends_with_user(&conversation) {
            let mut content = if is_complete {
                COMPLETION_MESSAGE.to_string()
            } else if reply.next_question.trim().is_empty() {
                self.question_for(&spec)
            } else {
                reply.next_question.clone()
            };
            if !validation_errors.is_empty() {
                let feedback: Vec<String> =
                    validation_errors.iter().map(user_feedback).collect();
                content = format!("{} {}", feedback.join(" "), content);
            }
            conversation.push(ChatTurn::assistant(content));
        }

        SlotFillingOutcome {
            spec,
            conversation,
            is_complete,
            validation_errors,
        }
    }

    /// Deterministic extraction from a single user turn. Runs before the
    /// model so that explicit values like "5問" cannot be lost to a bad
    /// completion.
    fn extract_local(
        &self,
        spec: &mut ProblemSpec,
        input: &str,
        validation_errors: &mut Vec<ValidationError>,
    ) {
        spec.push_details(input);

        if spec.count.is_none() {
            match numbers::extract_count(input) {
                Ok(Some(n)) => {
                    spec.count = Some(n);
                    debug!(count = n, "extracted problem count");
                }
                Ok(None) => {}
                Err(err) => validation_errors.push(err),
            }
        }

        if spec.difficulty.is_none() {
            spec.difficulty = Difficulty::from_text(input);
        }

        if spec.format.is_none() {
            spec.format = ProblemFormat::from_text(input);
        }

        if spec.topic.is_none() {
            spec.topic = TOPIC_KEYWORDS
                .iter()
                .find(|(keyword, _)| input.contains(keyword))
                .map(|(_, canonical)| canonical.to_string());
        }
    }

    async fn ask_model(
        &self,
        spec: &ProblemSpec,
        conversation: &[ChatTurn],
    ) -> Result<crate::payload::SlotReply, String> {
        let history = serde_json::to_string_pretty(conversation)
            .map_err(|e| e.to_string())?;
        let spec_json = serde_json::to_string_pretty(spec).map_err(|e| e.to_string())?;
        let prompt = SLOT_FILLING_PROMPT
            .replace("{chat_history}", &history)
            .replace("{problem_spec}", &spec_json);

        let raw = self.generator.generate(&prompt).await.map_err(|e| e.to_string())?;
        StructuredExtractor::slot_reply(&raw).map_err(|e| e.to_string())
    }

    /// Merge the model's partial spec into ours. Existing values win, and
    /// every candidate passes the same validation as local extraction.
    fn merge_model_spec(
        &self,
        spec: &mut ProblemSpec,
        model_spec: &serde_json::Value,
        validation_errors: &mut Vec<ValidationError>,
    ) {
        if spec.difficulty.is_none() {
            if let Some(text) = non_empty_str(model_spec, "difficulty") {
                match Difficulty::from_text(text) {
                    Some(d) => spec.difficulty = Some(d),
                    None => validation_errors.push(ValidationError::unknown_difficulty()),
                }
            }
        }
        if spec.topic.is_none() {
            if let Some(text) = non_empty_str(model_spec, "topic") {
                spec.topic = Some(text.to_string());
            }
        }
        if spec.format.is_none() {
            if let Some(text) = non_empty_str(model_spec, "format") {
                spec.format = ProblemFormat::from_text(text);
            }
        }
        if spec.count.is_none() {
            if let Some(n) = model_spec.get("count").and_then(|v| v.as_u64()) {
                match u8::try_from(n) {
                    Ok(n) if COUNT_RANGE.contains(&n) => spec.count = Some(n),
                    _ => validation_errors.push(ValidationError::count_out_of_range()),
                }
            }
        }
    }

    /// Canned question for the first missing slot, in fixed order.
    fn question_for(&self, spec: &ProblemSpec) -> String {
        match spec.missing_slots().first() {
            Some(&"topic") => {
                "出題したい数学分野（数と式、関数、図形、確率・統計など）を教えてください。"
            }
            Some(&"difficulty") => FALLBACK_QUESTION,
            Some(&"format") => "出題形式（計算問題、記述式、選択式）を教えてください。",
            Some(&"count") => "問題数（1〜10問）を教えてください。",
            _ => FALLBACK_QUESTION,
        }
        .to_string()
    }
}

fn ends_with_user(conversation: &[ChatTurn]) -> bool {
    conversation
        .last()
        .map(|t| t.role == ChatRole::User)
        .unwrap_or(false)
}

fn non_empty_str<'v>(value: &'v serde_json::Value, key: &str) -> Option<&'v str> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// User-facing wording for a validation error, keyed by field.
fn user_feedback(err: &ValidationError) -> String {
    match err.field.as_str() {
        "count" => "問題数は1〜10問の範囲内で指定してください。".to_string(),
        "difficulty" => {
            "難易度は「小学生」「中学生」「高校生」のいずれかで指定してください。".to_string()
        }
        _ => err.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sakumon_core::ScriptedGenerator;

    fn empty_reply() -> &'static str {
        r#"{"problem_spec": {}, "next_question": "", "is_complete": false}"#
    }

    #[tokio::test]
    async fn test_local_extraction_fills_multiple_slots() {
        let generator = ScriptedGenerator::new(vec![empty_reply()]);
        let engine = SlotFillingEngine::new(&generator);
        let conversation = vec![ChatTurn::user("高校生向けの関数の問題を5問、計算問題で")];
        let outcome = engine.step(ProblemSpec::default(), conversation).await;

        assert_eq!(outcome.spec.difficulty, Some(Difficulty::High));
        assert_eq!(outcome.spec.topic.as_deref(), Some("関数"));
        assert_eq!(outcome.spec.format, Some(ProblemFormat::Computation));
        assert_eq!(outcome.spec.count, Some(5));
        assert!(outcome.is_complete);
    }

    #[tokio::test]
    async fn test_filled_slots_are_never_clobbered() {
        let generator = ScriptedGenerator::new(vec![
            r#"{"problem_spec": {"difficulty": "小学生", "count": 3}, "next_question": "分野は？", "is_complete": false}"#,
        ]);
        let engine = SlotFillingEngine::new(&generator);
        let mut spec = ProblemSpec::default();
        spec.difficulty = Some(Difficulty::High);
        spec.count = Some(7);
        let outcome = engine
            .step(spec, vec![ChatTurn::user("お任せします")])
            .await;

        assert_eq!(outcome.spec.difficulty, Some(Difficulty::High));
        assert_eq!(outcome.spec.count, Some(7));
    }

    #[tokio::test]
    async fn test_out_of_range_count_produces_feedback() {
        let generator = ScriptedGenerator::new(vec![empty_reply()]);
        let engine = SlotFillingEngine::new(&generator);
        let conversation = vec![ChatTurn::user("15問お願いします")];
        let outcome = engine.step(ProblemSpec::default(), conversation).await;

        assert_eq!(outcome.spec.count, None);
        assert!(!outcome.is_complete);
        assert_eq!(outcome.validation_errors.len(), 1);
        let last = outcome.conversation.last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert!(last.content.contains("1〜10問の範囲内で指定してください"));
    }

    #[tokio::test]
    async fn test_details_accumulate_across_steps() {
        let generator = ScriptedGenerator::new(vec![empty_reply(), empty_reply()]);
        let engine = SlotFillingEngine::new(&generator);

        let outcome = engine
            .step(ProblemSpec::default(), vec![ChatTurn::user("二次関数で")])
            .await;
        let mut conversation = outcome.conversation;
        conversation.push(ChatTurn::user("グラフ付きでお願いします"));
        let outcome = engine.step(outcome.spec, conversation).await;

        assert_eq!(outcome.spec.details, "二次関数で グラフ付きでお願いします");
    }

    #[tokio::test]
    async fn test_generator_failure_keeps_state_and_apologizes() {
        let generator = ScriptedGenerator::from_results(vec![Err(
            sakumon_core::ServiceError::EmptyResponse,
        )]);
        let engine = SlotFillingEngine::new(&generator);
        let conversation = vec![ChatTurn::user("中学生向けの図形の問題")];
        let outcome = engine.step(ProblemSpec::default(), conversation).await;

        // Local extraction already ran before the failed model call.
        assert_eq!(outcome.spec.difficulty, Some(Difficulty::Middle));
        assert_eq!(outcome.spec.topic.as_deref(), Some("図形"));
        assert!(!outcome.is_complete);
        assert!(outcome
            .conversation
            .last()
            .unwrap()
            .content
            .contains("もう一度お試しください"));
    }

    #[tokio::test]
    async fn test_complete_turn_skips_model_and_survives_outage() {
        // No usable model: a fully specified turn must complete anyway.
        let generator = ScriptedGenerator::from_results(vec![Err(
            sakumon_core::ServiceError::Timeout(60),
        )]);
        let engine = SlotFillingEngine::new(&generator);
        let conversation = vec![ChatTurn::user("高校生向けの関数の問題を5問、計算問題で")];
        let outcome = engine.step(ProblemSpec::default(), conversation).await;

        assert!(outcome.spec.is_complete());
        assert!(outcome.is_complete);
        let last = outcome.conversation.last().unwrap();
        assert_eq!(last.content, COMPLETION_MESSAGE);
    }

    #[tokio::test]
    async fn test_canned_question_for_first_missing_slot() {
        let generator = ScriptedGenerator::new(vec![empty_reply()]);
        let engine = SlotFillingEngine::new(&generator);
        let conversation = vec![ChatTurn::user("高校生向けの関数の問題")];
        let outcome = engine.step(ProblemSpec::default(), conversation).await;

        // Topic and difficulty are filled; format is asked about next.
        let last = outcome.conversation.last().unwrap();
        assert!(last.content.contains("出題形式"));
    }
}
