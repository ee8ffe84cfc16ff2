//! Data model: ProblemSpec, ChatTurn, ProblemDraft, VerificationResult
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Grade band a problem set is aimed at.
///
/// Serialized with the Japanese school-level vocabulary the prompts and the
/// chat UI use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "小学生")]
    Elementary,
    #[serde(rename = "中学生")]
    Middle,
    #[serde(rename = "高校生")]
    High,
}

impl Difficulty {
    /// Keyword match against a free-form user turn.
    pub fn from_text(text: &str) -> Option<Self> {
        if text.contains("小学") || text.contains("elementary") {
            Some(Self::Elementary)
        } else if text.contains("中学") || text.contains("middle") {
            Some(Self::Middle)
        } else if text.contains("高校") || text.contains("high") {
            Some(Self::High)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Elementary => "小学生",
            Self::Middle => "中学生",
            Self::High => "高校生",
        }
    }
}

/// Question format of a problem set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemFormat {
    #[serde(rename = "計算問題")]
    Computation,
    #[serde(rename = "記述式")]
    FreeResponse,
    #[serde(rename = "選択式")]
    MultipleChoice,
}

impl ProblemFormat {
    pub fn from_text(text: &str) -> Option<Self> {
        if text.contains("計算") {
            Some(Self::Computation)
        } else if text.contains("記述") {
            Some(Self::FreeResponse)
        } else if text.contains("選択") {
            Some(Self::MultipleChoice)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Computation => "計算問題",
            Self::FreeResponse => "記述式",
            Self::MultipleChoice => "選択式",
        }
    }
}

/// Inclusive domain for the problem count slot.
pub const COUNT_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// Partially-resolved problem specification, filled slot by slot from the
/// conversation.
///
/// Each field is either unset or holds a validated value. A rejected
/// candidate never lands here; it is recorded as a
/// [`ValidationError`](crate::ValidationError) on the pipeline state instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ProblemFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u8>,
    /// Accumulated free-text constraints, space-joined across turns.
    #[serde(default)]
    pub details: String,
}

impl ProblemSpec {
    /// All four required slots hold validated values.
    pub fn is_complete(&self) -> bool {
        self.topic.is_some()
            && self.difficulty.is_some()
            && self.format.is_some()
            && self.count.is_some()
    }

    /// Names of the required slots still unset, in question order.
    pub fn missing_slots(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.topic.is_none() {
            missing.push("topic");
        }
        if self.difficulty.is_none() {
            missing.push("difficulty");
        }
        if self.format.is_none() {
            missing.push("format");
        }
        if self.count.is_none() {
            missing.push("count");
        }
        missing
    }

    /// Append a user turn to the details accumulator, space-separated.
    pub fn push_details(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.details.is_empty() {
            self.details.push(' ');
        }
        self.details.push_str(text);
    }

    /// Store a validated count. Out-of-range values are refused.
    pub fn set_count(&mut self, count: u8) -> bool {
        if COUNT_RANGE.contains(&count) {
            self.count = Some(count);
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the slot-filling conversation. The sequence is append-only;
/// the most recent user turn drives the next extraction step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// An unverified candidate problem produced by the drafting stage.
///
/// Revision replaces `question`/`answer`/`explanation` together or not at
/// all; `id` is assigned once and never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDraft {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub explanation: String,
    /// Raw visualization payload from the model, normalized lazily by the
    /// figure crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ProblemDraft {
    pub fn new(question: String, answer: String, explanation: String) -> Self {
        Self {
            id: format!("prob-{}", Uuid::new_v4()),
            question,
            answer,
            explanation,
            visualization: None,
            created_at: Utc::now(),
        }
    }
}

/// One scored verification criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub passed: bool,
    /// 0-100
    pub score: u32,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl CriterionScore {
    pub fn failed(note: impl Into<String>) -> Self {
        Self { passed: false, score: 0, notes: vec![note.into()] }
    }
}

/// Result of one verification pass. Recomputed each pass, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_valid: bool,
    /// 0-100
    pub overall_score: u32,
    pub accuracy: CriterionScore,
    pub completeness: CriterionScore,
    pub educational_value: CriterionScore,
    pub feedback: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl VerificationResult {
    /// The degraded result used when verification itself failed.
    pub fn failure(feedback: impl Into<String>) -> Self {
        let feedback = feedback.into();
        Self {
            is_valid: false,
            overall_score: 0,
            accuracy: CriterionScore::failed(feedback.clone()),
            completeness: CriterionScore::failed("検証不能"),
            educational_value: CriterionScore::failed("検証不能"),
            feedback,
            suggestions: vec!["もう一度お試しください。".to_string()],
        }
    }
}
