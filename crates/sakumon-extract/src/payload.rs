//! JSON payload recovery from model replies.
//!
//! Replies arrive in three shapes, tried in order:
//! 1. a fenced ```json block,
//! 2. the whole reply, if it happens to be raw JSON,
//! 3. a bare `{...}` object embedded in prose.
//!
//! The whole-reply parse runs before the embedded-object scan so a bare
//! array reply is taken whole instead of being truncated to its first
//! element.
//!
//! When all three fail to parse, a repair pass pulls out the fields we
//! know the prompt asked for and rebuilds a minimal object from them.

use lazy_static::lazy_static;
use regex::Regex;
use sakumon_core::ExtractionError;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

lazy_static! {
    /// Fenced code block, with or without a language tag.
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap();

    /// Zero-width characters that some models sprinkle into output.
    static ref ZERO_WIDTH: Regex =
        Regex::new(r"[\u{200B}-\u{200D}\u{FEFF}]").unwrap();

    /// Repair targets: the two fields the slot-filling prompt asks for.
    static ref SPEC_FIELD: Regex =
        Regex::new(r#""problem_spec"\s*:\s*(\{[^}]*\})"#).unwrap();
    static ref QUESTION_FIELD: Regex =
        Regex::new(r#""next_question"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap();
    static ref COMPLETE_FIELD: Regex =
        Regex::new(r#""is_complete"\s*:\s*(true|false)"#).unwrap();
}

/// Find the first balanced `{...}` region in `text`.
///
/// Brace counting ignores braces inside string literals so that
/// `{"q": "set {1, 2}"}` comes back whole.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract a JSON value from a model reply.
pub fn extract_json(text: &str) -> Result<Value, ExtractionError> {
    let cleaned = ZERO_WIDTH.replace_all(text, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(ExtractionError::Empty);
    }

    if let Some(caps) = FENCED_BLOCK.captures(cleaned) {
        let body = caps[1].trim();
        if let Ok(value) = serde_json::from_str(body) {
            return Ok(value);
        }
        debug!("fenced block present but not valid JSON, falling through");
    }

    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Some(slice) = balanced_object(cleaned) {
                if let Ok(value) = serde_json::from_str(slice) {
                    return Ok(value);
                }
            }
            Err(ExtractionError::Parse(e.to_string()))
        }
    }
}

/// A parsed slot-filling reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotReply {
    #[serde(default)]
    pub problem_spec: Value,
    #[serde(default)]
    pub next_question: String,
    #[serde(default)]
    pub is_complete: bool,
}

/// Extractor for the slot-filling reply shape.
pub struct StructuredExtractor;

impl StructuredExtractor {
    /// Parse a slot-filling reply, repairing truncated JSON if needed.
    pub fn slot_reply(text: &str) -> Result<SlotReply, ExtractionError> {
        match extract_json(text) {
            Ok(value) => serde_json::from_value(value)
                .map_err(|e| ExtractionError::Parse(e.to_string())),
            Err(ExtractionError::Empty) => Err(ExtractionError::Empty),
            Err(first) => Self::repair(text).ok_or_else(|| {
                ExtractionError::RepairFailed(first.to_string())
            }),
        }
    }

    /// Rebuild a reply from whatever fields survived truncation.
    fn repair(text: &str) -> Option<SlotReply> {
        let cleaned = ZERO_WIDTH.replace_all(text, "");
        let spec = SPEC_FIELD
            .captures(&cleaned)
            .and_then(|c| serde_json::from_str(&c[1]).ok())?;
        let next_question = QUESTION_FIELD
            .captures(&cleaned)
            .and_then(|c| serde_json::from_str::<String>(&format!("\"{}\"", &c[1])).ok())
            .unwrap_or_default();
        let is_complete = COMPLETE_FIELD
            .captures(&cleaned)
            .map(|c| &c[1] == "true")
            .unwrap_or(false);
        debug!("repaired truncated slot reply");
        Some(SlotReply {
            problem_spec: spec,
            next_question,
            is_complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block() {
        let text = "承知しました。\n```json\n{\"is_complete\": true}\n```\n以上です。";
        let value = extract_json(text).unwrap();
        assert_eq!(value["is_complete"], true);
    }

    #[test]
    fn test_embedded_object() {
        let text = "結果: {\"next_question\": \"難易度は？\"} でした";
        let value = extract_json(text).unwrap();
        assert_eq!(value["next_question"], "難易度は？");
    }

    #[test]
    fn test_whole_text() {
        let value = extract_json("[1, 2, 3]").unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_bare_array_of_objects_taken_whole() {
        let text = r#"[{"question": "1+1は?"}, {"question": "2+2は?"}]"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_zero_width_stripped() {
        let text = "\u{FEFF}{\"a\":\u{200B} 1}";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = "前置き {\"q\": \"集合 {1, 2} を考える\"} 後置き";
        let value = extract_json(text).unwrap();
        assert_eq!(value["q"], "集合 {1, 2} を考える");
    }

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(extract_json("  \n "), Err(ExtractionError::Empty)));
    }

    #[test]
    fn test_repair_truncated_reply() {
        // Closing brace of the outer object lost in transit.
        let text = r#"{"problem_spec": {"topic": "関数"}, "next_question": "何問必要ですか？", "is_complete": false"#;
        let reply = StructuredExtractor::slot_reply(text).unwrap();
        assert_eq!(reply.problem_spec["topic"], "関数");
        assert_eq!(reply.next_question, "何問必要ですか？");
        assert!(!reply.is_complete);
    }

    #[test]
    fn test_unrepairable_is_error() {
        let err = StructuredExtractor::slot_reply("ただの文章です").unwrap_err();
        assert!(matches!(err, ExtractionError::RepairFailed(_) | ExtractionError::Parse(_)));
    }
}
