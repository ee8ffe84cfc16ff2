//! Problem-count recognition in Japanese text.
//!
//! Users say "5問", "五問ください", "問題数は３", or just "3". All of
//! those need to land in the same `count` slot, and a count outside the
//! supported range is a validation error rather than silence, so the
//! engine can ask for a correction instead of re-asking from scratch.

use lazy_static::lazy_static;
use regex::Regex;
use sakumon_core::{ValidationError, COUNT_RANGE};

lazy_static! {
    /// Digits followed by a counter word: 5問, 3個, 10題.
    static ref DIGIT_COUNTER: Regex = Regex::new(r"(\d+)\s*[問個題]").unwrap();

    /// Explicit count statement: 問題数は5.
    static ref COUNT_STATEMENT: Regex = Regex::new(r"問題数は\s*(\d+)").unwrap();

    /// The whole message is a bare integer.
    static ref BARE_INTEGER: Regex = Regex::new(r"^(\d+)$").unwrap();

    /// Kanji or fullwidth numerals with a counter word.
    static ref WIDE_COUNTER: Regex =
        Regex::new(r"([一二三四五六七八九十１２３４５６７８９０]+)\s*[問個題]").unwrap();
}

/// Value of a kanji or fullwidth numeral, so that an out-of-range
/// "十五問" is rejected the same way "15問" is.
fn wide_numeral_value(text: &str) -> Option<u32> {
    // Fullwidth digits are positional.
    if text.chars().all(|c| ('０'..='９').contains(&c)) {
        return text.chars().fold(Some(0u32), |acc, c| {
            let digit = c as u32 - '０' as u32;
            acc.and_then(|n| n.checked_mul(10)).and_then(|n| n.checked_add(digit))
        });
    }
    // Kanji counts use the tens-unit form: 五, 十, 十五, 二十五.
    if let Some((tens, units)) = text.split_once('十') {
        let tens = if tens.is_empty() { 1 } else { kanji_digit(tens)? };
        let units = if units.is_empty() { 0 } else { kanji_digit(units)? };
        return Some(tens * 10 + units);
    }
    kanji_digit(text)
}

fn kanji_digit(text: &str) -> Option<u32> {
    let mut chars = text.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    "一二三四五六七八九"
        .chars()
        .position(|k| k == c)
        .map(|i| i as u32 + 1)
}

/// Extract a problem count from a user message.
///
/// Returns `Ok(None)` when the message contains no count at all, and an
/// error when it names a count outside the supported range.
pub fn extract_count(text: &str) -> Result<Option<u8>, ValidationError> {
    let trimmed = text.trim();

    let digits = DIGIT_COUNTER
        .captures(trimmed)
        .or_else(|| COUNT_STATEMENT.captures(trimmed))
        .or_else(|| BARE_INTEGER.captures(trimmed))
        .and_then(|c| c[1].parse::<u32>().ok());

    let value = match digits {
        Some(n) => Some(n),
        None => WIDE_COUNTER
            .captures(trimmed)
            .and_then(|c| wide_numeral_value(&c[1])),
    };

    match value {
        None => Ok(None),
        Some(n) => match u8::try_from(n) {
            Ok(n) if COUNT_RANGE.contains(&n) => Ok(Some(n)),
            _ => Err(ValidationError::count_out_of_range()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_with_counter() {
        assert_eq!(extract_count("5問お願いします").unwrap(), Some(5));
        assert_eq!(extract_count("問題を 3 個ください").unwrap(), Some(3));
        assert_eq!(extract_count("10題作って").unwrap(), Some(10));
    }

    #[test]
    fn test_count_statement() {
        assert_eq!(extract_count("問題数は7でお願いします").unwrap(), Some(7));
    }

    #[test]
    fn test_bare_integer() {
        assert_eq!(extract_count("4").unwrap(), Some(4));
        // Embedded digits without a counter word are not a count.
        assert_eq!(extract_count("二次関数 y = 3x^2 の問題").unwrap(), None);
    }

    #[test]
    fn test_kanji_numerals() {
        assert_eq!(extract_count("五問ください").unwrap(), Some(5));
        assert_eq!(extract_count("十問作ってほしい").unwrap(), Some(10));
    }

    #[test]
    fn test_fullwidth_digits() {
        assert_eq!(extract_count("３問でお願いします").unwrap(), Some(3));
        assert_eq!(extract_count("１０問").unwrap(), Some(10));
    }

    #[test]
    fn test_out_of_range_is_error() {
        assert!(extract_count("15問お願いします").is_err());
        assert!(extract_count("0問").is_err());
        assert!(extract_count("300問").is_err());
    }

    #[test]
    fn test_wide_out_of_range_is_error() {
        assert!(extract_count("１５問お願いします").is_err());
        assert!(extract_count("十五問ください").is_err());
        assert!(extract_count("二十問").is_err());
    }

    #[test]
    fn test_no_count() {
        assert_eq!(extract_count("図形の問題をお願いします").unwrap(), None);
    }
}
