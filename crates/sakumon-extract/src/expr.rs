//! Constant folding for arithmetic left in JSON payloads.
//!
//! Drafting models sometimes emit `Math.PI / 3` or `Math.sqrt(2)` where
//! a number belongs, which is not valid JSON. This pass rewrites those
//! tokens to numeric literals before parsing. Only a closed set of
//! constants and functions is recognized; nothing is ever evaluated as
//! code, and an unrecognized `Math.*` token becomes `null` so the payload
//! still parses and downstream validation can reject the field.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::f64::consts::{E, PI};
use tracing::warn;

lazy_static! {
    /// `Math.PI / 3`, `Math.PI * 2`, `2 * Math.PI` and the like.
    static ref PI_BINARY: Regex = Regex::new(
        r"(?:Math\.PI\s*([*/])\s*(-?\d+(?:\.\d+)?))|(?:(-?\d+(?:\.\d+)?)\s*\*\s*Math\.PI)"
    ).unwrap();

    /// Whitelisted one-argument functions applied to a numeric literal.
    static ref MATH_CALL: Regex = Regex::new(
        r"Math\.(sqrt|abs|sin|cos|tan)\(\s*(-?\d+(?:\.\d+)?)\s*\)"
    ).unwrap();

    static ref MATH_CONST: Regex = Regex::new(r"Math\.(PI|E)\b").unwrap();

    /// Anything else in the Math namespace.
    static ref MATH_OTHER: Regex =
        Regex::new(r"Math\.\w+(?:\([^)]*\))?").unwrap();
}

fn fold_pi_binary(caps: &Captures) -> String {
    let value = if let (Some(op), Some(n)) = (caps.get(1), caps.get(2)) {
        let n: f64 = n.as_str().parse().unwrap_or(f64::NAN);
        match op.as_str() {
            "*" => PI * n,
            _ => PI / n,
        }
    } else {
        let n: f64 = caps[3].parse().unwrap_or(f64::NAN);
        n * PI
    };
    if value.is_finite() {
        format!("{}", value)
    } else {
        "null".to_string()
    }
}

fn fold_call(caps: &Captures) -> String {
    let n: f64 = caps[2].parse().unwrap_or(f64::NAN);
    let value = match &caps[1] {
        "sqrt" => n.sqrt(),
        "abs" => n.abs(),
        "sin" => n.sin(),
        "cos" => n.cos(),
        "tan" => n.tan(),
        _ => f64::NAN,
    };
    if value.is_finite() {
        format!("{}", value)
    } else {
        "null".to_string()
    }
}

/// Rewrite recognized `Math.*` tokens to numeric literals.
pub fn fold_expressions(text: &str) -> String {
    let folded = PI_BINARY.replace_all(text, |c: &Captures| fold_pi_binary(c));
    let folded = MATH_CALL.replace_all(&folded, |c: &Captures| fold_call(c));
    let folded = MATH_CONST.replace_all(&folded, |c: &Captures| {
        format!("{}", if &c[1] == "PI" { PI } else { E })
    });
    if MATH_OTHER.is_match(&folded) {
        warn!("unrecognized Math expression in payload, replacing with null");
    }
    MATH_OTHER.replace_all(&folded, "null").into_owned()
}
