//! Sakumon-Figure: visualization normalization and vector-drawing emission.
//!
//! Drafting models describe figures in a loose JSON dialect: functions as
//! bare strings, points as `{x, y}` objects, styles as objects or CSS-ish
//! colors. [`normalize`] coerces all of that into one strict intermediate
//! representation ([`ir`]), and [`tikz`] turns the IR into a pgfplots/TikZ
//! fragment ready to drop into a LaTeX template.
//!
//! Figure failures are always contained: [`render`] never propagates an
//! error, it degrades to a `%`-comment so the surrounding document still
//! compiles.

pub mod geometry;
pub mod ir;
pub mod normalize;
pub mod tikz;

pub use ir::Visualization;
pub use normalize::normalize;

use tracing::warn;

/// Render a raw visualization payload to a drawing fragment.
///
/// Any normalization or emission failure comes back as a comment line, so
/// a malformed figure can never break the enclosing document.
pub fn render(raw: &serde_json::Value) -> String {
    match normalize(raw).and_then(|vis| tikz::emit(&vis)) {
        Ok(code) => code,
        Err(err) => {
            warn!(%err, "figure rendering failed, emitting comment");
            format!("% {}", err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_contains_failures() {
        let out = render(&json!({"type": "hologram"}));
        assert!(out.starts_with("% "));
        assert!(!out.contains('\n'));
    }

    #[test]
    fn test_render_happy_path() {
        let out = render(&json!({
            "type": "function_graph",
            "functions": ["x^2"]
        }));
        assert!(out.contains("\\begin{tikzpicture}"));
    }
}
