//! Coercion from the loose model-emitted figure dialect into the strict IR.
//!
//! The drafting model is inconsistent about field names and shapes:
//! functions arrive as bare strings or objects keyed `expression`,
//! `formula` or `function`; points as `[x, y]` or `{x, y}`; styles as
//! TikZ strings, CSS-ish objects, or the word `solid`. Everything is
//! resolved here, once, so the emitter only ever sees one shape.

use crate::ir::{
    Axes, DimensionLine, Element, FigureLabel, FillArea, FunctionGraph, FunctionPlot,
    Geometric, Point, Visualization,
};
use sakumon_core::RenderingError;
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_DOMAIN: [f64; 2] = [-10.0, 10.0];

/// Normalize a raw visualization payload.
pub fn normalize(raw: &Value) -> Result<Visualization, RenderingError> {
    let ty = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RenderingError("visualization has no type field".into()))?;

    match ty {
        "function_graph" => normalize_function_graph(raw).map(Visualization::FunctionGraph),
        "geometric" => normalize_geometric(raw).map(Visualization::Geometric),
        other => Err(RenderingError(format!(
            "unsupported visualization type: {other}"
        ))),
    }
}

fn normalize_function_graph(raw: &Value) -> Result<FunctionGraph, RenderingError> {
    let entries = raw
        .get("functions")
        .and_then(Value::as_array)
        .ok_or_else(|| RenderingError("function_graph requires a functions array".into()))?;

    let functions: Vec<FunctionPlot> = entries.iter().map(normalize_plot).collect();
    if functions.is_empty() {
        return Err(RenderingError("function_graph has an empty functions array".into()));
    }

    let axes = match raw.get("axes") {
        Some(axes) => Axes {
            xrange: pair_or(axes.get("xrange"), DEFAULT_DOMAIN)?,
            yrange: pair_or(axes.get("yrange"), DEFAULT_DOMAIN)?,
        },
        None => Axes::default(),
    };

    let mut highlight_points = Vec::new();
    if let Some(points) = raw.get("highlight_points").and_then(Value::as_array) {
        for entry in points {
            let point = parse_point(entry)
                .ok_or_else(|| RenderingError("invalid highlight point".into()))?;
            highlight_points.push(point);
        }
    }

    let fill_area = normalize_fill_area(raw.get("fill_area"), &functions)?;

    Ok(FunctionGraph { functions, axes, highlight_points, fill_area })
}

/// String entries become fully-defaulted plots; objects resolve their
/// aliases (`formula`, `function`, `range`, `color`, `name`).
fn normalize_plot(entry: &Value) -> FunctionPlot {
    if let Some(expression) = entry.as_str() {
        return FunctionPlot {
            expression: expression.to_string(),
            domain: DEFAULT_DOMAIN,
            style: "blue".to_string(),
            label: expression.to_string(),
        };
    }

    let expression = str_alias(entry, &["expression", "formula", "function"])
        .unwrap_or("x")
        .to_string();
    let domain = entry
        .get("domain")
        .or_else(|| entry.get("range"))
        .and_then(parse_pair)
        .unwrap_or(DEFAULT_DOMAIN);
    let style = str_alias(entry, &["style", "color"])
        .unwrap_or("blue")
        .to_string();
    let label = str_alias(entry, &["label", "name", "expression"])
        .unwrap_or("f(x)")
        .to_string();

    FunctionPlot { expression, domain, style, label }
}

fn normalize_fill_area(
    raw: Option<&Value>,
    functions: &[FunctionPlot],
) -> Result<Option<FillArea>, RenderingError> {
    let Some(raw) = raw.filter(|v| v.is_object()) else {
        return Ok(None);
    };

    let between = match raw.get("between") {
        Some(Value::String(one)) => [one.clone(), "x".to_string()],
        Some(Value::Array(pair)) if pair.len() == 2 => {
            let mut names = pair.iter().filter_map(Value::as_str);
            match (names.next(), names.next()) {
                (Some(a), Some(b)) => [a.to_string(), b.to_string()],
                _ => return Err(RenderingError("fill_area.between must name two curves".into())),
            }
        }
        Some(_) => {
            return Err(RenderingError("fill_area.between must name two curves".into()))
        }
        None => {
            debug!("fill_area without a between pair, dropping");
            return Ok(None);
        }
    };

    // Unspecified fill domain inherits the first curve's domain.
    let domain = raw
        .get("domain")
        .and_then(parse_pair)
        .or_else(|| functions.first().map(|f| f.domain))
        .unwrap_or(DEFAULT_DOMAIN);

    Ok(Some(FillArea { between, domain }))
}

fn normalize_geometric(raw: &Value) -> Result<Geometric, RenderingError> {
    let entries = raw
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| RenderingError("geometric requires an elements array".into()))?;

    let mut elements = Vec::new();
    for entry in entries {
        match normalize_element(entry) {
            Some(element) => elements.push(element),
            None => warn!("skipping malformed geometric element"),
        }
    }
    if elements.is_empty() {
        return Err(RenderingError("geometric has no drawable elements".into()));
    }

    let labels = raw
        .get("labels")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(normalize_label).collect())
        .unwrap_or_default();

    let dimensions = raw
        .get("dimensions")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(normalize_dimension).collect())
        .unwrap_or_default();

    let grid = raw
        .get("grid")
        .or_else(|| raw.get("gridVisible"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(Geometric { elements, labels, dimensions, grid })
}

fn normalize_element(entry: &Value) -> Option<Element> {
    let ty = entry.get("type").and_then(Value::as_str)?;
    // Named polygon shapes collapse to one variant.
    let ty = match ty {
        "triangle" | "rectangle" | "quadrilateral" => "polygon",
        other => other,
    };

    match ty {
        "point" => {
            let at = entry
                .get("points")
                .and_then(Value::as_array)
                .and_then(|pts| pts.first())
                .or_else(|| entry.get("at"))
                .and_then(parse_point)?;
            Some(Element::Point { at, style: style_or(entry, "fill=black") })
        }
        "line" => {
            let points = parse_points(entry.get("points")?)?;
            (points.len() >= 2)
                .then(|| Element::Line { points, style: style_or(entry, "thick") })
        }
        "polygon" => {
            let points = parse_points(entry.get("points")?)?;
            (points.len() >= 3)
                .then(|| Element::Polygon { points, style: style_or(entry, "thick") })
        }
        "circle" => {
            let center = parse_point(entry.get("center")?)?;
            let radius = finite(entry.get("radius")?.as_f64()?)?;
            (radius > 0.0)
                .then(|| Element::Circle { center, radius, style: style_or(entry, "thick") })
        }
        "arc" => {
            let center = parse_point(entry.get("center")?)?;
            let radius = finite(entry.get("radius")?.as_f64()?)?;
            let start_angle = angle_alias(entry, &["start_angle", "startAngle", "start"])?;
            let end_angle = angle_alias(entry, &["end_angle", "endAngle", "end"])?;
            Some(Element::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                style: style_or(entry, "thick"),
            })
        }
        "angle" => {
            let vertex = parse_point(entry.get("vertex")?)?;
            let arm1 = parse_point(entry.get("angle1").or_else(|| entry.get("arm1"))?)?;
            let arm2 = parse_point(entry.get("angle2").or_else(|| entry.get("arm2"))?)?;
            Some(Element::Angle {
                vertex,
                arm1,
                arm2,
                style: style_or(entry, "draw=black, fill=gray!20, opacity=0.5"),
            })
        }
        "text" => {
            let position = parse_point(entry.get("position")?)?;
            let text = entry.get("text")?.as_str()?.to_string();
            Some(Element::Text { position, text, style: style_or(entry, "") })
        }
        _ => None,
    }
}

fn normalize_label(entry: &Value) -> Option<FigureLabel> {
    Some(FigureLabel {
        position: parse_point(entry.get("position")?)?,
        text: entry.get("text")?.as_str()?.to_string(),
        anchor: entry
            .get("anchor")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn normalize_dimension(entry: &Value) -> Option<DimensionLine> {
    let from = parse_point(entry.get("from")?)?;
    let to = parse_point(entry.get("to")?)?;
    let text = str_alias(entry, &["text", "dimension", "label"])
        .map(str::to_string)
        .unwrap_or_else(|| {
            let distance = crate::geometry::distance(from, to);
            format!("{}cm", distance.round())
        });
    let offset = entry
        .get("offset")
        .and_then(Value::as_f64)
        .and_then(finite)
        .unwrap_or(0.2);
    Some(DimensionLine { from, to, text, offset })
}

/// Style objects (`{fill, stroke, thickness}`) and the word `solid`
/// resolve to TikZ option strings; plain strings pass through.
fn style_or(entry: &Value, default: &str) -> String {
    match entry.get("style") {
        Some(Value::String(s)) if s == "solid" => "draw=black".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(style)) => {
            let mut parts = Vec::new();
            if let Some(fill) = style.get("fill").and_then(Value::as_str) {
                let color = if fill == "#f0f0f0" { "blue!20" } else { fill };
                parts.push(format!("fill={color}"));
            }
            if let Some(stroke) = style.get("stroke").and_then(Value::as_str) {
                let color = if stroke == "#000" { "black" } else { stroke };
                parts.push(format!("draw={color}"));
            }
            if let Some(thickness) = style.get("thickness").and_then(Value::as_f64) {
                parts.push(format!("line width={thickness}pt"));
            }
            if parts.is_empty() {
                "draw=black".to_string()
            } else {
                parts.join(",")
            }
        }
        _ => default.to_string(),
    }
}

fn str_alias<'v>(entry: &'v Value, keys: &[&str]) -> Option<&'v str> {
    keys.iter().find_map(|key| entry.get(key).and_then(Value::as_str))
}

fn angle_alias(entry: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| entry.get(key).and_then(Value::as_f64))
        .and_then(finite)
}

/// `[x, y]` or `{x, y}`, both coordinates finite.
fn parse_point(value: &Value) -> Option<Point> {
    let (x, y) = if let Some(pair) = value.as_array() {
        (pair.first()?.as_f64()?, pair.get(1)?.as_f64()?)
    } else {
        (
            value.get("x")?.as_f64()?,
            value.get("y")?.as_f64()?,
        )
    };
    Some([finite(x)?, finite(y)?])
}

fn parse_points(value: &Value) -> Option<Vec<Point>> {
    value.as_array()?.iter().map(parse_point).collect()
}

fn parse_pair(value: &Value) -> Option<[f64; 2]> {
    let pair = value.as_array()?;
    Some([finite(pair.first()?.as_f64()?)?, finite(pair.get(1)?.as_f64()?)?])
}

fn pair_or(value: Option<&Value>, default: [f64; 2]) -> Result<[f64; 2], RenderingError> {
    match value {
        None => Ok(default),
        Some(v) => parse_pair(v)
            .ok_or_else(|| RenderingError("axis range must be a pair of finite numbers".into())),
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
