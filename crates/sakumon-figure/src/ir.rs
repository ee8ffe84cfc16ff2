//! Strict figure intermediate representation.
//!
//! Everything here is fully resolved: no optional aliases, no default
//! holes, all coordinates finite. The normalizer is the only producer.

use serde::{Deserialize, Serialize};

pub type Point = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Visualization {
    FunctionGraph(FunctionGraph),
    Geometric(Geometric),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionGraph {
    pub functions: Vec<FunctionPlot>,
    pub axes: Axes,
    #[serde(default)]
    pub highlight_points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_area: Option<FillArea>,
}

/// One curve: a pgfplots expression with plotting domain and styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionPlot {
    pub expression: String,
    pub domain: [f64; 2],
    pub style: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub xrange: [f64; 2],
    pub yrange: [f64; 2],
}

impl Default for Axes {
    fn default() -> Self {
        Self { xrange: [-10.0, 10.0], yrange: [-10.0, 10.0] }
    }
}

/// Region to shade between two named curves over an x-interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillArea {
    pub between: [String; 2],
    pub domain: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometric {
    pub elements: Vec<Element>,
    #[serde(default)]
    pub labels: Vec<FigureLabel>,
    #[serde(default)]
    pub dimensions: Vec<DimensionLine>,
    /// Draw a unit grid with coordinate axes behind the figure.
    #[serde(default)]
    pub grid: bool,
}

/// A drawable element. `style` is always a resolved TikZ option string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Point {
        at: Point,
        style: String,
    },
    Line {
        points: Vec<Point>,
        style: String,
    },
    Polygon {
        points: Vec<Point>,
        style: String,
    },
    Circle {
        center: Point,
        radius: f64,
        style: String,
    },
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        style: String,
    },
    /// Angle wedge at `vertex`, swept between the rays toward two arms.
    Angle {
        vertex: Point,
        arm1: Point,
        arm2: Point,
        style: String,
    },
    Text {
        position: Point,
        text: String,
        style: String,
    },
}

impl Element {
    /// All coordinates this element occupies, for bounding-box purposes.
    pub fn points(&self) -> Vec<Point> {
        match self {
            Self::Point { at, .. } => vec![*at],
            Self::Line { points, .. } | Self::Polygon { points, .. } => points.clone(),
            Self::Circle { center, radius, .. } | Self::Arc { center, radius, .. } => {
                vec![
                    [center[0] - radius, center[1] - radius],
                    [center[0] + radius, center[1] + radius],
                ]
            }
            Self::Angle { vertex, .. } => vec![*vertex],
            Self::Text { position, .. } => vec![*position],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureLabel {
    pub position: Point,
    pub text: String,
    /// Explicit anchor; when absent the emitter picks one from the
    /// label's position on the figure's bounding box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

/// A `|<->|` measurement line offset perpendicular to the segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionLine {
    pub from: Point,
    pub to: Point,
    pub text: String,
    pub offset: f64,
}
