//! Drawing-script emission from the figure IR.
//!
//! Function graphs become a pgfplots `axis` environment; geometric
//! figures become plain TikZ draw commands. Two curve layouts get
//! specialized treatment: a single quadratic (vertex, roots and
//! y-intercept highlighted automatically) and a pair of curves with
//! declared intersection points.

use crate::geometry;
use crate::ir::{
    DimensionLine, Element, FigureLabel, FillArea, FunctionGraph, FunctionPlot, Geometric,
    Point, Visualization,
};
use sakumon_core::RenderingError;
use tracing::warn;

/// Emit a complete figure fragment for a normalized visualization.
pub fn emit(vis: &Visualization) -> Result<String, RenderingError> {
    match vis {
        Visualization::FunctionGraph(graph) => emit_function_graph(graph),
        Visualization::Geometric(figure) => Ok(emit_geometric(figure)),
    }
}

struct GraphOptions {
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    title: Option<String>,
}

struct Highlight {
    at: Point,
    label: Option<String>,
    style: String,
}

fn emit_function_graph(graph: &FunctionGraph) -> Result<String, RenderingError> {
    // A lone quadratic gets the annotated rendering with vertex and
    // intercepts worked out from its coefficients.
    if graph.functions.len() == 1 {
        if let Some((a, b, c)) =
            geometry::quadratic_coefficients(&graph.functions[0].expression)
        {
            if a != 0.0 {
                return Ok(emit_quadratic(a, b, c));
            }
        }
    }

    if graph.functions.len() == 2
        && (!graph.highlight_points.is_empty() || graph.fill_area.is_some())
    {
        return emit_intersection(graph);
    }

    let highlights: Vec<Highlight> = graph
        .highlight_points
        .iter()
        .map(|&at| Highlight {
            at,
            label: None,
            style: "mark=*, mark size=2pt, color=red".to_string(),
        })
        .collect();

    let options = GraphOptions {
        xmin: graph.axes.xrange[0],
        xmax: graph.axes.xrange[1],
        ymin: graph.axes.yrange[0],
        ymax: graph.axes.yrange[1],
        title: None,
    };

    render_axis(&graph.functions, &highlights, graph.fill_area.as_ref(), &options)
}

fn emit_quadratic(a: f64, b: f64, c: f64) -> String {
    let (h, k) = geometry::quadratic_vertex(a, b, c);

    let mut highlights = vec![Highlight {
        at: [h, k],
        label: Some(format!("頂点 $({}, {})$", h, k)),
        style: "mark=*, mark size=3pt, color=red".to_string(),
    }];
    for root in geometry::quadratic_roots(a, b, c) {
        highlights.push(Highlight {
            at: [root, 0.0],
            label: Some(format!("$x = {:.2}$", root)),
            style: "mark=*, mark size=2pt, color=blue".to_string(),
        });
    }
    highlights.push(Highlight {
        at: [0.0, c],
        label: Some(format!("$y = {}$", c)),
        style: "mark=*, mark size=2pt, color=green".to_string(),
    });

    let mut expression = format!("{}*x^2", a);
    let mut pretty = format!("{}x^2", a);
    if b != 0.0 {
        let sign = if b > 0.0 { "+" } else { "" };
        expression.push_str(&format!("{sign}{b}*x"));
        pretty.push_str(&format!("{sign}{b}x"));
    }
    if c != 0.0 {
        let sign = if c > 0.0 { "+" } else { "" };
        expression.push_str(&format!("{sign}{c}"));
        pretty.push_str(&format!("{sign}{c}"));
    }

    let x_range = (h.abs() * 2.0 + 2.0).max(5.0);
    let (ymin, ymax) = if a > 0.0 {
        let ymin = (k - 1.0).min(-2.0);
        (ymin, (ymin + x_range * x_range * a.abs()).max(10.0))
    } else {
        let ymin = (k - x_range * x_range * a.abs() / 2.0).min(-2.0);
        (ymin, (k + 2.0).max(10.0))
    };

    let plot = FunctionPlot {
        expression,
        domain: [-x_range, x_range],
        style: "thick, blue".to_string(),
        label: format!("$f(x) = {}$", pretty),
    };
    let options = GraphOptions {
        xmin: -x_range,
        xmax: x_range,
        ymin,
        ymax,
        title: Some(format!("二次関数 $f(x) = {}$", pretty)),
    };

    // No fill areas on this path, so curve lookup cannot fail.
    render_axis(&[plot], &highlights, None, &options)
        .unwrap_or_else(|err| format!("% {}", err))
}

fn emit_intersection(graph: &FunctionGraph) -> Result<String, RenderingError> {
    let f = &graph.functions[0];
    let g = &graph.functions[1];

    let plots = [
        FunctionPlot {
            expression: f.expression.clone(),
            domain: f.domain,
            style: "thick, blue".to_string(),
            label: format!("$f(x) = {}$", f.expression),
        },
        FunctionPlot {
            expression: g.expression.clone(),
            domain: g.domain,
            style: "thick, red".to_string(),
            label: format!("$g(x) = {}$", g.expression),
        },
    ];

    // Declared intersection points are trusted as-is, never re-solved.
    let highlights: Vec<Highlight> = graph
        .highlight_points
        .iter()
        .enumerate()
        .map(|(idx, &at)| Highlight {
            at,
            label: Some(format!("交点{} $({:.2}, {:.2})$", idx + 1, at[0], at[1])),
            style: "mark=*, mark size=3pt, color=purple".to_string(),
        })
        .collect();

    let xs = graph.highlight_points.iter().map(|p| p[0]);
    let ys = graph.highlight_points.iter().map(|p| p[1]);
    let xmin = (xs.clone().fold(f64::INFINITY, f64::min) - 3.0).floor().min(-5.0);
    let xmax = (xs.fold(f64::NEG_INFINITY, f64::max) + 3.0).ceil().max(5.0);
    let ymin = (ys.clone().fold(f64::INFINITY, f64::min) - 3.0).floor().min(-5.0);
    let ymax = (ys.fold(f64::NEG_INFINITY, f64::max) + 3.0).ceil().max(5.0);

    let options = GraphOptions {
        xmin,
        xmax,
        ymin,
        ymax,
        title: Some(format!(
            "関数 $f(x) = {}$ と $g(x) = {}$ の交点",
            f.expression, g.expression
        )),
    };

    // The plot expressions are kept verbatim, so fill-area curve names
    // resolve the same way they do on the generic path.
    render_axis(&plots, &highlights, graph.fill_area.as_ref(), &options)
}

fn render_axis(
    functions: &[FunctionPlot],
    highlights: &[Highlight],
    fill_area: Option<&FillArea>,
    options: &GraphOptions,
) -> Result<String, RenderingError> {
    let mut out = String::new();
    out.push_str("\\begin{figure}[H]\n  \\centering\n  \\begin{tikzpicture}\n");
    out.push_str("    \\begin{axis}[\n");
    out.push_str("      axis lines=middle,\n");
    out.push_str("      xlabel=$x$,\n      ylabel=$y$,\n");
    if let Some(title) = &options.title {
        out.push_str(&format!("      title={{{}}},\n", title));
    }
    out.push_str(&format!(
        "      xmin={}, xmax={},\n      ymin={}, ymax={},\n",
        options.xmin, options.xmax, options.ymin, options.ymax
    ));
    out.push_str("      xtick={-5,...,5},\n      ytick={-5,...,5},\n");
    out.push_str("      grid=both,\n");
    out.push_str("      grid style={line width=.1pt, draw=gray!10},\n");
    out.push_str("      major grid style={line width=.2pt,draw=gray!50},\n");
    out.push_str("      minor tick num=5,\n");
    out.push_str("      enlargelimits={abs=0.5},\n");
    out.push_str("      axis line style={latex-latex},\n");
    out.push_str("      ticklabel style={font=\\tiny, fill=white},\n");
    out.push_str("      xlabel style={at={(ticklabel* cs:1)}, anchor=north west},\n");
    out.push_str("      ylabel style={at={(ticklabel* cs:1)}, anchor=south west}\n");
    out.push_str("    ]\n");

    if let Some(fill) = fill_area {
        let index_of = |name: &str| -> Result<usize, RenderingError> {
            functions
                .iter()
                .position(|f| f.expression == name)
                .map(|i| i + 1)
                .ok_or_else(|| {
                    RenderingError(format!("fill_area names unknown curve: {name}"))
                })
        };
        let first = index_of(&fill.between[0])?;
        let second = index_of(&fill.between[1])?;
        out.push_str(&format!(
            "    \\addplot[opacity=0.3, fill=blue!20] fill between[\n      of={} and {},\n      domain={}:{}\n    ];\n",
            first, second, fill.domain[0], fill.domain[1]
        ));
    }

    for plot in functions {
        out.push_str(&format!(
            "    \\addplot[{}, domain={}:{}] {{{}}};\n",
            plot.style, plot.domain[0], plot.domain[1], plot.expression
        ));
        if !plot.label.is_empty() {
            out.push_str(&format!("    \\addlegendentry{{{}}};\n", plot.label));
        }
    }

    for point in highlights {
        out.push_str(&format!(
            "    \\addplot[{}] coordinates {{({},{})}};\n",
            point.style, point.at[0], point.at[1]
        ));
        if let Some(label) = &point.label {
            out.push_str(&format!(
                "    \\node[anchor=south west] at (axis cs:{},{}) {{{}}};\n",
                point.at[0], point.at[1], label
            ));
        }
    }

    out.push_str("    \\end{axis}\n  \\end{tikzpicture}\n\\end{figure}");
    Ok(out)
}

fn emit_geometric(figure: &Geometric) -> String {
    let elements = canonicalize_rectangle(&figure.elements);
    let mut element_points: Vec<Point> = Vec::new();
    for element in &elements {
        element_points.extend(element.points());
    }

    let mut out = String::new();
    out.push_str("\\begin{figure}[H]\n  \\centering\n  \\begin{tikzpicture}[scale=1]\n");

    if figure.grid {
        let mut all = element_points.clone();
        all.extend(figure.labels.iter().map(|l| l.position));
        for dim in &figure.dimensions {
            all.push(dim.from);
            all.push(dim.to);
        }
        let (xmin, xmax, ymin, ymax) = geometry::display_range(&all);
        out.push_str(&format!(
            "    \\draw[gray!30, step=1] ({},{}) grid ({},{});\n",
            xmin, ymin, xmax, ymax
        ));
        out.push_str(&format!(
            "    \\draw[->] ({},0) -- ({},0) node[right] {{$x$}};\n",
            xmin, xmax
        ));
        out.push_str(&format!(
            "    \\draw[->] (0,{}) -- (0,{}) node[above] {{$y$}};\n",
            ymin, ymax
        ));
    }

    for element in &elements {
        emit_element(&mut out, element);
    }

    for label in &figure.labels {
        emit_label(&mut out, label, &element_points);
    }

    if !figure.dimensions.is_empty() {
        out.push_str("    % 寸法線\n");
        for dim in &figure.dimensions {
            emit_dimension(&mut out, dim);
        }
    }

    out.push_str("  \\end{tikzpicture}\n\\end{figure}");
    out
}

/// A lone axis-aligned four-point polygon is redrawn from its bounding
/// box so vertex order cannot skew the shape.
fn canonicalize_rectangle(elements: &[Element]) -> Vec<Element> {
    if elements.len() == 1 {
        if let Element::Polygon { points, style } = &elements[0] {
            if geometry::is_axis_aligned_rectangle(points) {
                let xs = points.iter().map(|p| p[0]);
                let ys = points.iter().map(|p| p[1]);
                let xmin = xs.clone().fold(f64::INFINITY, f64::min);
                let xmax = xs.fold(f64::NEG_INFINITY, f64::max);
                let ymin = ys.clone().fold(f64::INFINITY, f64::min);
                let ymax = ys.fold(f64::NEG_INFINITY, f64::max);
                return vec![Element::Polygon {
                    points: vec![
                        [xmin, ymin],
                        [xmax, ymin],
                        [xmax, ymax],
                        [xmin, ymax],
                    ],
                    style: style.clone(),
                }];
            }
        }
    }
    elements.to_vec()
}

fn emit_element(out: &mut String, element: &Element) {
    match element {
        Element::Point { at, style } => {
            out.push_str(&format!(
                "    \\filldraw[{}] ({},{}) circle (1.5pt);\n",
                style, at[0], at[1]
            ));
        }
        Element::Line { points, style } => {
            out.push_str(&format!("    \\draw[{}] {};\n", style, join_path(points)));
        }
        Element::Polygon { points, style } => {
            out.push_str(&format!(
                "    \\draw[{}] {} -- cycle;\n",
                style,
                join_path(points)
            ));
        }
        Element::Circle { center, radius, style } => {
            out.push_str(&format!(
                "    \\draw[{}] ({},{}) circle ({});\n",
                style, center[0], center[1], radius
            ));
        }
        Element::Arc { center, radius, start_angle, end_angle, style } => {
            out.push_str(&format!(
                "    \\draw[{}] ({},{}) ++({}:{}) arc ({}:{}:{});\n",
                style, center[0], center[1], start_angle, radius, start_angle, end_angle,
                radius
            ));
        }
        Element::Angle { vertex, arm1, arm2, style } => {
            let start = geometry::bearing_degrees(*vertex, *arm1);
            let end = geometry::bearing_degrees(*vertex, *arm2);
            out.push_str(&format!(
                "    \\draw[{}] ({},{}) ++({}:0.5) arc ({}:{}:0.5);\n",
                style, vertex[0], vertex[1], start, start, end
            ));
        }
        Element::Text { position, text, style } => {
            out.push_str(&format!(
                "    \\node[{}] at ({},{}) {{{}}};\n",
                style, position[0], position[1], text
            ));
        }
    }
}

fn emit_label(out: &mut String, label: &FigureLabel, element_points: &[Point]) {
    let anchor = label
        .anchor
        .clone()
        .unwrap_or_else(|| geometry::anchor_for(label.position, element_points));
    out.push_str(&format!(
        "    \\node[anchor={}] at ({},{}) {{{}}};\n",
        anchor, label.position[0], label.position[1], label.text
    ));
}

fn emit_dimension(out: &mut String, dim: &DimensionLine) {
    let dx = dim.to[0] - dim.from[0];
    let dy = dim.to[1] - dim.from[1];
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        warn!("zero-length dimension line, skipping");
        return;
    }
    let nx = -dy / length * dim.offset;
    let ny = dx / length * dim.offset;
    out.push_str(&format!(
        "    \\draw[|<->|] ({},{}) -- ({},{}) node[midway, fill=white, font=\\footnotesize] {{{}}};\n",
        dim.from[0] + nx,
        dim.from[1] + ny,
        dim.to[0] + nx,
        dim.to[1] + ny,
        dim.text
    ));
}

fn join_path(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("({},{})", p[0], p[1]))
        .collect::<Vec<_>>()
        .join(" -- ")
}
