//! Plane-geometry and curve helpers shared by the emitter.

use crate::ir::Point;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref QUAD_A: Regex = Regex::new(r"(-?\d*)x\^2").unwrap();
    static ref LINEAR_B: Regex = Regex::new(r"([+-]\d*)x").unwrap();
    static ref CONST_C: Regex = Regex::new(r"([+-]\d+)$").unwrap();
}

/// Coefficients `(a, b, c)` of `ax^2 + bx + c`, read off an expression
/// like `x^2-4x+3` or `-2x^2+1`.
pub fn quadratic_coefficients(expression: &str) -> Option<(f64, f64, f64)> {
    let expr = expression.replace(' ', "").replace('*', "");
    let a = match QUAD_A.captures(&expr) {
        Some(caps) => match &caps[1] {
            "" => 1.0,
            "-" => -1.0,
            digits => digits.parse().ok()?,
        },
        None => return None,
    };

    // The regex crate has no lookahead, so filter out the `x^2` match by
    // checking the character after each candidate `...x`.
    let b = LINEAR_B
        .captures_iter(&expr)
        .find(|caps| {
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            expr[end..].chars().next() != Some('^')
        })
        .map(|caps| match &caps[1] {
            "+" => 1.0,
            "-" => -1.0,
            digits => digits.parse().unwrap_or(0.0),
        })
        .unwrap_or(0.0);

    let c = CONST_C
        .captures(&expr)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0.0);

    Some((a, b, c))
}

/// Vertex `(h, k)` of `ax^2 + bx + c` by completing the square.
pub fn quadratic_vertex(a: f64, b: f64, c: f64) -> (f64, f64) {
    let h = -b / (2.0 * a);
    let k = c - b * b / (4.0 * a);
    (h, k)
}

/// Real roots in descending-discriminant order; a double root appears once.
pub fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }
    let x1 = (-b + discriminant.sqrt()) / (2.0 * a);
    if discriminant == 0.0 {
        return vec![x1];
    }
    let x2 = (-b - discriminant.sqrt()) / (2.0 * a);
    vec![x1, x2]
}

pub fn distance(p1: Point, p2: Point) -> f64 {
    let dx = p2[0] - p1[0];
    let dy = p2[1] - p1[1];
    (dx * dx + dy * dy).sqrt()
}

/// Least-squares line `(slope, intercept)` through `points`.
///
/// Degenerate inputs (fewer than two points, or all x equal) have no
/// unique line and yield `None`.
pub fn linear_regression(points: &[Point]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for p in points {
        sum_x += p[0];
        sum_y += p[1];
        sum_xy += p[0] * p[1];
        sum_xx += p[0] * p[0];
    }
    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Some((slope, intercept))
}

/// Label anchor pushing text away from the figure: a vertex on the
/// bounding box edge anchors toward the outside, interior points center.
pub fn anchor_for(point: Point, all: &[Point]) -> String {
    let xs: Vec<f64> = all.iter().map(|p| p[0]).collect();
    let ys: Vec<f64> = all.iter().map(|p| p[1]).collect();
    let x_min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let x_max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let y_min = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let y_max = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut anchor = String::new();
    if point[1] == y_min {
        anchor.push_str("south");
    } else if point[1] == y_max {
        anchor.push_str("north");
    }
    if point[0] == x_min {
        if !anchor.is_empty() {
            anchor.push(' ');
        }
        anchor.push_str("west");
    } else if point[0] == x_max {
        if !anchor.is_empty() {
            anchor.push(' ');
        }
        anchor.push_str("east");
    }

    if anchor.is_empty() {
        "center".to_string()
    } else {
        anchor
    }
}

/// Axis-aligned bounding box of `points` padded by one unit, as
/// `(xmin, xmax, ymin, ymax)`. Empty input falls back to a 10x10 window.
pub fn display_range(points: &[Point]) -> (f64, f64, f64, f64) {
    if points.is_empty() {
        return (-5.0, 5.0, -5.0, 5.0);
    }
    let x_min = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p[0]).fold(f64::NEG_INFINITY, f64::max);
    let y_min = points.iter().map(|p| p[1]).fold(f64::INFINITY, f64::min);
    let y_max = points.iter().map(|p| p[1]).fold(f64::NEG_INFINITY, f64::max);
    (x_min - 1.0, x_max + 1.0, y_min - 1.0, y_max + 1.0)
}

/// Four points forming an axis-aligned rectangle, to tolerance 1e-3.
pub fn is_axis_aligned_rectangle(points: &[Point]) -> bool {
    if points.len() != 4 {
        return false;
    }
    let close = |a: f64, b: f64| (a - b).abs() < 0.001;
    let [p1, p2, p3, p4] = [points[0], points[1], points[2], points[3]];
    (close(p1[0], p2[0]) && close(p3[0], p4[0]) && close(p1[1], p4[1]) && close(p2[1], p3[1]))
        || (close(p1[1], p2[1]) && close(p3[1], p4[1]) && close(p1[0], p4[0]) && close(p2[0], p3[0]))
}

/// Direction from `from` toward `to` in degrees, for angle wedges.
pub fn bearing_degrees(from: Point, to: Point) -> f64 {
    (to[1] - from[1]).atan2(to[0] - from[0]).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_coefficients() {
        assert_eq!(quadratic_coefficients("x^2-4x+3"), Some((1.0, -4.0, 3.0)));
        assert_eq!(quadratic_coefficients("-2x^2+1"), Some((-2.0, 0.0, 1.0)));
        assert_eq!(quadratic_coefficients("x^2"), Some((1.0, 0.0, 0.0)));
        assert_eq!(quadratic_coefficients("3*x^2+2*x-5"), Some((3.0, 2.0, -5.0)));
        assert_eq!(quadratic_coefficients("2x+1"), None);
    }

    #[test]
    fn test_vertex_by_completing_the_square() {
        let (h, k) = quadratic_vertex(1.0, -4.0, 3.0);
        assert_eq!((h, k), (2.0, -1.0));
    }

    #[test]
    fn test_roots() {
        assert_eq!(quadratic_roots(1.0, -4.0, 3.0), vec![3.0, 1.0]);
        // Double root appears once.
        assert_eq!(quadratic_roots(1.0, -2.0, 1.0), vec![1.0]);
        assert!(quadratic_roots(1.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_irrational_roots() {
        // x^2 - 6x + 4: roots 3 ± √5.
        let roots = quadratic_roots(1.0, -6.0, 4.0);
        assert_eq!(roots.len(), 2);
        assert!((roots[0] - (3.0 + 5.0_f64.sqrt())).abs() < 1e-12);
        assert!((roots[1] - (3.0 - 5.0_f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_linear_regression_exact_fit() {
        let points = [[0.0, 1.0], [1.0, 3.0], [2.0, 5.0]];
        let (slope, intercept) = linear_regression(&points).unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_regression_least_squares() {
        // Off-line point pulls the fit, closed form stays exact.
        let points = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 2.0]];
        let (slope, intercept) = linear_regression(&points).unwrap();
        assert!((slope - 0.7).abs() < 1e-12);
        assert!((intercept - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_linear_regression_degenerate() {
        assert_eq!(linear_regression(&[[1.0, 2.0]]), None);
        // Vertical data has no function-form fit.
        assert_eq!(linear_regression(&[[2.0, 0.0], [2.0, 5.0]]), None);
    }

    #[test]
    fn test_anchor_selection() {
        let triangle = [[0.0, 0.0], [4.0, 0.0], [2.0, 3.0]];
        assert_eq!(anchor_for([0.0, 0.0], &triangle), "south west");
        assert_eq!(anchor_for([4.0, 0.0], &triangle), "south east");
        assert_eq!(anchor_for([2.0, 3.0], &triangle), "north");
    }

    #[test]
    fn test_display_range_padding() {
        let (xmin, xmax, ymin, ymax) = display_range(&[[0.0, 0.0], [3.0, 2.0]]);
        assert_eq!((xmin, xmax, ymin, ymax), (-1.0, 4.0, -1.0, 3.0));
        assert_eq!(display_range(&[]), (-5.0, 5.0, -5.0, 5.0));
    }

    #[test]
    fn test_rectangle_detection() {
        let rect = [[0.0, 0.0], [4.0, 0.0], [4.0, 3.0], [0.0, 3.0]];
        assert!(is_axis_aligned_rectangle(&rect));
        let skewed = [[0.0, 0.0], [4.0, 1.0], [5.0, 4.0], [1.0, 3.0]];
        assert!(!is_axis_aligned_rectangle(&skewed));
    }

    #[test]
    fn test_bearing() {
        assert_eq!(bearing_degrees([0.0, 0.0], [1.0, 0.0]), 0.0);
        assert_eq!(bearing_degrees([0.0, 0.0], [0.0, 2.0]), 90.0);
    }
}
