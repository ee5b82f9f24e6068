//! Yarn cross sections and 2D polygon queries.
//!
//! Sections live in the slave node's local frame: `x` along the side
//! vector, `y` along the up vector. Outlines are counter-clockwise in that
//! frame.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use texgen_math::Point2;

use crate::error::{Result, TextileError};

/// Cross-section shape of a yarn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Section {
    /// Ellipse with the given full width and height.
    Ellipse {
        /// Extent along the side vector.
        width: f64,
        /// Extent along the up vector.
        height: f64,
    },
    /// Axis-aligned rectangle centred on the centreline.
    Rectangle {
        /// Extent along the side vector.
        width: f64,
        /// Extent along the up vector.
        height: f64,
    },
    /// Explicit outline; the point count overrides the yarn resolution.
    Polygon {
        /// Outline points, counter-clockwise.
        points: Vec<[f64; 2]>,
    },
}

impl Section {
    /// Check that the section can produce a non-degenerate outline.
    pub fn validate(&self) -> Result<()> {
        match self {
            Section::Ellipse { width, height } | Section::Rectangle { width, height } => {
                if !(*width > 0.0 && *height > 0.0) {
                    return Err(TextileError::InvalidSection(format!(
                        "width and height must be positive, got {width} x {height}"
                    )));
                }
            }
            Section::Polygon { points } => {
                if points.len() < 3 {
                    return Err(TextileError::InvalidSection(format!(
                        "polygon needs at least 3 points, got {}",
                        points.len()
                    )));
                }
                let outline: Vec<Point2> = points.iter().map(|p| Point2::new(p[0], p[1])).collect();
                if polygon_area(&outline) <= 0.0 {
                    return Err(TextileError::InvalidSection(
                        "polygon must be counter-clockwise with positive area".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Outline with `n` points (ignored for explicit polygons).
    pub fn outline(&self, n: usize) -> Vec<Point2> {
        match self {
            Section::Ellipse { width, height } => (0..n)
                .map(|i| {
                    let a = 2.0 * PI * i as f64 / n as f64;
                    Point2::new(0.5 * width * a.cos(), 0.5 * height * a.sin())
                })
                .collect(),
            Section::Rectangle { width, height } => rectangle_outline(*width, *height, n),
            Section::Polygon { points } => points.iter().map(|p| Point2::new(p[0], p[1])).collect(),
        }
    }
}

/// Perimeter samples at equal arc length, starting at the middle of the
/// right edge.
fn rectangle_outline(width: f64, height: f64, n: usize) -> Vec<Point2> {
    let (hw, hh) = (0.5 * width, 0.5 * height);
    let corners = [
        Point2::new(hw, -hh),
        Point2::new(hw, hh),
        Point2::new(-hw, hh),
        Point2::new(-hw, -hh),
    ];
    let perimeter = 2.0 * (width + height);
    (0..n)
        .map(|i| {
            // Arc length measured from the bottom-right corner
            let mut s = (0.5 * height + perimeter * i as f64 / n as f64) % perimeter;
            for k in 0..4 {
                let a = corners[k];
                let b = corners[(k + 1) % 4];
                let len = (b - a).norm();
                if s <= len {
                    return a + (b - a) * (s / len);
                }
                s -= len;
            }
            corners[0]
        })
        .collect()
}

/// Signed shoelace area; positive for counter-clockwise outlines.
pub fn polygon_area(points: &[Point2]) -> f64 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    0.5 * sum
}

/// Even-odd containment test.
pub fn point_in_polygon(p: &Point2, points: &[Point2]) -> bool {
    let n = points.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = points[i];
        let b = points[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Shortest distance from `p` to the closed outline.
pub fn distance_to_outline(p: &Point2, points: &[Point2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            let ab = b - a;
            let len2 = ab.norm_squared();
            let t = if len2 > 0.0 {
                ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            (p - (a + ab * t)).norm()
        })
        .fold(f64::INFINITY, f64::min)
}

/// Point-wise blend of two outlines with equal point counts.
pub fn lerp_outline(a: &[Point2], b: &[Point2], u: f64) -> Vec<Point2> {
    a.iter()
        .zip(b)
        .map(|(p, q)| Point2::from(p.coords * (1.0 - u) + q.coords * u))
        .collect()
}
