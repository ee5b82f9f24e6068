#![warn(missing_docs)]

//! Math types for the TexGen mesh core.
//!
//! Thin wrappers around nalgebra providing the point, vector and
//! tolerance types shared by the mesh, textile, interference and export
//! crates, plus an axis-aligned bounding box and a line segment used for
//! mesh intersection queries.

use nalgebra::{Unit, Vector2, Vector3};

pub mod aabb;
pub mod segment;

pub use aabb::Aabb3;
pub use segment::Segment;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in a 2D cross-section frame.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in model units.
    pub linear: f64,
}

impl Tolerance {
    /// Default tolerance used for node coincidence (1e-6).
    pub const DEFAULT: Self = Self { linear: 1e-6 };

    /// Tolerance used when matching cross-section outlines (1e-7).
    pub const SECTION: Self = Self { linear: 1e-7 };

    /// Create a tolerance with the given linear distance.
    pub fn new(linear: f64) -> Self {
        Self { linear }
    }

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Centroid of a set of points, or `None` for an empty slice.
pub fn centroid(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Newell normal of a closed polygon (not normalized).
///
/// The magnitude is twice the polygon's area; the direction follows the
/// right-hand rule on the point ordering.
pub fn newell_normal(points: &[Point3]) -> Vec3 {
    let n = points.len();
    let mut normal = Vec3::zeros();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}
