//! Line segments and segment-triangle intersection.

use crate::{Aabb3, Point3, Vec3};

/// A line segment between two points, parameterized on `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    /// Start point (`t = 0`).
    pub start: Point3,
    /// End point (`t = 1`).
    pub end: Point3,
}

impl Segment {
    /// Create a segment from `start` to `end`.
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Vector from start to end.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.end - self.start
    }

    /// Length of the segment.
    #[inline]
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Evaluate the segment at parameter `t`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.start + t * self.direction()
    }

    /// Slab test against a box; returns the parameter range inside the box.
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        let d = self.direction();
        let mut t_min = 0.0f64;
        let mut t_max = 1.0f64;
        for axis in 0..3 {
            let origin = self.start[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);
            if d[axis].abs() < 1e-15 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_max < t_min {
                return None;
            }
        }
        Some((t_min, t_max))
    }

    /// Möller-Trumbore intersection with triangle `(v0, v1, v2)`.
    ///
    /// Returns the segment parameter `t` in `[0, 1]` of the crossing, or
    /// `None` when the segment misses or is parallel to the triangle.
    pub fn intersect_triangle(&self, v0: &Point3, v1: &Point3, v2: &Point3) -> Option<f64> {
        let dir = self.direction();
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let h = dir.cross(&edge2);
        let a = edge1.dot(&h);

        // Scale-aware parallel test
        let scale = edge1.norm() * edge2.norm() * dir.norm();
        if a.abs() <= 1e-12 * scale.max(1e-300) {
            return None;
        }

        let f = 1.0 / a;
        let s = self.start - v0;
        let u = f * s.dot(&h);
        if !(-1e-12..=1.0 + 1e-12).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * dir.dot(&q);
        if v < -1e-12 || u + v > 1.0 + 1e-12 {
            return None;
        }

        let t = f * edge2.dot(&q);
        if (0.0..=1.0).contains(&t) {
            Some(t)
        } else {
            None
        }
    }
}
