//! Interference reports and the query interface used by mesh correction.

use texgen_math::{Point3, Vec3};

/// One surface point of a yarn found inside another yarn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterferenceReport {
    /// Yarn owning the surface point.
    pub yarn: usize,
    /// Signed depth; negative values lie inside the other yarn.
    pub depth: f64,
    /// Position of the surface point.
    pub point: Point3,
}

/// Source of interference data for a set of yarn meshes.
///
/// Implemented by [`crate::Textile`]; tests substitute synthetic sources.
pub trait InterferenceSource {
    /// Number of yarns.
    fn num_yarns(&self) -> usize;

    /// Periodic repeat vectors of a yarn.
    fn repeats(&self, yarn: usize) -> Vec<Vec3>;

    /// Every surface point lying inside a different yarn.
    fn detect_interference(&self) -> Vec<InterferenceReport>;
}
