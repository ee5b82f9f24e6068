//! Node pairs related by periodic repeat vectors.

use std::collections::HashSet;

use texgen_math::{Point3, Vec3};
use texgen_mesh::NodeGrid;

/// Flags marking nodes that have a partner at plus or minus any repeat.
pub fn boundary_nodes(points: &[Point3], repeats: &[Vec3], tol: f64) -> Vec<bool> {
    let grid = NodeGrid::new(points, tol);
    points
        .iter()
        .map(|p| {
            repeats
                .iter()
                .any(|r| grid.find(&(p + r)).is_some() || grid.find(&(p - r)).is_some())
        })
        .collect()
}

/// Two nodes whose displacements differ by a dummy node's displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicPair {
    /// Index of the repeat vector.
    pub axis: usize,
    /// Node eliminated by the constraint, at `independent + repeat`.
    pub dependent: usize,
    /// Node the constraint refers to.
    pub independent: usize,
}

/// Node pairs offset by exactly one repeat vector.
///
/// A node is eliminated at most once and never appears in another pair
/// after being eliminated, so the resulting constraints are independent.
pub fn periodic_pairs(points: &[Point3], repeats: &[Vec3], tol: f64) -> Vec<PeriodicPair> {
    let grid = NodeGrid::new(points, tol);
    let mut dependents = HashSet::new();
    let mut independents = HashSet::new();
    let mut pairs = Vec::new();
    for (axis, r) in repeats.iter().enumerate() {
        for (a, p) in points.iter().enumerate() {
            let Some(b) = grid.find(&(p + r)) else {
                continue;
            };
            if b == a
                || dependents.contains(&a)
                || dependents.contains(&b)
                || independents.contains(&b)
            {
                continue;
            }
            dependents.insert(b);
            independents.insert(a);
            pairs.push(PeriodicPair {
                axis,
                dependent: b,
                independent: a,
            });
        }
    }
    pairs
}
