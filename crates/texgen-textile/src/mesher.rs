//! Concentric-ring meshing of a single cross section.
//!
//! The outline is shrunk towards its centroid in `layers` steps. Nodes are
//! numbered ring by ring from the outline inwards, followed by the centre
//! node. Quads join neighbouring rings and become hexes when two sections
//! are extruded; the innermost ring fans into triangles around the centre
//! and becomes wedges.

use texgen_math::Point2;

/// 2D mesh of one cross section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionMesh {
    /// Node positions: ring 0 (the outline), ring 1, ..., then the centre.
    pub points: Vec<Point2>,
    /// Quads between rings, counter-clockwise.
    pub quads: Vec<[usize; 4]>,
    /// Centre fan triangles, clockwise.
    pub triangles: Vec<[usize; 3]>,
    /// Number of points on each ring.
    pub ring_size: usize,
}

impl SectionMesh {
    /// Indices of the outline ring.
    pub fn outline(&self) -> std::ops::Range<usize> {
        0..self.ring_size
    }
}

/// Mesh `outline` with `layers` concentric rings (at least one).
pub fn mesh_section(outline: &[Point2], layers: usize) -> SectionMesh {
    let n = outline.len();
    let layers = layers.max(1);
    let centre = outline
        .iter()
        .fold(Point2::origin(), |acc, p| acc + p.coords / n as f64);

    let mut points = Vec::with_capacity(n * layers + 1);
    for r in 0..layers {
        let scale = (layers - r) as f64 / layers as f64;
        points.extend(outline.iter().map(|p| centre + (p - centre) * scale));
    }
    points.push(centre);
    let c = n * layers;

    let mut quads = Vec::with_capacity(n * (layers - 1));
    for r in 0..layers - 1 {
        let outer = r * n;
        let inner = outer + n;
        for i in 0..n {
            let j = (i + 1) % n;
            quads.push([outer + i, outer + j, inner + j, inner + i]);
        }
    }

    let last = (layers - 1) * n;
    let triangles = (0..n)
        .map(|i| [c, last + (i + 1) % n, last + i])
        .collect();

    SectionMesh {
        points,
        quads,
        triangles,
        ring_size: n,
    }
}
