//! Matching yarn cross sections against polygon rings of a mesh.

use texgen_math::{Point3, Vec3};
use texgen_mesh::Mesh;

/// A polygon ring equal to a section up to translation and start rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionMatch {
    /// Polygon ring index.
    pub ring: usize,
    /// Ring position of the section's first point.
    pub rotation: usize,
    /// Translation from the section to the ring.
    pub offset: Vec3,
}

/// Rotation `r` such that ring node `(j + r) % n` lies within `tol` of
/// `section[j] + offset` for every `j`.
pub fn compare_sections(
    mesh: &Mesh,
    ring: &[usize],
    section: &[Point3],
    offset: &Vec3,
    tol: f64,
) -> Option<usize> {
    let n = ring.len();
    if n == 0 || n != section.len() {
        return None;
    }
    let first = section[0] + offset;
    (0..n)
        .filter(|&r| (mesh.node(ring[r]) - first).norm() < tol)
        .find(|&r| {
            section
                .iter()
                .enumerate()
                .all(|(j, p)| (mesh.node(ring[(j + r) % n]) - (p + offset)).norm() < tol)
        })
}

/// Every ring of `mesh` matching `section` under one of `offsets`.
pub fn find_mesh_polygon_sections(
    mesh: &Mesh,
    section: &[Point3],
    offsets: &[Vec3],
    tol: f64,
) -> Vec<SectionMatch> {
    let mut matches = Vec::new();
    for (ring_index, ring) in mesh.polygons().iter().enumerate() {
        for offset in offsets {
            if let Some(rotation) = compare_sections(mesh, ring, section, offset, tol) {
                matches.push(SectionMatch {
                    ring: ring_index,
                    rotation,
                    offset: *offset,
                });
            }
        }
    }
    matches
}
