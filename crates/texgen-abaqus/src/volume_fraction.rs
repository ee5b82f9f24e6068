//! Fibre volume fraction recomputed from corrected section polygons.
//!
//! Used when a mesh has been adjusted but not regenerated: the yarn's own
//! sections no longer describe the mesh, so areas are measured directly
//! on the polygon rings.

use texgen_math::{newell_normal, Point3};
use texgen_mesh::{ElementType, Mesh};
use texgen_textile::FibreModel;
use tracing::debug;

/// One polygon section with its node range and fibre volume fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionFraction {
    /// Lowest node index of the ring.
    pub first_node: usize,
    /// Highest node index of the ring.
    pub last_node: usize,
    /// Planar area of the ring.
    pub area: f64,
    /// Fibre volume fraction at that area.
    pub volume_fraction: f64,
}

/// Area of a planar polygon from its projection onto the dominant plane.
pub fn projected_area(points: &[Point3]) -> f64 {
    let normal = newell_normal(points);
    let len = normal.norm();
    if points.len() < 3 || len <= 0.0 {
        return 0.0;
    }
    let axis = normal.iamax();
    let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let a = &points[i];
            let b = &points[(i + 1) % n];
            a[u] * b[v] - b[u] * a[v]
        })
        .sum();
    0.5 * twice.abs() / (normal[axis].abs() / len)
}

/// Node range, area and volume fraction of every polygon ring of `mesh`.
pub fn section_fractions(mesh: &Mesh, fibres: &FibreModel) -> Vec<SectionFraction> {
    mesh.polygons()
        .iter()
        .filter_map(|ring| {
            let first_node = *ring.iter().min()?;
            let last_node = *ring.iter().max()?;
            let area = projected_area(&mesh.element_points(ring));
            Some(SectionFraction {
                first_node,
                last_node,
                area,
                volume_fraction: fibres.volume_fraction(area),
            })
        })
        .collect()
}

/// Average of consecutive section values, one per gap between sections.
pub fn mid_section_fractions(sections: &[SectionFraction]) -> Vec<f64> {
    sections
        .windows(2)
        .map(|w| 0.5 * (w[0].volume_fraction + w[1].volume_fraction))
        .collect()
}

/// Volume fraction of each solid element from the sections around it.
///
/// Each section owns the nodes from its first ring node up to the next
/// section's first node, as laid out by the yarn mesher. An element whose
/// nodes span sections `k` and `k + 1` receives mid-section value `k`.
/// Values are returned for every non-polygon element in
/// [`ElementType::ALL`] order; elements outside any span get `None`.
pub fn element_volume_fractions(mesh: &Mesh, fibres: &FibreModel) -> Vec<Option<f64>> {
    let mut sections = section_fractions(mesh, fibres);
    sections.sort_by_key(|s| s.first_node);
    let mids = mid_section_fractions(&sections);

    let span = |nodes: &[usize]| -> Option<f64> {
        let lo = *nodes.iter().min()?;
        let hi = *nodes.iter().max()?;
        let k = sections.partition_point(|s| s.first_node <= lo).checked_sub(1)?;
        let next = sections.get(k + 1)?;
        if hi < next.first_node {
            return None;
        }
        if let Some(after) = sections.get(k + 2) {
            if hi >= after.first_node {
                return None;
            }
        }
        mids.get(k).copied()
    };

    let values: Vec<Option<f64>> = ElementType::FIXED
        .iter()
        .flat_map(|&kind| mesh.elements(kind).map(&span).collect::<Vec<_>>())
        .collect();
    debug!(
        sections = sections.len(),
        assigned = values.iter().filter(|v| v.is_some()).count(),
        "recomputed element volume fractions"
    );
    values
}
