//! Clipping solid meshes against half-spaces.

use std::collections::HashMap;

use texgen_math::{Aabb3, Point3, Vec3};
use tracing::debug;

use crate::{empty_block, ElementType, Mesh};

/// The half-space `normal · p >= offset`, with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfSpace {
    normal: Vec3,
    offset: f64,
}

impl HalfSpace {
    /// Half-space bounded by the plane through `point`, on the side `normal` points to.
    ///
    /// Returns `None` for a zero normal.
    pub fn new(normal: Vec3, point: &Point3) -> Option<Self> {
        let normal = normal.try_normalize(1e-12)?;
        Some(Self {
            normal,
            offset: normal.dot(&point.coords),
        })
    }

    /// The six half-spaces whose intersection is `aabb`.
    pub fn bounding(aabb: &Aabb3) -> [Self; 6] {
        let face = |axis: usize, sign: f64, bound: f64| {
            let mut normal = Vec3::zeros();
            normal[axis] = sign;
            Self {
                normal,
                offset: sign * bound,
            }
        };
        [
            face(0, 1.0, aabb.min.x),
            face(0, -1.0, aabb.max.x),
            face(1, 1.0, aabb.min.y),
            face(1, -1.0, aabb.max.y),
            face(2, 1.0, aabb.min.z),
            face(2, -1.0, aabb.max.z),
        ]
    }

    /// Inward unit normal.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Distance from the bounding plane, positive inside.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) - self.offset
    }

    /// Closest point on the bounding plane.
    pub fn project(&self, p: &Point3) -> Point3 {
        p - self.normal * self.signed_distance(p)
    }
}

/// Element counts affected by [`Mesh::clip`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipStats {
    /// Solids replaced by the pieces lying inside.
    pub cut: usize,
    /// Elements dropped because no volume of them lies inside.
    pub removed: usize,
    /// Polygon rings dropped because a node lies outside.
    pub rings_removed: usize,
}

/// State of one half-space pass, shared by every element it cuts.
struct Cutter<'a> {
    half_space: &'a HalfSpace,
    tol: f64,
    dist: Vec<f64>,
    cuts: HashMap<(usize, usize), usize>,
}

impl Cutter<'_> {
    fn outside(&self, i: usize) -> bool {
        self.dist[i] < -self.tol
    }

    fn strictly_inside(&self, i: usize) -> bool {
        self.dist[i] > self.tol
    }

    /// Node where the edge from `a` towards `b` leaves the half-space.
    fn cut(&mut self, nodes: &mut Vec<Point3>, a: usize, b: usize) -> usize {
        if self.dist[b] >= -self.tol {
            return b;
        }
        if self.dist[a] <= self.tol {
            return a;
        }
        let key = (a.min(b), a.max(b));
        if let Some(&n) = self.cuts.get(&key) {
            return n;
        }
        let t = self.dist[a] / (self.dist[a] - self.dist[b]);
        let p = nodes[a] + (nodes[b] - nodes[a]) * t;
        nodes.push(self.half_space.project(&p));
        self.dist.push(0.0);
        let n = nodes.len() - 1;
        self.cuts.insert(key, n);
        n
    }

    /// Clipped cross-section of a prism as `(bottom, top)` pairs in ring order.
    ///
    /// The first half of `element` is the bottom face and the second half
    /// the top face; node `i` and `i + k` share a lengthwise edge.
    fn clip_prism(&mut self, nodes: &mut Vec<Point3>, element: &[usize]) -> Vec<(usize, usize)> {
        let k = element.len() / 2;
        let columns: Vec<(usize, usize)> = (0..k).map(|i| (element[i], element[i + k])).collect();
        let dropped: Vec<bool> = columns
            .iter()
            .map(|&(b, t)| !self.strictly_inside(b) && !self.strictly_inside(t))
            .collect();

        let mut shortened = columns.clone();
        for (column, &drop) in shortened.iter_mut().zip(&dropped) {
            let (b, t) = *column;
            if drop {
                continue;
            }
            if self.outside(b) {
                column.0 = self.cut(nodes, t, b);
            } else if self.outside(t) {
                column.1 = self.cut(nodes, b, t);
            }
        }

        let mut ring = Vec::with_capacity(k + 1);
        for i in 0..k {
            let j = (i + 1) % k;
            if !dropped[i] {
                ring.push(shortened[i]);
            }
            if dropped[i] != dropped[j] {
                let (inner, outer) = if dropped[i] {
                    (shortened[j], columns[i])
                } else {
                    (shortened[i], columns[j])
                };
                let bottom = self.cut(nodes, inner.0, outer.0);
                let top = self.cut(nodes, inner.1, outer.1);
                ring.push((bottom, top));
            }
        }

        // Neighbouring columns sharing a node would give a collapsed edge
        ring.dedup_by(|a, b| a.0 == b.0 || a.1 == b.1);
        while ring.len() > 1 {
            let (first, last) = (ring[0], ring[ring.len() - 1]);
            if first.0 != last.0 && first.1 != last.1 {
                break;
            }
            ring.pop();
        }
        ring
    }
}

/// Hexes and wedges filling the prism over `ring`.
///
/// Section meshes wind wedges opposite to hexes, so a piece whose type
/// differs from `source` is reversed.
fn prism_pieces(source: ElementType, mut ring: Vec<(usize, usize)>) -> Vec<(ElementType, Vec<usize>)> {
    let mut pieces = Vec::new();
    while ring.len() >= 3 {
        let (kind, n) = if ring.len() >= 4 {
            (ElementType::Hex, 4)
        } else {
            (ElementType::Wedge, 3)
        };
        let mut corners = ring[..n].to_vec();
        if kind != source {
            corners[1..].reverse();
        }
        let nodes = corners
            .iter()
            .map(|c| c.0)
            .chain(corners.iter().map(|c| c.1))
            .collect();
        pieces.push((kind, nodes));
        if n == 3 {
            break;
        }
        ring.drain(1..3);
    }
    pieces
}

impl Mesh {
    /// Keep the parts of the mesh inside every half-space.
    ///
    /// Hexes and wedges are treated as prisms whose bottom and top faces
    /// are the two halves of their node list. A prism crossing a plane is
    /// replaced by hexes and wedges filling its inside part, with new
    /// nodes on the plane shared between neighbouring elements. Surface
    /// elements and polygon rings are kept only when wholly inside. Nodes
    /// within `tol` of a plane count as lying on it. Nodes left without
    /// elements are removed.
    pub fn clip(&mut self, half_spaces: &[HalfSpace], tol: f64) -> ClipStats {
        let mut stats = ClipStats::default();
        for half_space in half_spaces {
            self.clip_half_space(half_space, tol, &mut stats);
        }
        if stats != ClipStats::default() {
            let orphans = self.remove_unreferenced_nodes();
            debug!(
                cut = stats.cut,
                removed = stats.removed,
                rings_removed = stats.rings_removed,
                orphans,
                "clipped mesh"
            );
        }
        stats
    }

    fn clip_half_space(&mut self, half_space: &HalfSpace, tol: f64, stats: &mut ClipStats) {
        let dist: Vec<f64> = self.nodes.iter().map(|p| half_space.signed_distance(p)).collect();
        if dist.iter().all(|&d| d >= -tol) {
            return;
        }
        let inside = |e: &[usize]| e.iter().all(|&i| dist[i] >= -tol);
        for kind in [ElementType::Tri, ElementType::Quad] {
            stats.removed += self.blocks[kind.index()].retain(inside);
        }
        stats.rings_removed += self.polygons.retain(inside);

        let mut cutter = Cutter {
            half_space,
            tol,
            dist,
            cuts: HashMap::new(),
        };
        let mut solids = [empty_block(ElementType::Wedge), empty_block(ElementType::Hex)];
        let slot = |kind: ElementType| usize::from(kind == ElementType::Hex);
        for kind in [ElementType::Wedge, ElementType::Hex] {
            let old = std::mem::replace(&mut self.blocks[kind.index()], empty_block(kind));
            for element in old.iter() {
                if element.iter().all(|&i| !cutter.outside(i)) {
                    // Lengths were validated when the element was first added
                    let _ = solids[slot(kind)].push(element);
                    continue;
                }
                if !element.iter().any(|&i| cutter.strictly_inside(i)) {
                    stats.removed += 1;
                    continue;
                }
                let ring = cutter.clip_prism(&mut self.nodes, element);
                if ring.len() < 3 {
                    stats.removed += 1;
                    continue;
                }
                stats.cut += 1;
                for (piece, nodes) in prism_pieces(kind, ring) {
                    let _ = solids[slot(piece)].push(&nodes);
                }
            }
        }
        let [wedges, hexes] = solids;
        self.blocks[ElementType::Wedge.index()] = wedges;
        self.blocks[ElementType::Hex.index()] = hexes;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::tests::unit_hex;

    fn keep_below_x(x: f64) -> HalfSpace {
        HalfSpace::new(Vec3::new(-1.0, 0.0, 0.0), &Point3::new(x, 0.0, 0.0)).unwrap()
    }

    #[test]
    fn test_bounding_half_spaces() {
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, -0.5), Point3::new(1.0, 2.0, 0.5));
        let faces = HalfSpace::bounding(&aabb);
        let centre = Point3::new(0.5, 1.0, 0.0);
        assert!(faces.iter().all(|h| h.signed_distance(&centre) > 0.0));
        assert_relative_eq!(faces[3].signed_distance(&Point3::new(0.5, 2.5, 0.0)), -0.5);
        assert_relative_eq!(faces[1].project(&Point3::new(1.3, 0.2, 0.1)).x, 1.0);
        assert!(HalfSpace::new(Vec3::zeros(), &centre).is_none());
    }

    #[test]
    fn test_clip_along_length_keeps_hex() {
        let mut mesh = unit_hex();
        let stats = mesh.clip(&[keep_below_x(0.5)], 1e-9);
        assert_eq!(
            stats,
            ClipStats {
                cut: 1,
                removed: 0,
                rings_removed: 0
            }
        );
        assert_eq!(mesh.num_nodes(), 8);
        assert_eq!(mesh.num_elements(ElementType::Wedge), 0);
        assert_eq!(mesh.element(ElementType::Hex, 0).unwrap(), &[0, 4, 6, 1, 2, 5, 7, 3]);
        assert_relative_eq!(mesh.node(4), Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(mesh.node(7), Point3::new(0.5, 1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(mesh.aabb().max.x, 0.5);
    }

    #[test]
    fn test_clip_across_length_shortens_columns() {
        let mut mesh = unit_hex();
        let below = HalfSpace::new(Vec3::new(0.0, 0.0, -1.0), &Point3::new(0.0, 0.0, 0.25)).unwrap();
        mesh.clip(&[below], 1e-9);
        assert_eq!(mesh.num_nodes(), 8);
        assert_eq!(mesh.element(ElementType::Hex, 0).unwrap(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_relative_eq!(mesh.node(6), Point3::new(1.0, 1.0, 0.25), epsilon = 1e-12);
    }

    #[test]
    fn test_clip_corner_gives_wedge() {
        let mut mesh = unit_hex();
        let corner = HalfSpace::new(Vec3::new(-1.0, -1.0, 0.0), &Point3::new(0.25, 0.25, 0.0)).unwrap();
        mesh.clip(&[corner], 1e-9);
        assert_eq!(mesh.num_elements(ElementType::Hex), 0);
        // Reversed relative to the hex ring
        assert_eq!(mesh.element(ElementType::Wedge, 0).unwrap(), &[0, 4, 2, 1, 5, 3]);
        assert_relative_eq!(mesh.node(2), Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(mesh.node(4), Point3::new(0.0, 0.5, 0.0), epsilon = 1e-12);
        assert!(mesh.nodes().iter().all(|p| p.x + p.y <= 0.5 + 1e-12));
    }

    #[test]
    fn test_clip_wedge_to_hex() {
        let mut mesh = Mesh::new();
        for &(x, y, z) in &[
            (0.0, 0.0, 0.0),
            (0.0, 1.0, 0.0),
            (1.0, 0.0, 0.0),
            (0.0, 0.0, 1.0),
            (0.0, 1.0, 1.0),
            (1.0, 0.0, 1.0),
        ] {
            mesh.add_node(Point3::new(x, y, z));
        }
        mesh.add_element(ElementType::Wedge, &[0, 1, 2, 3, 4, 5])
            .unwrap();
        mesh.clip(&[keep_below_x(0.5)], 1e-9);
        assert_eq!(mesh.num_elements(ElementType::Wedge), 0);
        let hex = mesh.element(ElementType::Hex, 0).unwrap().to_vec();
        // The wedge ring 0, 1, cut(1-2), cut(0-2) is reversed for the hex
        assert_eq!(hex[0], 0);
        assert_eq!(hex[3], 1);
        assert_relative_eq!(mesh.node(hex[1]), Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(mesh.node(hex[2]), Point3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_clip_shares_cut_nodes() {
        let mut mesh = Mesh::new();
        for z in 0..2 {
            for y in 0..3 {
                for x in 0..2 {
                    mesh.add_node(Point3::new(x as f64, y as f64, z as f64));
                }
            }
        }
        mesh.add_element(ElementType::Hex, &[0, 1, 3, 2, 6, 7, 9, 8])
            .unwrap();
        mesh.add_element(ElementType::Hex, &[2, 3, 5, 4, 8, 9, 11, 10])
            .unwrap();
        let stats = mesh.clip(&[keep_below_x(0.5)], 1e-9);
        assert_eq!(stats.cut, 2);
        assert_eq!(mesh.num_nodes(), 12);
        assert_eq!(mesh.num_elements(ElementType::Hex), 2);
    }

    #[test]
    fn test_clip_drops_outside_elements_and_rings() {
        let mut mesh = unit_hex();
        mesh.add_element(ElementType::Polygon, &[0, 1, 2, 3]).unwrap();
        mesh.add_element(ElementType::Polygon, &[0, 3, 7, 4]).unwrap();

        let mut half = mesh.clone();
        let stats = half.clip(&[keep_below_x(0.5)], 1e-9);
        assert_eq!(stats.rings_removed, 1);
        assert_eq!(half.num_elements(ElementType::Polygon), 1);

        let stats = mesh.clip(&[keep_below_x(-1.0)], 1e-9);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.rings_removed, 2);
        assert_eq!(mesh.total_elements(), 0);
        assert_eq!(mesh.num_nodes(), 0);
    }

    #[test]
    fn test_clip_inside_is_untouched() {
        let mut mesh = unit_hex();
        let before = mesh.clone();
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(mesh.clip(&HalfSpace::bounding(&aabb), 1e-9), ClipStats::default());
        assert_eq!(mesh, before);
    }
}
