//! A single interpenetrating surface node and its correction.

use texgen_math::{Point3, Vec3};
use texgen_mesh::{ElementType, Mesh};
use tracing::error;

use crate::error::{AdjustError, Result};

/// Polygon ring through a node with the node's neighbours on that ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingNeighbours {
    /// Polygon ring index.
    pub ring: usize,
    /// Node before the search node.
    pub prev: usize,
    /// Node after the search node.
    pub next: usize,
}

impl RingNeighbours {
    /// True if `node` is adjacent to the search node on the ring.
    pub fn is_adjacent(&self, node: usize) -> bool {
        node == self.prev || node == self.next
    }
}

/// A surface node of one yarn mesh that lies inside a different yarn.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionPoint {
    /// Owning yarn.
    pub yarn: usize,
    /// Node index in the yarn mesh.
    pub node_index: usize,
    /// Current node position.
    pub point: Point3,
    /// Position at detection time.
    pub start_point: Point3,
    /// Signed depth reported by detection; negative is inside.
    pub initial_depth: f64,
    /// Distance to the obstructing surface along the correction direction.
    pub remaining_distance: f64,
    /// Node the point is pulled towards.
    pub interp_index: Option<usize>,
    /// Position of the interpolation node.
    pub interp_point: Point3,
    /// Periodic partner moved by the same offset.
    pub boundary_pair: Option<usize>,
    /// Wedge and hex elements containing the node.
    pub elements: Vec<(ElementType, usize)>,
    /// Cross-section ring through the node.
    pub polygon: Option<RingNeighbours>,
    /// True when any containing element is a wedge.
    pub wedge: bool,
}

impl IntersectionPoint {
    /// Create a point for `node_index` at `point` with the detected depth.
    pub fn new(yarn: usize, node_index: usize, point: Point3, initial_depth: f64) -> Self {
        Self {
            yarn,
            node_index,
            point,
            start_point: point,
            initial_depth,
            remaining_distance: initial_depth.abs(),
            interp_index: None,
            interp_point: point,
            boundary_pair: None,
            elements: Vec::new(),
            polygon: None,
            wedge: false,
        }
    }

    /// Collect the solid elements and polygon ring containing the node.
    pub fn find_elements(&mut self, mesh: &Mesh) {
        let node = self.node_index;
        self.elements.clear();
        for kind in [ElementType::Wedge, ElementType::Hex] {
            self.elements
                .extend(mesh.elements_containing(kind, node).into_iter().map(|e| (kind, e)));
        }
        self.wedge = self.elements.iter().any(|(k, _)| *k == ElementType::Wedge);

        self.polygon = mesh.rings_containing(node).first().and_then(|&(ring, pos)| {
            let nodes = mesh.element(ElementType::Polygon, ring)?;
            let n = nodes.len();
            Some(RingNeighbours {
                ring,
                prev: nodes[(pos + n - 1) % n],
                next: nodes[(pos + 1) % n],
            })
        });
    }

    /// Choose the interpolation node from the containing elements.
    ///
    /// Returns `false`, logging the element count, when no node qualifies.
    /// The point is then left out of the correction.
    pub fn find_interpolation_node(&mut self, mesh: &Mesh) -> bool {
        let node = self.node_index;
        let lists: Vec<&[usize]> = self
            .elements
            .iter()
            .filter_map(|&(kind, e)| mesh.element(kind, e))
            .collect();

        let found = match lists.len() {
            3 | 4 => common_node(&lists, node),
            2 => same_half_node(lists[0], lists[1], node),
            1 if self.wedge => self.polygon.and_then(|ring| wedge_half_node(lists[0], node, &ring)),
            1 => self.polygon.and_then(|ring| half_step_node(lists[0], node, &ring)),
            _ => None,
        };

        match found {
            Some(i) => {
                self.interp_index = Some(i);
                self.interp_point = mesh.node(i);
                true
            }
            None => {
                error!(
                    yarn = self.yarn,
                    node,
                    elements = lists.len(),
                    "unable to find interpolation node"
                );
                false
            }
        }
    }

    /// Move the node towards its interpolation node by half of `depth`.
    ///
    /// Positions are re-read from `mesh` first. The boundary pair, if any,
    /// receives the same offset. Fails without moving anything when the
    /// available travel does not exceed the required distance.
    pub fn move_node(&mut self, mesh: &mut Mesh, depth: f64) -> Result<Vec3> {
        let interp = self.interp_index.ok_or(AdjustError::NoInterpolationNode {
            yarn: self.yarn,
            node: self.node_index,
        })?;
        self.point = mesh.node(self.node_index);
        self.interp_point = mesh.node(interp);

        let to_interp = self.interp_point - self.point;
        let distance = to_interp.norm();
        let required = depth.abs() * 0.5;
        let mut available = distance;
        if self.wedge {
            // Keep wedge corners from collapsing onto each other
            available -= 0.02 * (self.start_point - self.interp_point).norm();
        }
        if required >= available {
            error!(
                yarn = self.yarn,
                node = self.node_index,
                required,
                available,
                "interference too large to correct"
            );
            return Err(AdjustError::NodeTravelExceeded {
                yarn: self.yarn,
                node: self.node_index,
                required,
                available,
            });
        }

        let offset = to_interp * (required / distance);
        mesh.translate_node(self.node_index, &offset);
        if let Some(pair) = self.boundary_pair {
            mesh.translate_node(pair, &offset);
        }
        self.point += offset;
        Ok(offset)
    }
}

/// The one node besides `node` present in every element.
fn common_node(lists: &[&[usize]], node: usize) -> Option<usize> {
    let (first, rest) = lists.split_first()?;
    let mut shared = first
        .iter()
        .copied()
        .filter(|&i| i != node && rest.iter().all(|e| e.contains(&i)));
    let candidate = shared.next()?;
    shared.next().is_none().then_some(candidate)
}

/// The half (`node_count / 2` split) of `element` that contains `node`.
fn half_of(element: &[usize], node: usize) -> Option<&[usize]> {
    let pos = element.iter().position(|&i| i == node)?;
    let mid = element.len() / 2;
    Some(if pos < mid {
        &element[..mid]
    } else {
        &element[mid..]
    })
}

/// The other node shared by the halves of two elements containing `node`.
fn same_half_node(a: &[usize], b: &[usize], node: usize) -> Option<usize> {
    let ha = half_of(a, node)?;
    let hb = half_of(b, node)?;
    let mut shared = ha.iter().copied().filter(|&i| i != node && hb.contains(&i));
    let candidate = shared.next()?;
    shared.next().is_none().then_some(candidate)
}

/// Neighbour of `node` in its element half that leaves the polygon ring.
fn half_step_node(element: &[usize], node: usize, ring: &RingNeighbours) -> Option<usize> {
    let half = half_of(element, node)?;
    let n = half.len();
    let pos = half.iter().position(|&i| i == node)?;
    let prev = half[(pos + n - 1) % n];
    let next = half[(pos + 1) % n];
    match (ring.is_adjacent(prev), ring.is_adjacent(next)) {
        (true, false) => Some(next),
        (false, true) => Some(prev),
        _ => None,
    }
}

/// Node of the wedge half that is neither `node` nor on its ring.
fn wedge_half_node(element: &[usize], node: usize, ring: &RingNeighbours) -> Option<usize> {
    let half = half_of(element, node)?;
    let mut others = half
        .iter()
        .copied()
        .filter(|&i| i != node && !ring.is_adjacent(i));
    let candidate = others.next()?;
    others.next().is_none().then_some(candidate)
}
