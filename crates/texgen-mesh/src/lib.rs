#![warn(missing_docs)]

//! Mesh container for the TexGen mesh core.
//!
//! A [`Mesh`] stores node positions plus element index lists for each
//! [`ElementType`]. Yarn volume meshes hold wedge/hex solids and polygon
//! cross-section rings; reduced interference meshes hold triangles. The
//! mesh supports node lookup, merging, duplicate removal, clipping,
//! boundary surface extraction, triangulation and segment intersection.

pub mod clip;
pub mod element;
pub mod error;
pub mod grid;
pub mod intersect;
pub mod surface;

use std::collections::HashSet;

use texgen_math::{Aabb3, Point3, Vec3};
use tracing::debug;

pub use element::{ElementType, FixedElementBlock, PolygonRings, RingIter};
pub use clip::{ClipStats, HalfSpace};
pub use error::{MeshError, Result};
pub use grid::NodeGrid;
pub use surface::BoundaryFace;

/// Node positions plus per-type element storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    nodes: Vec<Point3>,
    blocks: [FixedElementBlock; 4],
    polygons: PolygonRings,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_block(kind: ElementType) -> FixedElementBlock {
    match FixedElementBlock::new(kind) {
        Ok(block) => block,
        Err(_) => unreachable!("fixed element types always have a node count"),
    }
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            blocks: ElementType::FIXED.map(empty_block),
            polygons: PolygonRings::new(),
        }
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// All node positions.
    pub fn nodes(&self) -> &[Point3] {
        &self.nodes
    }

    /// Position of node `i`.
    ///
    /// Panics if `i` is out of range.
    pub fn node(&self, i: usize) -> Point3 {
        self.nodes[i]
    }

    /// Overwrite the position of node `i`.
    ///
    /// Panics if `i` is out of range.
    pub fn set_node(&mut self, i: usize, p: Point3) {
        self.nodes[i] = p;
    }

    /// Move node `i` by `offset`.
    pub fn translate_node(&mut self, i: usize, offset: &Vec3) {
        self.nodes[i] += offset;
    }

    /// Append a node; returns its index.
    pub fn add_node(&mut self, p: Point3) -> usize {
        self.nodes.push(p);
        self.nodes.len() - 1
    }

    /// Closest node to `p` and its distance, or `None` for an empty mesh.
    pub fn closest_node(&self, p: &Point3) -> Option<(usize, f64)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i, (n - p).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, d2)| (i, d2.sqrt()))
    }

    /// Index of the closest node within `tol` of `p`.
    pub fn find_node(&self, p: &Point3, tol: f64) -> Option<usize> {
        self.closest_node(p)
            .filter(|&(_, d)| d <= tol)
            .map(|(i, _)| i)
    }

    // =========================================================================
    // Elements
    // =========================================================================

    /// Append an element of the given type; returns its local index.
    ///
    /// Polygon elements are given without the closing repeat.
    pub fn add_element(&mut self, kind: ElementType, nodes: &[usize]) -> Result<usize> {
        if let Some(&index) = nodes.iter().find(|&&i| i >= self.nodes.len()) {
            return Err(MeshError::NodeIndexOutOfRange {
                index,
                count: self.nodes.len(),
            });
        }
        match kind {
            ElementType::Polygon => self.polygons.push_ring(nodes),
            _ => self.blocks[kind.index()].push(nodes),
        }
    }

    /// Fixed-size storage for a solid or surface element type.
    ///
    /// Returns `None` for [`ElementType::Polygon`]; use [`Mesh::polygons`].
    pub fn block(&self, kind: ElementType) -> Option<&FixedElementBlock> {
        self.blocks.get(kind.index())
    }

    /// Polygon ring storage.
    pub fn polygons(&self) -> &PolygonRings {
        &self.polygons
    }

    /// Node indices of element `i` of `kind`.
    pub fn element(&self, kind: ElementType, i: usize) -> Option<&[usize]> {
        match kind {
            ElementType::Polygon => self.polygons.get(i),
            _ => self.blocks[kind.index()].get(i),
        }
    }

    /// Iterate over the elements of `kind` as index slices.
    pub fn elements(&self, kind: ElementType) -> Box<dyn Iterator<Item = &[usize]> + '_> {
        match kind {
            ElementType::Polygon => Box::new(self.polygons.iter()),
            _ => Box::new(self.blocks[kind.index()].iter()),
        }
    }

    /// Number of elements of `kind`.
    pub fn num_elements(&self, kind: ElementType) -> usize {
        match kind {
            ElementType::Polygon => self.polygons.len(),
            _ => self.blocks[kind.index()].len(),
        }
    }

    /// Number of elements of every type.
    pub fn total_elements(&self) -> usize {
        ElementType::ALL.iter().map(|&k| self.num_elements(k)).sum()
    }

    /// Local indices of the `kind` elements that reference `node`.
    pub fn elements_containing(&self, kind: ElementType, node: usize) -> Vec<usize> {
        self.elements(kind)
            .enumerate()
            .filter(|(_, e)| e.contains(&node))
            .map(|(i, _)| i)
            .collect()
    }

    /// Polygon rings containing `node`, as `(ring index, position in ring)`.
    pub fn rings_containing(&self, node: usize) -> Vec<(usize, usize)> {
        self.polygons
            .iter()
            .enumerate()
            .filter_map(|(r, ring)| ring.iter().position(|&i| i == node).map(|pos| (r, pos)))
            .collect()
    }

    /// Remove every element of `kind`.
    pub fn remove_element_type(&mut self, kind: ElementType) {
        match kind {
            ElementType::Polygon => self.polygons.clear(),
            _ => self.blocks[kind.index()].clear(),
        }
    }

    /// Positions of the nodes of an element.
    pub fn element_points(&self, nodes: &[usize]) -> Vec<Point3> {
        nodes.iter().map(|&i| self.nodes[i]).collect()
    }

    // =========================================================================
    // Whole-mesh operations
    // =========================================================================

    /// Append `other` to this mesh, offsetting its indices; returns the node offset.
    pub fn merge(&mut self, other: &Mesh) -> usize {
        let offset = self.nodes.len();
        self.nodes.extend_from_slice(&other.nodes);
        for kind in ElementType::FIXED {
            let src = &other.blocks[kind.index()];
            let dst = &mut self.blocks[kind.index()];
            for element in src.iter() {
                let shifted: Vec<usize> = element.iter().map(|&i| i + offset).collect();
                // Length already validated by the source block
                let _ = dst.push(&shifted);
            }
        }
        for ring in other.polygons.iter() {
            let shifted: Vec<usize> = ring.iter().map(|&i| i + offset).collect();
            let _ = self.polygons.push_ring(&shifted);
        }
        offset
    }

    /// Redirect references to coincident nodes onto the lowest index.
    ///
    /// The node array keeps its length, so indices stay compatible with
    /// any mesh this one was copied from; call
    /// [`Mesh::remove_unreferenced_nodes`] to compact. Polygon rings are
    /// rebuilt and dropped if fewer than three distinct nodes remain.
    /// Returns the number of nodes that were merged away.
    pub fn merge_nodes(&mut self, tol: f64) -> usize {
        let grid = NodeGrid::new(&self.nodes, tol);
        let mut target: Vec<usize> = (0..self.nodes.len()).collect();
        let mut merged = 0;
        for (i, p) in self.nodes.iter().enumerate() {
            if let Some(j) = grid.find(p).filter(|&j| j < i) {
                target[i] = target[j];
                merged += 1;
            }
        }

        if merged > 0 {
            for block in &mut self.blocks {
                block.remap(|i| target[i]);
            }
            let mut rings = PolygonRings::new();
            let mut collapsed = 0;
            for ring in self.polygons.iter() {
                let mut mapped: Vec<usize> = Vec::with_capacity(ring.len());
                for &i in ring {
                    if mapped.last() != Some(&target[i]) {
                        mapped.push(target[i]);
                    }
                }
                while mapped.len() > 1 && mapped.last() == mapped.first() {
                    mapped.pop();
                }
                if rings.push_ring(&mapped).is_err() {
                    collapsed += 1;
                }
            }
            self.polygons = rings;
            debug!(merged, collapsed, "merged coincident nodes");
        }
        merged
    }

    /// Remove fixed-size elements that reference a node more than once.
    pub fn remove_degenerate_elements(&mut self) -> usize {
        self.blocks
            .iter_mut()
            .map(|block| {
                block.retain(|e| e.iter().enumerate().all(|(k, i)| !e[..k].contains(i)))
            })
            .sum()
    }

    /// Remove elements that repeat another element's node set; returns the count.
    pub fn remove_duplicate_elements(&mut self) -> usize {
        let mut removed = 0;
        for block in &mut self.blocks {
            let mut seen = HashSet::new();
            removed += block.retain(|e| {
                let mut k = e.to_vec();
                k.sort_unstable();
                seen.insert(k)
            });
        }
        let mut seen = HashSet::new();
        removed += self.polygons.retain(|r| {
            let mut k = r.to_vec();
            k.sort_unstable();
            seen.insert(k)
        });
        removed
    }

    /// Flags marking nodes referenced by at least one element.
    pub fn referenced_nodes(&self) -> Vec<bool> {
        let mut used = vec![false; self.nodes.len()];
        for block in &self.blocks {
            for &i in block.as_flat() {
                used[i] = true;
            }
        }
        for &i in self.polygons.as_flat() {
            used[i] = true;
        }
        used
    }

    /// Delete nodes no element refers to and renumber; returns the count removed.
    pub fn remove_unreferenced_nodes(&mut self) -> usize {
        let used = self.referenced_nodes();
        let mut new_index = vec![usize::MAX; self.nodes.len()];
        let mut kept = Vec::with_capacity(self.nodes.len());
        for (i, p) in self.nodes.iter().enumerate() {
            if used[i] {
                new_index[i] = kept.len();
                kept.push(*p);
            }
        }
        let removed = self.nodes.len() - kept.len();
        if removed > 0 {
            self.nodes = kept;
            for block in &mut self.blocks {
                block.remap(|i| new_index[i]);
            }
            self.polygons.remap(|i| new_index[i]);
        }
        removed
    }

    /// Bounding box of all nodes.
    pub fn aabb(&self) -> Aabb3 {
        Aabb3::from_points(&self.nodes)
    }

    /// Bounding box of the nodes referenced by elements.
    pub fn element_aabb(&self) -> Aabb3 {
        let used = self.referenced_nodes();
        Aabb3::from_points(
            self.nodes
                .iter()
                .zip(used)
                .filter(|(_, u)| *u)
                .map(|(p, _)| p),
        )
    }
}
