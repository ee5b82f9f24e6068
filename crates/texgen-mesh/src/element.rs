//! Element types and the two element storage conventions.
//!
//! Solid and surface elements have a fixed node count and live in a
//! [`FixedElementBlock`]. Cross-section polygons have a variable node
//! count and live in [`PolygonRings`], where each ring is closed by
//! repeating its first index.

use crate::error::{MeshError, Result};

/// Element kinds known to the mesh, in their fixed enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    /// 3-node triangle.
    Tri,
    /// 4-node quadrilateral.
    Quad,
    /// 6-node wedge (triangular prism).
    Wedge,
    /// 8-node hexahedron.
    Hex,
    /// Variable-length closed polygon (cross-section outline).
    Polygon,
}

const TRI_FACES: &[&[usize]] = &[&[0, 1, 2]];
const QUAD_FACES: &[&[usize]] = &[&[0, 1, 2, 3]];
// Local corner sets in ABAQUS face order (S1..S5).
const WEDGE_FACES: &[&[usize]] = &[
    &[0, 1, 2],
    &[3, 5, 4],
    &[0, 3, 4, 1],
    &[1, 4, 5, 2],
    &[2, 5, 3, 0],
];
// Local corner sets in ABAQUS face order (S1..S6).
const HEX_FACES: &[&[usize]] = &[
    &[0, 1, 2, 3],
    &[4, 7, 6, 5],
    &[0, 4, 5, 1],
    &[1, 5, 6, 2],
    &[2, 6, 7, 3],
    &[3, 7, 4, 0],
];

impl ElementType {
    /// Every element type in enumeration order.
    pub const ALL: [ElementType; 5] = [
        ElementType::Tri,
        ElementType::Quad,
        ElementType::Wedge,
        ElementType::Hex,
        ElementType::Polygon,
    ];

    /// Element types stored in fixed-size blocks.
    pub const FIXED: [ElementType; 4] = [
        ElementType::Tri,
        ElementType::Quad,
        ElementType::Wedge,
        ElementType::Hex,
    ];

    /// Position of this type in [`ElementType::ALL`].
    pub fn index(self) -> usize {
        match self {
            ElementType::Tri => 0,
            ElementType::Quad => 1,
            ElementType::Wedge => 2,
            ElementType::Hex => 3,
            ElementType::Polygon => 4,
        }
    }

    /// Number of nodes per element, `None` for polygons.
    pub fn node_count(self) -> Option<usize> {
        match self {
            ElementType::Tri => Some(3),
            ElementType::Quad => Some(4),
            ElementType::Wedge => Some(6),
            ElementType::Hex => Some(8),
            ElementType::Polygon => None,
        }
    }

    /// True for volumetric element types.
    pub fn is_solid(self) -> bool {
        matches!(self, ElementType::Wedge | ElementType::Hex)
    }

    /// Local corner indices of each face.
    ///
    /// For solids the faces are listed in ABAQUS face-number order; for
    /// surface elements the element itself is the single face.
    pub fn faces(self) -> &'static [&'static [usize]] {
        match self {
            ElementType::Tri => TRI_FACES,
            ElementType::Quad => QUAD_FACES,
            ElementType::Wedge => WEDGE_FACES,
            ElementType::Hex => HEX_FACES,
            ElementType::Polygon => &[],
        }
    }

    /// Short lowercase name used in logs and set names.
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Tri => "tri",
            ElementType::Quad => "quad",
            ElementType::Wedge => "wedge",
            ElementType::Hex => "hex",
            ElementType::Polygon => "polygon",
        }
    }
}

/// Flat index storage for one fixed-size element type.
///
/// Every element occupies exactly `kind.node_count()` consecutive indices.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedElementBlock {
    kind: ElementType,
    stride: usize,
    indices: Vec<usize>,
}

impl FixedElementBlock {
    /// Create an empty block; fails for [`ElementType::Polygon`].
    pub fn new(kind: ElementType) -> Result<Self> {
        let stride = kind.node_count().ok_or(MeshError::VariableLength(kind))?;
        Ok(Self {
            kind,
            stride,
            indices: Vec::new(),
        })
    }

    /// Element type stored in this block.
    pub fn kind(&self) -> ElementType {
        self.kind
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.indices.len() / self.stride
    }

    /// True if the block holds no elements.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append an element; returns its local index.
    pub fn push(&mut self, nodes: &[usize]) -> Result<usize> {
        if nodes.len() != self.stride {
            return Err(MeshError::InvalidNodeCount {
                kind: self.kind,
                expected: self.stride,
                got: nodes.len(),
            });
        }
        self.indices.extend_from_slice(nodes);
        Ok(self.len() - 1)
    }

    /// Node indices of element `i`.
    pub fn get(&self, i: usize) -> Option<&[usize]> {
        let start = i.checked_mul(self.stride)?;
        self.indices.get(start..start + self.stride)
    }

    /// Iterate over elements as index slices.
    pub fn iter(&self) -> std::slice::ChunksExact<'_, usize> {
        self.indices.chunks_exact(self.stride)
    }

    /// Flat index list.
    pub fn as_flat(&self) -> &[usize] {
        &self.indices
    }

    /// Replace every node index with `map(index)`.
    pub fn remap(&mut self, mut map: impl FnMut(usize) -> usize) {
        for i in &mut self.indices {
            *i = map(*i);
        }
    }

    /// Keep only elements for which `keep` returns true; returns the number removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&[usize]) -> bool) -> usize {
        let before = self.len();
        let mut kept = Vec::with_capacity(self.indices.len());
        for element in self.indices.chunks_exact(self.stride) {
            if keep(element) {
                kept.extend_from_slice(element);
            }
        }
        self.indices = kept;
        before - self.len()
    }

    /// Remove all elements.
    pub fn clear(&mut self) {
        self.indices.clear();
    }
}

/// Polygon rings stored as one flat sequence.
///
/// Each ring is written as its node indices followed by a repeat of the
/// first index, e.g. `[4, 5, 6, 4, 9, 10, 11, 12, 9]` holds two rings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonRings {
    indices: Vec<usize>,
    count: usize,
}

impl PolygonRings {
    /// Create an empty ring list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a flat closed-ring sequence, validating ring closure.
    pub fn from_flat(indices: Vec<usize>) -> Result<Self> {
        let mut count = 0;
        let mut start = 0;
        while start < indices.len() {
            let end = scan_ring_end(&indices, start).ok_or(MeshError::UnclosedRing(start))?;
            if end - start < 3 {
                return Err(MeshError::DegenerateRing(end - start));
            }
            count += 1;
            start = end + 1;
        }
        Ok(Self { indices, count })
    }

    /// Append a ring given without its closing repeat; returns its index.
    pub fn push_ring(&mut self, ring: &[usize]) -> Result<usize> {
        if ring.len() < 3 {
            return Err(MeshError::DegenerateRing(ring.len()));
        }
        if ring[1..].contains(&ring[0]) {
            // The first index may only appear as the closing repeat.
            return Err(MeshError::DegenerateRing(ring.len()));
        }
        self.indices.extend_from_slice(ring);
        self.indices.push(ring[0]);
        self.count += 1;
        Ok(self.count - 1)
    }

    /// Number of rings.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if there are no rings.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate over rings, each without its closing repeat.
    pub fn iter(&self) -> RingIter<'_> {
        RingIter {
            indices: &self.indices,
            pos: 0,
        }
    }

    /// Ring `i`, without its closing repeat.
    pub fn get(&self, i: usize) -> Option<&[usize]> {
        self.iter().nth(i)
    }

    /// Flat closed-ring sequence.
    pub fn as_flat(&self) -> &[usize] {
        &self.indices
    }

    /// Replace every node index with `map(index)`.
    pub fn remap(&mut self, mut map: impl FnMut(usize) -> usize) {
        for i in &mut self.indices {
            *i = map(*i);
        }
    }

    /// Keep only rings for which `keep` returns true; returns the number removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&[usize]) -> bool) -> usize {
        let before = self.count;
        let mut kept = PolygonRings::new();
        for ring in self.iter() {
            if keep(ring) {
                kept.indices.extend_from_slice(ring);
                kept.indices.push(ring[0]);
                kept.count += 1;
            }
        }
        *self = kept;
        before - self.count
    }

    /// Remove all rings.
    pub fn clear(&mut self) {
        self.indices.clear();
        self.count = 0;
    }
}

/// Position of the index that closes the ring starting at `start`.
fn scan_ring_end(indices: &[usize], start: usize) -> Option<usize> {
    let first = *indices.get(start)?;
    indices[start + 1..]
        .iter()
        .position(|&i| i == first)
        .map(|offset| start + 1 + offset)
}

/// Iterator over the rings of a [`PolygonRings`].
pub struct RingIter<'a> {
    indices: &'a [usize],
    pos: usize,
}

impl<'a> Iterator for RingIter<'a> {
    type Item = &'a [usize];

    fn next(&mut self) -> Option<Self::Item> {
        let end = scan_ring_end(self.indices, self.pos)?;
        let ring = &self.indices[self.pos..end];
        self.pos = end + 1;
        Some(ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_counts() {
        assert_eq!(ElementType::Wedge.node_count(), Some(6));
        assert_eq!(ElementType::Hex.node_count(), Some(8));
        assert_eq!(ElementType::Polygon.node_count(), None);
        for kind in ElementType::FIXED {
            let n = kind.node_count().unwrap();
            for face in kind.faces() {
                assert!(face.iter().all(|&i| i < n));
            }
        }
    }

    #[test]
    fn test_enumeration_order_matches_index() {
        for (i, kind) in ElementType::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_hex_faces_cover_each_corner_three_times() {
        let mut counts = [0; 8];
        for face in ElementType::Hex.faces() {
            for &i in face.iter() {
                counts[i] += 1;
            }
        }
        assert!(counts.iter().all(|&c| c == 3));
    }

    #[test]
    fn test_fixed_block_rejects_wrong_length() {
        let mut block = FixedElementBlock::new(ElementType::Wedge).unwrap();
        assert_eq!(block.push(&[0, 1, 2, 3, 4, 5]).unwrap(), 0);
        let err = block.push(&[0, 1, 2]).unwrap_err();
        assert_eq!(
            err,
            MeshError::InvalidNodeCount {
                kind: ElementType::Wedge,
                expected: 6,
                got: 3
            }
        );
        assert_eq!(block.len(), 1);
        assert!(FixedElementBlock::new(ElementType::Polygon).is_err());
    }

    #[test]
    fn test_fixed_block_retain() {
        let mut block = FixedElementBlock::new(ElementType::Tri).unwrap();
        block.push(&[0, 1, 2]).unwrap();
        block.push(&[2, 3, 4]).unwrap();
        block.push(&[4, 5, 6]).unwrap();
        let removed = block.retain(|e| !e.contains(&3));
        assert_eq!(removed, 1);
        assert_eq!(block.get(1), Some(&[4, 5, 6][..]));
        assert!(block.get(2).is_none());
    }

    #[test]
    fn test_ring_scan_closes_on_repeated_index() {
        let rings = PolygonRings::from_flat(vec![4, 5, 6, 4, 9, 10, 11, 12, 9]).unwrap();
        assert_eq!(rings.len(), 2);
        let collected: Vec<&[usize]> = rings.iter().collect();
        assert_eq!(collected[0], &[4, 5, 6]);
        assert_eq!(collected[1], &[9, 10, 11, 12]);
    }

    #[test]
    fn test_unclosed_ring_rejected() {
        let err = PolygonRings::from_flat(vec![1, 2, 3, 1, 7, 8, 9]).unwrap_err();
        assert_eq!(err, MeshError::UnclosedRing(4));
    }

    #[test]
    fn test_push_ring_round_trips_flat_layout() {
        let mut rings = PolygonRings::new();
        rings.push_ring(&[0, 1, 2, 3]).unwrap();
        rings.push_ring(&[7, 8, 9]).unwrap();
        assert_eq!(rings.as_flat(), &[0, 1, 2, 3, 0, 7, 8, 9, 7]);
        assert_eq!(rings.get(1), Some(&[7, 8, 9][..]));
        assert!(rings.push_ring(&[1, 2]).is_err());
        assert!(rings.push_ring(&[1, 2, 1, 3]).is_err());
    }

    #[test]
    fn test_ring_retain() {
        let mut rings = PolygonRings::new();
        rings.push_ring(&[0, 1, 2]).unwrap();
        rings.push_ring(&[3, 4, 5]).unwrap();
        assert_eq!(rings.retain(|r| r[0] != 0), 1);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings.as_flat(), &[3, 4, 5, 3]);
    }
}
