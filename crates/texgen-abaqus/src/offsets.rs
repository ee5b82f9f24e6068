//! Mapping between per-yarn and global node/element numbering.
//!
//! Global elements are numbered type by type in [`ElementType::ALL`] order,
//! and within a type yarn by yarn. Global nodes are numbered yarn by yarn.
//! This matches the layout produced by merging the yarn meshes in order.

use std::ops::Range;

use texgen_mesh::{ElementType, Mesh};

const TYPES: usize = ElementType::ALL.len();

/// Per-yarn offsets into the global node and element numbering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOffsets {
    element_offsets: Vec<[usize; TYPES]>,
    element_counts: Vec<[usize; TYPES]>,
    node_offsets: Vec<usize>,
    node_counts: Vec<usize>,
}

impl IndexOffsets {
    /// Compute offsets for `meshes` in yarn order.
    ///
    /// Must be rebuilt whenever a mesh's node or element counts change.
    pub fn build(meshes: &[Mesh]) -> Self {
        let element_counts: Vec<[usize; TYPES]> = meshes
            .iter()
            .map(|m| ElementType::ALL.map(|k| m.num_elements(k)))
            .collect();

        let mut element_offsets = vec![[0; TYPES]; meshes.len()];
        let mut next = 0;
        for kind in ElementType::ALL {
            let t = kind.index();
            for (offsets, counts) in element_offsets.iter_mut().zip(&element_counts) {
                offsets[t] = next;
                next += counts[t];
            }
        }

        let node_counts: Vec<usize> = meshes.iter().map(Mesh::num_nodes).collect();
        let node_offsets = node_counts
            .iter()
            .scan(0, |next, &count| {
                let offset = *next;
                *next += count;
                Some(offset)
            })
            .collect();

        Self {
            element_offsets,
            element_counts,
            node_offsets,
            node_counts,
        }
    }

    /// Number of yarns covered.
    pub fn num_yarns(&self) -> usize {
        self.node_offsets.len()
    }

    /// Global 0-based index of local element `local` of type `kind` in `yarn`.
    pub fn global_element_index(&self, yarn: usize, kind: ElementType, local: usize) -> Option<usize> {
        let t = kind.index();
        let count = self.element_counts.get(yarn)?[t];
        (local < count).then(|| self.element_offsets[yarn][t] + local)
    }

    /// Global 0-based index of local node `local` in `yarn`.
    pub fn global_node_index(&self, yarn: usize, local: usize) -> Option<usize> {
        let count = *self.node_counts.get(yarn)?;
        (local < count).then(|| self.node_offsets[yarn] + local)
    }

    /// Global element range of one yarn and type.
    pub fn element_range(&self, yarn: usize, kind: ElementType) -> Range<usize> {
        let t = kind.index();
        match (self.element_offsets.get(yarn), self.element_counts.get(yarn)) {
            (Some(offsets), Some(counts)) => offsets[t]..offsets[t] + counts[t],
            _ => 0..0,
        }
    }

    /// Global node range of one yarn.
    pub fn node_range(&self, yarn: usize) -> Range<usize> {
        match (self.node_offsets.get(yarn), self.node_counts.get(yarn)) {
            (Some(&offset), Some(&count)) => offset..offset + count,
            _ => 0..0,
        }
    }

    /// Yarn, type and local index of a global element.
    pub fn locate_element(&self, global: usize) -> Option<(usize, ElementType, usize)> {
        for kind in ElementType::ALL {
            for yarn in 0..self.num_yarns() {
                let range = self.element_range(yarn, kind);
                if range.contains(&global) {
                    return Some((yarn, kind, global - range.start));
                }
            }
        }
        None
    }

    /// Total element count across all yarns and types.
    pub fn total_elements(&self) -> usize {
        self.element_counts.iter().flatten().sum()
    }

    /// Total node count across all yarns.
    pub fn total_nodes(&self) -> usize {
        self.node_counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use texgen_math::Point3;

    /// `count` unit hexes in a row along x.
    fn hex_row(count: usize) -> Mesh {
        let mut mesh = Mesh::new();
        for i in 0..=count {
            let x = i as f64;
            for &(y, z) in &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                mesh.add_node(Point3::new(x, y, z));
            }
        }
        for i in 0..count {
            let a = 4 * i;
            let b = a + 4;
            mesh.add_element(
                ElementType::Hex,
                &[a, a + 1, a + 2, a + 3, b, b + 1, b + 2, b + 3],
            )
            .unwrap();
        }
        mesh
    }

    #[test]
    fn test_hex_offsets_follow_yarn_order() {
        let offsets = IndexOffsets::build(&[hex_row(3), hex_row(5)]);
        assert_eq!(offsets.global_element_index(0, ElementType::Hex, 0), Some(0));
        assert_eq!(offsets.global_element_index(1, ElementType::Hex, 0), Some(3));
        assert_eq!(offsets.global_element_index(1, ElementType::Hex, 4), Some(7));
        assert_eq!(offsets.global_element_index(1, ElementType::Hex, 5), None);
        assert_eq!(offsets.global_element_index(2, ElementType::Hex, 0), None);
        assert_eq!(offsets.total_elements(), 8);
    }

    #[test]
    fn test_types_are_grouped_before_yarns() {
        let mut a = hex_row(2);
        a.add_element(ElementType::Wedge, &[0, 1, 2, 4, 5, 6]).unwrap();
        let mut b = hex_row(1);
        b.add_element(ElementType::Wedge, &[0, 1, 2, 4, 5, 6]).unwrap();
        b.add_element(ElementType::Wedge, &[0, 2, 3, 4, 6, 7]).unwrap();

        let offsets = IndexOffsets::build(&[a, b]);
        // Wedges of both yarns come first, then hexes
        assert_eq!(offsets.element_range(0, ElementType::Wedge), 0..1);
        assert_eq!(offsets.element_range(1, ElementType::Wedge), 1..3);
        assert_eq!(offsets.element_range(0, ElementType::Hex), 3..5);
        assert_eq!(offsets.element_range(1, ElementType::Hex), 5..6);
        assert_eq!(offsets.element_range(0, ElementType::Tri), 0..0);
    }

    #[test]
    fn test_locate_inverts_global_index() {
        let mut b = hex_row(5);
        b.add_element(ElementType::Wedge, &[0, 1, 2, 4, 5, 6]).unwrap();
        let offsets = IndexOffsets::build(&[hex_row(3), b]);
        for global in 0..offsets.total_elements() {
            let (yarn, kind, local) = offsets.locate_element(global).unwrap();
            assert_eq!(offsets.global_element_index(yarn, kind, local), Some(global));
        }
        assert_eq!(offsets.locate_element(offsets.total_elements()), None);
    }

    #[test]
    fn test_node_offsets() {
        let offsets = IndexOffsets::build(&[hex_row(3), hex_row(5)]);
        assert_eq!(offsets.node_range(0), 0..16);
        assert_eq!(offsets.node_range(1), 16..40);
        assert_eq!(offsets.global_node_index(1, 0), Some(16));
        assert_eq!(offsets.global_node_index(0, 16), None);
        assert_eq!(offsets.total_nodes(), 40);

        let mut merged = Mesh::new();
        let meshes = [hex_row(3), hex_row(5)];
        for mesh in &meshes {
            merged.merge(mesh);
        }
        let g = offsets.global_node_index(1, 7).unwrap();
        assert_eq!(merged.node(g), meshes[1].node(7));
    }
}
