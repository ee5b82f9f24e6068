//! Boundary surface extraction and triangulation.

use std::collections::HashMap;

use texgen_math::{centroid, newell_normal, Vec3};

use crate::{ElementType, Mesh};

/// A face of a solid element that no other solid element shares.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFace {
    /// Type of the owning solid element.
    pub kind: ElementType,
    /// Local index of the owning element within its type.
    pub element: usize,
    /// Local face index in `kind.faces()`.
    pub face: usize,
    /// Mesh node indices of the face corners, in face-table order.
    pub nodes: Vec<usize>,
}

fn face_key(nodes: &[usize]) -> Vec<usize> {
    let mut key = nodes.to_vec();
    key.sort_unstable();
    key
}

impl Mesh {
    /// Faces of wedge/hex elements that belong to exactly one element.
    pub fn boundary_faces(&self) -> Vec<BoundaryFace> {
        let solids = [ElementType::Wedge, ElementType::Hex];

        let mut counts: HashMap<Vec<usize>, usize> = HashMap::new();
        for kind in solids {
            for element in self.elements(kind) {
                for face in kind.faces() {
                    let nodes: Vec<usize> = face.iter().map(|&l| element[l]).collect();
                    *counts.entry(face_key(&nodes)).or_insert(0) += 1;
                }
            }
        }

        let mut faces = Vec::new();
        for kind in solids {
            for (e, element) in self.elements(kind).enumerate() {
                for (f, face) in kind.faces().iter().enumerate() {
                    let nodes: Vec<usize> = face.iter().map(|&l| element[l]).collect();
                    if counts.get(&face_key(&nodes)) == Some(&1) {
                        faces.push(BoundaryFace {
                            kind,
                            element: e,
                            face: f,
                            nodes,
                        });
                    }
                }
            }
        }
        faces
    }

    /// Normal of a boundary face, oriented away from its owning element.
    ///
    /// The magnitude is twice the face area.
    pub fn outward_normal(&self, face: &BoundaryFace) -> Vec3 {
        let points = self.element_points(&face.nodes);
        let mut normal = newell_normal(&points);
        let owner = self
            .element(face.kind, face.element)
            .map(|e| self.element_points(e));
        if let (Some(owner), Some(face_centre)) = (owner, centroid(&points)) {
            if let Some(element_centre) = centroid(&owner) {
                if normal.dot(&(face_centre - element_centre)) < 0.0 {
                    normal = -normal;
                }
            }
        }
        normal
    }

    /// Replace wedge/hex elements by their boundary faces as triangles/quads.
    ///
    /// Existing surface elements and polygon rings are kept.
    pub fn convert_to_surface(&mut self) {
        let faces = self.boundary_faces();
        self.remove_element_type(ElementType::Wedge);
        self.remove_element_type(ElementType::Hex);
        for face in faces {
            let kind = if face.nodes.len() == 3 {
                ElementType::Tri
            } else {
                ElementType::Quad
            };
            // Face corners come from valid elements
            let _ = self.add_element(kind, &face.nodes);
        }
    }

    /// Split quads and polygon rings into triangles.
    pub fn convert_to_triangles(&mut self) {
        let mut tris: Vec<[usize; 3]> = Vec::new();
        for quad in self.elements(ElementType::Quad) {
            tris.push([quad[0], quad[1], quad[2]]);
            tris.push([quad[0], quad[2], quad[3]]);
        }
        for ring in self.polygons().iter() {
            for i in 1..ring.len() - 1 {
                tris.push([ring[0], ring[i], ring[i + 1]]);
            }
        }
        self.remove_element_type(ElementType::Quad);
        self.remove_element_type(ElementType::Polygon);
        for tri in tris {
            let _ = self.add_element(ElementType::Tri, &tri);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::unit_hex;
    use texgen_math::Point3;

    /// Two hexes stacked in z sharing the face at z = 1.
    fn stacked_hexes() -> Mesh {
        let mut mesh = unit_hex();
        for &(x, y) in &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            mesh.add_node(Point3::new(x, y, 2.0));
        }
        mesh.add_element(ElementType::Hex, &[4, 5, 6, 7, 8, 9, 10, 11])
            .unwrap();
        mesh
    }

    #[test]
    fn test_single_hex_has_six_boundary_faces() {
        let mesh = unit_hex();
        let faces = mesh.boundary_faces();
        assert_eq!(faces.len(), 6);
        for (f, face) in faces.iter().enumerate() {
            assert_eq!(face.face, f);
            assert_eq!(face.element, 0);
        }
    }

    #[test]
    fn test_shared_face_is_internal() {
        let mesh = stacked_hexes();
        let faces = mesh.boundary_faces();
        assert_eq!(faces.len(), 10);
        // Top of the first hex and bottom of the second are gone
        assert!(!faces.iter().any(|f| f.element == 0 && f.face == 1));
        assert!(!faces.iter().any(|f| f.element == 1 && f.face == 0));
    }

    #[test]
    fn test_outward_normals() {
        let mesh = unit_hex();
        for face in mesh.boundary_faces() {
            let n = mesh.outward_normal(&face);
            let pts = mesh.element_points(&face.nodes);
            let c = centroid(&pts).unwrap();
            assert!(n.dot(&(c - Point3::new(0.5, 0.5, 0.5))) > 0.0);
            assert!((n.norm() - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_convert_to_triangles() {
        let mut mesh = stacked_hexes();
        mesh.convert_to_surface();
        assert_eq!(mesh.num_elements(ElementType::Hex), 0);
        assert_eq!(mesh.num_elements(ElementType::Quad), 10);
        mesh.convert_to_triangles();
        assert_eq!(mesh.num_elements(ElementType::Quad), 0);
        assert_eq!(mesh.num_elements(ElementType::Tri), 20);
    }
}
