//! Segment intersection against the surface elements of a mesh.

use texgen_math::Segment;

use crate::{ElementType, Mesh};

impl Mesh {
    /// Parameters in `[0, 1]` at which `segment` crosses a triangle or quad,
    /// sorted ascending.
    ///
    /// Quads are tested as two triangles; solid elements and polygon rings
    /// are ignored, so convert volume meshes with
    /// [`Mesh::convert_to_surface`] first.
    pub fn intersect_segment(&self, segment: &Segment) -> Vec<f64> {
        let mut hits = Vec::new();
        if segment.intersect_aabb(&self.element_aabb()).is_none() {
            return hits;
        }

        let mut test = |a: usize, b: usize, c: usize| {
            if let Some(t) =
                segment.intersect_triangle(&self.node(a), &self.node(b), &self.node(c))
            {
                hits.push(t);
            }
        };

        for tri in self.elements(ElementType::Tri) {
            test(tri[0], tri[1], tri[2]);
        }
        for quad in self.elements(ElementType::Quad) {
            test(quad[0], quad[1], quad[2]);
            test(quad[0], quad[2], quad[3]);
        }

        hits.sort_by(|a, b| a.total_cmp(b));
        hits.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
        hits
    }

    /// Smallest intersection parameter of `segment` with the surface, if any.
    pub fn first_intersection(&self, segment: &Segment) -> Option<f64> {
        self.intersect_segment(segment).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::unit_hex;
    use texgen_math::{Point3, Segment};

    #[test]
    fn test_segment_through_cube_surface() {
        let mut mesh = unit_hex();
        mesh.convert_to_surface();
        mesh.convert_to_triangles();

        let seg = Segment::new(Point3::new(0.3, 0.4, -1.0), Point3::new(0.3, 0.4, 3.0));
        let hits = mesh.intersect_segment(&seg);
        assert_eq!(hits.len(), 2);
        assert!((hits[0] - 0.25).abs() < 1e-12);
        assert!((hits[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_segment_from_inside_hits_once() {
        let mut mesh = unit_hex();
        mesh.convert_to_surface();
        let seg = Segment::new(Point3::new(0.5, 0.5, 0.8), Point3::new(0.5, 0.5, 1.8));
        let t = mesh.first_intersection(&seg).unwrap();
        assert!((t - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_segment_outside_misses() {
        let mut mesh = unit_hex();
        mesh.convert_to_surface();
        let seg = Segment::new(Point3::new(2.0, 2.0, 0.0), Point3::new(3.0, 2.0, 0.0));
        assert!(mesh.first_intersection(&seg).is_none());
    }
}
