//! Rectangular unit-cell domain.

use texgen_math::{Aabb3, Point3, Vec3};
use texgen_mesh::HalfSpace;

use crate::error::{Result, TextileError};

/// Box-shaped periodic domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    aabb: Aabb3,
}

impl Domain {
    /// Create a domain from two opposite corners.
    pub fn new(min: Point3, max: Point3) -> Result<Self> {
        if !(max.x > min.x && max.y > min.y && max.z > min.z) {
            return Err(TextileError::Config(format!(
                "domain max {max:?} must exceed min {min:?} on every axis"
            )));
        }
        Ok(Self {
            aabb: Aabb3::new(min, max),
        })
    }

    /// Bounding box of the domain.
    pub fn aabb(&self) -> &Aabb3 {
        &self.aabb
    }

    /// Edge lengths.
    pub fn size(&self) -> Vec3 {
        self.aabb.size()
    }

    /// In-plane repeat vectors (x and y edges).
    pub fn planar_repeats(&self) -> Vec<Vec3> {
        let s = self.size();
        vec![Vec3::new(s.x, 0.0, 0.0), Vec3::new(0.0, s.y, 0.0)]
    }

    /// Half-spaces bounded by the six faces, normals pointing inwards.
    pub fn half_spaces(&self) -> [HalfSpace; 6] {
        HalfSpace::bounding(&self.aabb)
    }

    /// Repeat vectors along all three axes.
    pub fn axis_repeats(&self) -> [Vec3; 3] {
        let s = self.size();
        [
            Vec3::new(s.x, 0.0, 0.0),
            Vec3::new(0.0, s.y, 0.0),
            Vec3::new(0.0, 0.0, s.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_repeats() {
        let d = Domain::new(Point3::new(0.0, 0.0, -0.5), Point3::new(2.0, 3.0, 0.5)).unwrap();
        let r = d.planar_repeats();
        assert_eq!(r, vec![Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0)]);
        assert_eq!(d.axis_repeats()[2], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_half_spaces_contain_domain() {
        let d = Domain::new(Point3::new(0.0, 0.0, -0.5), Point3::new(2.0, 3.0, 0.5)).unwrap();
        let inside = Point3::new(1.0, 1.0, 0.0);
        let above = Point3::new(1.0, 1.0, 0.7);
        assert!(d.half_spaces().iter().all(|h| h.signed_distance(&inside) > 0.0));
        assert_eq!(
            d.half_spaces().iter().filter(|h| h.signed_distance(&above) < 0.0).count(),
            1
        );
    }

    #[test]
    fn test_inverted_domain_rejected() {
        assert!(Domain::new(Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 1.0)).is_err());
    }
}
