//! Yarn centreline, slave nodes and volume meshing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use texgen_math::{Aabb3, Dir3, Point2, Point3, Tolerance, Vec3};
use texgen_mesh::{ElementType, Mesh};
use tracing::debug;

use crate::domain::Domain;
use crate::error::{Result, TextileError};
use crate::fibre::{FibreModel, Material};
use crate::mesher::mesh_section;
use crate::section::{distance_to_outline, lerp_outline, point_in_polygon, Section};

/// Sampling density of a yarn volume mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YarnResolution {
    /// Slave nodes per centreline segment.
    pub slaves_per_segment: usize,
    /// Outline points for generated sections.
    pub section_points: usize,
    /// Concentric element layers in each section.
    pub section_layers: usize,
}

impl Default for YarnResolution {
    fn default() -> Self {
        Self {
            slaves_per_segment: 4,
            section_points: 16,
            section_layers: 2,
        }
    }
}

impl YarnResolution {
    /// Reject resolutions that cannot produce solid elements.
    pub fn validate(&self) -> Result<()> {
        if self.slaves_per_segment == 0 {
            return Err(TextileError::InvalidResolution(
                "slaves_per_segment must be at least 1".into(),
            ));
        }
        if self.section_points < 3 {
            return Err(TextileError::InvalidResolution(format!(
                "section_points must be at least 3, got {}",
                self.section_points
            )));
        }
        if self.section_layers == 0 {
            return Err(TextileError::InvalidResolution(
                "section_layers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A sample along the yarn carrying a local frame and a cross section.
#[derive(Debug, Clone, PartialEq)]
pub struct SlaveNode {
    /// Index along the yarn.
    pub index: usize,
    /// Centreline position.
    pub position: Point3,
    /// Direction of travel.
    pub tangent: Dir3,
    /// Section `y` axis.
    pub up: Dir3,
    /// Section `x` axis, `up × tangent`.
    pub side: Dir3,
    /// Section outline in the local frame.
    pub section: Vec<Point2>,
}

impl SlaveNode {
    /// Map a section point to 3D.
    pub fn to_global(&self, q: &Point2) -> Point3 {
        self.position + self.side.as_ref() * q.x + self.up.as_ref() * q.y
    }

    /// Project a 3D point into the section frame.
    pub fn to_local(&self, p: &Point3) -> Point2 {
        let d = p - self.position;
        Point2::new(d.dot(self.side.as_ref()), d.dot(self.up.as_ref()))
    }

    /// Section outline in 3D.
    pub fn section_points(&self) -> Vec<Point3> {
        self.section.iter().map(|q| self.to_global(q)).collect()
    }
}

/// Closest point on the yarn centreline with the interpolated frame there.
#[derive(Debug, Clone, PartialEq)]
pub struct YarnLocation {
    /// Slave segment index (between slave `segment` and `segment + 1`).
    pub segment: usize,
    /// Parameter along the segment, clamped to `[0, 1]`.
    pub u: f64,
    /// True when the unclamped projection fell inside the segment.
    pub within: bool,
    /// Distance from the query point to the centreline.
    pub distance: f64,
    /// Centreline position.
    pub centre: Point3,
    /// Segment direction.
    pub tangent: Dir3,
    /// Interpolated up vector, orthogonal to `tangent`.
    pub up: Dir3,
    /// `up × tangent`.
    pub side: Dir3,
    /// Interpolated section outline.
    pub section: Vec<Point2>,
}

impl YarnLocation {
    /// Project a 3D point into this location's section frame.
    pub fn to_local(&self, p: &Point3) -> Point2 {
        let d = p - self.centre;
        Point2::new(d.dot(self.side.as_ref()), d.dot(self.up.as_ref()))
    }
}

/// Unit vector orthogonal to `tangent`, as close to `hint` as possible.
fn orthogonal_up(hint: &Vec3, tangent: &Dir3) -> Dir3 {
    let t = tangent.as_ref();
    let projected = hint - t * hint.dot(t);
    if projected.norm() > 1e-9 {
        return Dir3::new_normalize(projected);
    }
    // Tangent parallel to the hint: pick the least aligned axis
    let axis = if t.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    Dir3::new_normalize(axis - t * axis.dot(t))
}

/// A yarn: polyline centreline, cross section and material data.
#[derive(Debug, Clone, PartialEq)]
pub struct Yarn {
    centreline: Vec<Point3>,
    section: Section,
    resolution: YarnResolution,
    up_hint: Vec3,
    repeats: Vec<Vec3>,
    fibres: FibreModel,
    material: Material,
    adjusted_sections: BTreeMap<usize, Vec<Point2>>,
}

impl Yarn {
    /// Create a yarn following `centreline` with a constant section.
    pub fn new(centreline: Vec<Point3>, section: Section) -> Result<Self> {
        if centreline.len() < 2 {
            return Err(TextileError::InvalidCentreline(format!(
                "need at least 2 nodes, got {}",
                centreline.len()
            )));
        }
        if let Some(i) = centreline
            .windows(2)
            .position(|w| (w[1] - w[0]).norm() < 1e-12)
        {
            return Err(TextileError::InvalidCentreline(format!(
                "segment {i} has zero length"
            )));
        }
        section.validate()?;
        Ok(Self {
            centreline,
            section,
            resolution: YarnResolution::default(),
            up_hint: Vec3::z(),
            repeats: Vec::new(),
            fibres: FibreModel::default(),
            material: Material::default(),
            adjusted_sections: BTreeMap::new(),
        })
    }

    /// Centreline nodes.
    pub fn centreline(&self) -> &[Point3] {
        &self.centreline
    }

    /// Base cross section.
    pub fn section(&self) -> &Section {
        &self.section
    }

    /// Mesh resolution.
    pub fn resolution(&self) -> YarnResolution {
        self.resolution
    }

    /// Change the mesh resolution; clears adjusted sections.
    pub fn set_resolution(&mut self, resolution: YarnResolution) -> Result<()> {
        resolution.validate()?;
        self.resolution = resolution;
        self.adjusted_sections.clear();
        Ok(())
    }

    /// Preferred direction for section `up` vectors.
    pub fn set_up_hint(&mut self, up: Vec3) {
        self.up_hint = up;
    }

    /// Periodic repeat vectors.
    pub fn repeats(&self) -> &[Vec3] {
        &self.repeats
    }

    /// Replace the repeat vectors.
    pub fn set_repeats(&mut self, repeats: Vec<Vec3>) {
        self.repeats = repeats;
    }

    /// Add a repeat vector.
    pub fn add_repeat(&mut self, repeat: Vec3) {
        self.repeats.push(repeat);
    }

    /// Fibre distribution model.
    pub fn fibres(&self) -> &FibreModel {
        &self.fibres
    }

    /// Set the fibre distribution model.
    pub fn set_fibres(&mut self, fibres: FibreModel) {
        self.fibres = fibres;
    }

    /// Material constants.
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Set the material constants.
    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    /// Number of outline points in each section.
    pub fn section_point_count(&self) -> usize {
        match &self.section {
            Section::Polygon { points } => points.len(),
            _ => self.resolution.section_points,
        }
    }

    /// Outline of the base section at the configured resolution.
    pub fn base_outline(&self) -> Vec<Point2> {
        self.section.outline(self.resolution.section_points)
    }

    /// Number of slave nodes.
    pub fn num_slave_nodes(&self) -> usize {
        (self.centreline.len() - 1) * self.resolution.slaves_per_segment + 1
    }

    /// Override the section of one slave node.
    pub fn set_adjusted_section(&mut self, slave: usize, outline: Vec<Point2>) -> Result<()> {
        if slave >= self.num_slave_nodes() {
            return Err(TextileError::InvalidSection(format!(
                "slave node {slave} out of range ({} slave nodes)",
                self.num_slave_nodes()
            )));
        }
        if outline.len() != self.section_point_count() {
            return Err(TextileError::InvalidSection(format!(
                "adjusted section has {} points, expected {}",
                outline.len(),
                self.section_point_count()
            )));
        }
        self.adjusted_sections.insert(slave, outline);
        Ok(())
    }

    /// Adjusted section of a slave node, if one was set.
    pub fn adjusted_section(&self, slave: usize) -> Option<&[Point2]> {
        self.adjusted_sections.get(&slave).map(Vec::as_slice)
    }

    /// Drop every adjusted section.
    pub fn clear_adjusted_sections(&mut self) {
        self.adjusted_sections.clear();
    }

    /// Sample the centreline into slave nodes with frames and sections.
    pub fn slave_nodes(&self) -> Vec<SlaveNode> {
        let per = self.resolution.slaves_per_segment;
        let dirs: Vec<Dir3> = self
            .centreline
            .windows(2)
            .map(|w| Dir3::new_normalize(w[1] - w[0]))
            .collect();
        let base = self.base_outline();

        let mut slaves = Vec::with_capacity(self.num_slave_nodes());
        let mut push = |position: Point3, tangent: Dir3| {
            let index = slaves.len();
            let up = orthogonal_up(&self.up_hint, &tangent);
            let side = Dir3::new_normalize(up.cross(tangent.as_ref()));
            let section = self
                .adjusted_sections
                .get(&index)
                .cloned()
                .unwrap_or_else(|| base.clone());
            slaves.push(SlaveNode {
                index,
                position,
                tangent,
                up,
                side,
                section,
            });
        };

        for (i, w) in self.centreline.windows(2).enumerate() {
            for j in 0..per {
                let u = j as f64 / per as f64;
                let tangent = if j == 0 && i > 0 {
                    let blended = dirs[i - 1].as_ref() + dirs[i].as_ref();
                    if blended.norm() > 1e-9 {
                        Dir3::new_normalize(blended)
                    } else {
                        dirs[i]
                    }
                } else {
                    dirs[i]
                };
                push(w[0] + (w[1] - w[0]) * u, tangent);
            }
        }
        if let (Some(&last), Some(&dir)) = (self.centreline.last(), dirs.last()) {
            push(last, dir);
        }
        slaves
    }

    /// Bounding box of every section outline.
    pub fn aabb(&self) -> Aabb3 {
        slaves_aabb(&self.slave_nodes())
    }

    /// Repeat combinations (each repeat used -1, 0 or +1 times) that place
    /// a copy of the yarn overlapping the domain. The untranslated copy
    /// comes first when it overlaps.
    pub fn translations(&self, domain: &Domain) -> Vec<Vec3> {
        translations_for(&self.aabb(), &self.repeats, domain)
    }

    /// Closest centreline location to `p`.
    pub fn locate(&self, p: &Point3) -> Option<YarnLocation> {
        locate(&self.slave_nodes(), p)
    }

    /// Append the volume mesh of this yarn, clipped to `domain`.
    ///
    /// Every translated copy overlapping the domain is meshed with one
    /// polygon ring per slave node (the section outline), hexes for the
    /// outer layers and wedges around the centre. The copies are then cut
    /// by the domain faces, coincident nodes of touching copies are merged
    /// and rings crossing a face are dropped.
    pub fn add_volume_to_mesh(&self, mesh: &mut Mesh, domain: &Domain) -> Result<()> {
        self.resolution.validate()?;
        let slaves = self.slave_nodes();
        let translations = translations_for(&slaves_aabb(&slaves), &self.repeats, domain);
        let layers = self.resolution.section_layers;

        let sections: Vec<_> = slaves
            .iter()
            .map(|s| mesh_section(&s.section, layers))
            .collect();
        let Some(first) = sections.first() else {
            return Err(TextileError::InvalidCentreline("no slave nodes".into()));
        };
        let per_section = first.points.len();
        if sections.iter().any(|s| s.points.len() != per_section) {
            return Err(TextileError::InvalidSection(
                "sections along a yarn must have equal point counts".into(),
            ));
        }

        let mut copies = Mesh::new();
        for offset in &translations {
            let base = copies.num_nodes();
            for (slave, section) in slaves.iter().zip(&sections) {
                for q in &section.points {
                    copies.add_node(slave.to_global(q) + offset);
                }
            }
            for k in 0..slaves.len() {
                let start = base + k * per_section;
                let ring: Vec<usize> = first.outline().map(|i| start + i).collect();
                copies.add_element(ElementType::Polygon, &ring)?;
            }
            for k in 0..slaves.len() - 1 {
                let a = base + k * per_section;
                let b = a + per_section;
                for q in &first.quads {
                    let nodes = [
                        a + q[0], a + q[1], a + q[2], a + q[3],
                        b + q[0], b + q[1], b + q[2], b + q[3],
                    ];
                    copies.add_element(ElementType::Hex, &nodes)?;
                }
                for t in &first.triangles {
                    let nodes = [a + t[0], a + t[1], a + t[2], b + t[0], b + t[1], b + t[2]];
                    copies.add_element(ElementType::Wedge, &nodes)?;
                }
            }
        }

        let tol = Tolerance::DEFAULT.linear;
        let clipped = copies.clip(&domain.half_spaces(), tol);
        let merged = copies.merge_nodes(tol);
        if merged > 0 {
            copies.remove_degenerate_elements();
            copies.remove_duplicate_elements();
            copies.remove_unreferenced_nodes();
        }
        mesh.merge(&copies);

        debug!(
            copies = translations.len(),
            slaves = slaves.len(),
            cut = clipped.cut,
            removed = clipped.removed,
            merged,
            nodes = copies.num_nodes(),
            "added yarn volume mesh"
        );
        Ok(())
    }
}

/// Bounding box of the section outlines of `slaves`.
pub fn slaves_aabb(slaves: &[SlaveNode]) -> Aabb3 {
    let mut aabb = Aabb3::empty();
    for s in slaves {
        for p in s.section_points() {
            aabb.include_point(&p);
        }
    }
    aabb
}

pub(crate) fn translations_for(aabb: &Aabb3, repeats: &[Vec3], domain: &Domain) -> Vec<Vec3> {
    let mut combos = vec![Vec3::zeros()];
    for r in repeats {
        combos = combos
            .iter()
            .flat_map(|c| [0.0, -1.0, 1.0].map(|k| c + r * k))
            .collect();
    }
    combos
        .into_iter()
        .filter(|t| aabb.translated(t).overlaps_strictly(domain.aabb(), 1e-9))
        .collect()
}

/// Closest location on the centreline through `slaves`.
pub fn locate(slaves: &[SlaveNode], p: &Point3) -> Option<YarnLocation> {
    let mut best: Option<(usize, f64, bool, f64)> = None;
    for (k, pair) in slaves.windows(2).enumerate() {
        let a = pair[0].position;
        let ab = pair[1].position - a;
        let len2 = ab.norm_squared();
        if len2 < 1e-24 {
            continue;
        }
        let raw = (p - a).dot(&ab) / len2;
        let u = raw.clamp(0.0, 1.0);
        let distance = (p - (a + ab * u)).norm();
        let within = (0.0..=1.0).contains(&raw);
        let better = match best {
            None => true,
            Some((_, _, best_within, best_distance)) => {
                (within && !best_within)
                    || (within == best_within && distance < best_distance)
            }
        };
        if better {
            best = Some((k, u, within, distance));
        }
    }

    let (segment, u, within, distance) = best?;
    let (s0, s1) = (&slaves[segment], &slaves[segment + 1]);
    let tangent = Dir3::new_normalize(s1.position - s0.position);
    let blended = s0.up.as_ref() * (1.0 - u) + s1.up.as_ref() * u;
    let up = orthogonal_up(&blended, &tangent);
    let side = Dir3::new_normalize(up.cross(tangent.as_ref()));
    Some(YarnLocation {
        segment,
        u,
        within,
        distance,
        centre: s0.position + (s1.position - s0.position) * u,
        tangent,
        up,
        side,
        section: lerp_outline(&s0.section, &s1.section, u),
    })
}

/// Depth of `p` inside the yarn through `slaves`, measured to the
/// section outline; `None` when `p` is outside.
pub fn penetration_depth(slaves: &[SlaveNode], p: &Point3) -> Option<f64> {
    let loc = locate(slaves, p)?;
    if !loc.within {
        return None;
    }
    let q = loc.to_local(p);
    if !point_in_polygon(&q, &loc.section) {
        return None;
    }
    let depth = distance_to_outline(&q, &loc.section);
    (depth > 1e-12).then_some(depth)
}
