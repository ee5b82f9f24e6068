//! Textile: a set of yarns inside a periodic domain.

use texgen_math::{Point3, Vec3};
use tracing::{debug, info, warn};

use crate::domain::Domain;
use crate::error::{Result, TextileError};
use crate::interference::{InterferenceReport, InterferenceSource};
use crate::section::{point_in_polygon, polygon_area};
use crate::yarn::{locate, penetration_depth, slaves_aabb, translations_for, SlaveNode, Yarn};

/// Orientation and fibre content of the yarn at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointInfo {
    /// Yarn containing the point, if it lies inside the yarn section.
    pub yarn: Option<usize>,
    /// Unit yarn direction.
    pub tangent: Vec3,
    /// Unit section up vector.
    pub up: Vec3,
    /// Interpolated section area.
    pub section_area: f64,
    /// Fibre volume fraction from the yarn's fibre model.
    pub volume_fraction: f64,
}

impl Default for PointInfo {
    fn default() -> Self {
        Self {
            yarn: None,
            tangent: Vec3::x(),
            up: Vec3::z(),
            section_area: 0.0,
            volume_fraction: 0.0,
        }
    }
}

/// Yarns plus an optional domain.
#[derive(Debug, Clone, Default)]
pub struct Textile {
    name: String,
    yarns: Vec<Yarn>,
    domain: Option<Domain>,
}

impl Textile {
    /// Create an empty textile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Textile name, used as the deck heading.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a yarn; returns its index.
    pub fn add_yarn(&mut self, yarn: Yarn) -> usize {
        self.yarns.push(yarn);
        self.yarns.len() - 1
    }

    /// Number of yarns.
    pub fn num_yarns(&self) -> usize {
        self.yarns.len()
    }

    /// All yarns.
    pub fn yarns(&self) -> &[Yarn] {
        &self.yarns
    }

    /// Yarn `i`.
    pub fn yarn(&self, i: usize) -> Option<&Yarn> {
        self.yarns.get(i)
    }

    /// Mutable yarn `i`.
    pub fn yarn_mut(&mut self, i: usize) -> Option<&mut Yarn> {
        self.yarns.get_mut(i)
    }

    /// Assigned domain.
    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    /// Assign the domain.
    pub fn set_domain(&mut self, domain: Domain) {
        self.domain = Some(domain);
    }

    /// Surface points of each yarn copy that lie inside another yarn.
    ///
    /// Only outline nodes inside the domain are tested. A node whose image
    /// at minus a repeat vector is also inside the domain is skipped, so
    /// each periodic pair is reported once.
    pub fn detect_interference(&self) -> Vec<InterferenceReport> {
        let Some(domain) = self.domain.as_ref() else {
            warn!("interference detection needs a domain");
            return Vec::new();
        };
        let mut bounds = *domain.aabb();
        bounds.expand(1e-9);

        let slaves: Vec<Vec<SlaveNode>> = self.yarns.iter().map(Yarn::slave_nodes).collect();
        let mut copies = Vec::new();
        for (i, yarn) in self.yarns.iter().enumerate() {
            let aabb = slaves_aabb(&slaves[i]);
            for offset in translations_for(&aabb, yarn.repeats(), domain) {
                copies.push((i, offset, aabb.translated(&offset)));
            }
        }
        debug!(copies = copies.len(), "testing yarn copies for interference");

        let mut reports = Vec::new();
        for &(i, offset, _) in &copies {
            let repeats = self.yarns[i].repeats();
            for slave in &slaves[i] {
                for q in &slave.section {
                    let p = slave.to_global(q) + offset;
                    if !bounds.contains(&p) || repeats.iter().any(|r| bounds.contains(&(p - *r))) {
                        continue;
                    }
                    let worst = copies
                        .iter()
                        .filter(|(j, _, aabb)| *j != i && aabb.contains(&p))
                        .filter_map(|(j, other, _)| penetration_depth(&slaves[*j], &(p - *other)))
                        .fold(0.0, f64::max);
                    if worst > 0.0 {
                        reports.push(InterferenceReport {
                            yarn: i,
                            depth: -worst,
                            point: p,
                        });
                    }
                }
            }
        }

        info!(points = reports.len(), "interference detection complete");
        reports
    }

    /// Yarn orientation and volume fraction at each point, taken from the
    /// nearest centreline location of any copy of `yarn`.
    pub fn point_information(&self, points: &[Point3], yarn: usize) -> Result<Vec<PointInfo>> {
        let y = self.yarns.get(yarn).ok_or_else(|| TextileError::InvalidYarn {
            yarn,
            reason: format!("textile has {} yarns", self.yarns.len()),
        })?;
        let slaves = y.slave_nodes();
        let mut offsets = match &self.domain {
            Some(domain) => translations_for(&slaves_aabb(&slaves), y.repeats(), domain),
            None => Vec::new(),
        };
        if offsets.is_empty() {
            offsets.push(Vec3::zeros());
        }

        let info = points
            .iter()
            .map(|p| {
                let nearest = offsets
                    .iter()
                    .filter_map(|t| {
                        let local = p - t;
                        locate(&slaves, &local).map(|loc| (loc, local))
                    })
                    .min_by(|a, b| a.0.distance.total_cmp(&b.0.distance));
                let Some((loc, local)) = nearest else {
                    return PointInfo::default();
                };
                let area = polygon_area(&loc.section);
                let inside = loc.within && point_in_polygon(&loc.to_local(&local), &loc.section);
                PointInfo {
                    yarn: inside.then_some(yarn),
                    tangent: loc.tangent.into_inner(),
                    up: loc.up.into_inner(),
                    section_area: area,
                    volume_fraction: y.fibres().volume_fraction(area),
                }
            })
            .collect();
        Ok(info)
    }
}

impl InterferenceSource for Textile {
    fn num_yarns(&self) -> usize {
        self.yarns.len()
    }

    fn repeats(&self, yarn: usize) -> Vec<Vec3> {
        self.yarns
            .get(yarn)
            .map(|y| y.repeats().to_vec())
            .unwrap_or_default()
    }

    fn detect_interference(&self) -> Vec<InterferenceReport> {
        Textile::detect_interference(self)
    }
}
