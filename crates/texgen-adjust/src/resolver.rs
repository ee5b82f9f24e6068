//! Interference correction across a set of yarn meshes.
//!
//! Correction runs in three stages. Detected points are first moved half
//! their detected depth towards an interpolation node chosen from the
//! element topology. Reduced triangle meshes are then built from the
//! elements touched by those points. Finally each point is re-tested
//! against the other yarns' reduced meshes along its correction direction
//! and moved again until a pass makes no correction.

use std::collections::HashSet;

use texgen_math::{Aabb3, Point2, Segment, Tolerance, Vec3};
use texgen_mesh::{ElementType, Mesh};
use texgen_textile::{InterferenceSource, Textile};
use tracing::{debug, error, info, warn};

use crate::error::{AdjustError, Result};
use crate::intersection::IntersectionPoint;
use crate::sections::find_mesh_polygon_sections;
use crate::AdjustSettings;

/// Detects and corrects interference between yarn meshes.
#[derive(Debug, Clone, Default)]
pub struct InterferenceResolver {
    settings: AdjustSettings,
    intersections: Vec<IntersectionPoint>,
    interference_meshes: Vec<Mesh>,
    temp_yarn_meshes: Vec<Mesh>,
    node_displacements: Vec<Vec<Vec3>>,
    passes: usize,
}

impl InterferenceResolver {
    /// Create a resolver with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with the given settings.
    pub fn with_settings(settings: AdjustSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &AdjustSettings {
        &self.settings
    }

    /// Points found by the last [`adjust_mesh`](Self::adjust_mesh) call.
    pub fn intersections(&self) -> &[IntersectionPoint] {
        &self.intersections
    }

    /// Refinement passes run by the last call.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Generate the volume mesh of every yarn against the textile domain.
    pub fn create_volume_meshes(textile: &Textile) -> Result<Vec<Mesh>> {
        let Some(domain) = textile.domain() else {
            error!("cannot create yarn meshes: textile has no domain");
            return Err(AdjustError::NoDomain);
        };
        if textile.num_yarns() == 0 {
            error!("cannot create yarn meshes: textile has no yarns");
            return Err(AdjustError::NoYarns);
        }

        let mut meshes = Vec::with_capacity(textile.num_yarns());
        for (i, yarn) in textile.yarns().iter().enumerate() {
            let mut mesh = Mesh::new();
            if let Err(source) = yarn.add_volume_to_mesh(&mut mesh, domain) {
                error!(yarn = i, "failed to create yarn volume mesh: {source}");
                return Err(AdjustError::MeshGeneration { yarn: i, source });
            }
            if mesh.total_elements() == 0 {
                error!(yarn = i, "yarn volume mesh is empty");
                return Err(AdjustError::EmptyMesh(i));
            }
            meshes.push(mesh);
        }
        Ok(meshes)
    }

    /// Correct interference between `yarn_meshes` to within `tolerance`.
    ///
    /// On error the meshes are restored to their state on entry.
    pub fn adjust_mesh(
        &mut self,
        source: &impl InterferenceSource,
        yarn_meshes: &mut [Mesh],
        tolerance: f64,
    ) -> Result<()> {
        if source.num_yarns() == 0 {
            error!("cannot adjust mesh: no yarns");
            return Err(AdjustError::NoYarns);
        }
        if yarn_meshes.len() != source.num_yarns() {
            return Err(AdjustError::YarnCountMismatch {
                yarns: source.num_yarns(),
                meshes: yarn_meshes.len(),
            });
        }

        self.settings.tolerance = tolerance;
        self.settings.validate()?;
        self.intersections.clear();
        self.interference_meshes.clear();
        self.passes = 0;
        self.temp_yarn_meshes = yarn_meshes.to_vec();
        self.node_displacements = yarn_meshes
            .iter()
            .map(|m| vec![Vec3::zeros(); m.num_nodes()])
            .collect();

        if self.check_initial_intersections(source, yarn_meshes) {
            info!(tolerance, "interference already within tolerance");
            return Ok(());
        }

        if let Err(e) = self.correct(yarn_meshes) {
            yarn_meshes.clone_from_slice(&self.temp_yarn_meshes);
            return Err(e);
        }

        self.set_node_displacements(yarn_meshes);
        info!(
            points = self.intersections.len(),
            passes = self.passes,
            "mesh interference corrected"
        );
        Ok(())
    }

    /// Build intersection points from the source's interference reports.
    ///
    /// Returns `true` when the worst depth is already below tolerance.
    fn check_initial_intersections(
        &mut self,
        source: &impl InterferenceSource,
        yarn_meshes: &[Mesh],
    ) -> bool {
        let mut worst: f64 = 0.0;
        for report in source.detect_interference() {
            let Some(mesh) = yarn_meshes.get(report.yarn) else {
                warn!(yarn = report.yarn, "interference reported for unknown yarn");
                continue;
            };
            let Some((node, _)) = mesh.closest_node(&report.point) else {
                continue;
            };
            let point = mesh.node(node);
            let mut ip = IntersectionPoint::new(report.yarn, node, point, report.depth);
            ip.boundary_pair = source
                .repeats(report.yarn)
                .iter()
                .flat_map(|r| [point + *r, point - *r])
                .find_map(|p| mesh.find_node(&p, Tolerance::DEFAULT.linear));
            worst = worst.max(report.depth.abs());
            self.intersections.push(ip);
        }
        info!(
            points = self.intersections.len(),
            worst_depth = worst,
            "initial interference"
        );
        worst < self.settings.tolerance
    }

    fn correct(&mut self, yarn_meshes: &mut [Mesh]) -> Result<()> {
        self.adjust_initial_intersections(yarn_meshes)?;
        self.build_interference_meshes(yarn_meshes)?;
        self.adjust_intersections(yarn_meshes)
    }

    /// Move every point half its detected depth towards its interpolation node.
    fn adjust_initial_intersections(&mut self, yarn_meshes: &mut [Mesh]) -> Result<()> {
        for ip in &mut self.intersections {
            let mesh = &mut yarn_meshes[ip.yarn];
            ip.find_elements(mesh);
            if !ip.find_interpolation_node(mesh) {
                continue;
            }
            ip.move_node(mesh, ip.initial_depth)?;
            ip.remaining_distance = ip.initial_depth.abs() * 0.5;
        }
        Ok(())
    }

    /// Reduced triangle meshes of the elements touched by corrected points.
    ///
    /// Node arrays are copied whole so indices match the yarn meshes.
    fn build_interference_meshes(&mut self, yarn_meshes: &[Mesh]) -> Result<()> {
        let mut meshes = Vec::with_capacity(yarn_meshes.len());
        for (yarn, mesh) in yarn_meshes.iter().enumerate() {
            let mut reduced = Mesh::new();
            for p in mesh.nodes() {
                reduced.add_node(*p);
            }
            let mut seen = HashSet::new();
            for ip in self
                .intersections
                .iter()
                .filter(|ip| ip.yarn == yarn && ip.interp_index.is_some())
            {
                for &(kind, e) in &ip.elements {
                    if !seen.insert((kind, e)) {
                        continue;
                    }
                    if let Some(nodes) = mesh.element(kind, e) {
                        reduced.add_element(kind, nodes)?;
                    }
                }
            }
            reduced.merge_nodes(Tolerance::DEFAULT.linear);
            reduced.remove_duplicate_elements();
            reduced.convert_to_surface();
            reduced.convert_to_triangles();
            debug!(
                yarn,
                triangles = reduced.num_elements(ElementType::Tri),
                "built interference mesh"
            );
            meshes.push(reduced);
        }
        self.interference_meshes = meshes;
        Ok(())
    }

    /// Re-test points along their correction direction until a pass moves nothing.
    fn adjust_intersections(&mut self, yarn_meshes: &mut [Mesh]) -> Result<()> {
        let boxes: Vec<Aabb3> = self
            .interference_meshes
            .iter()
            .map(Mesh::element_aabb)
            .collect();
        let tolerance = self.settings.tolerance;

        for pass in 1..=self.settings.max_passes {
            self.passes = pass;
            let mut corrected = false;
            for ip in &mut self.intersections {
                let Some(interp) = ip.interp_index else {
                    continue;
                };
                let mesh = &mut yarn_meshes[ip.yarn];
                ip.point = mesh.node(ip.node_index);
                ip.interp_point = mesh.node(interp);
                let segment = Segment::new(ip.point, ip.interp_point);

                let hit = self
                    .interference_meshes
                    .iter()
                    .enumerate()
                    .filter(|&(other, _)| {
                        other != ip.yarn && boxes[other].overlaps(&boxes[ip.yarn])
                    })
                    .find_map(|(_, other)| other.first_intersection(&segment));

                ip.remaining_distance = hit.map_or(0.0, |t| segment.length() * t);
                if ip.remaining_distance < tolerance {
                    continue;
                }
                let offset = ip.move_node(mesh, ip.remaining_distance)?;
                let reduced = &mut self.interference_meshes[ip.yarn];
                reduced.translate_node(ip.node_index, &offset);
                if let Some(pair) = ip.boundary_pair {
                    reduced.translate_node(pair, &offset);
                }
                corrected = true;
            }
            if !corrected {
                debug!(passes = pass, "interference refinement converged");
                return Ok(());
            }
        }

        error!(
            passes = self.settings.max_passes,
            "interference refinement did not converge"
        );
        Err(AdjustError::ConvergenceTimeout {
            passes: self.settings.max_passes,
        })
    }

    fn set_node_displacements(&mut self, yarn_meshes: &[Mesh]) {
        self.node_displacements = yarn_meshes
            .iter()
            .zip(&self.temp_yarn_meshes)
            .map(|(mesh, start)| {
                start
                    .nodes()
                    .iter()
                    .zip(mesh.nodes())
                    .map(|(s, p)| s - p)
                    .collect()
            })
            .collect();
    }

    /// Per-node `start - current` offsets of a yarn after correction.
    ///
    /// Nodes that were not moved report zero; unknown yarns give an empty slice.
    pub fn node_displacements(&self, yarn: usize) -> &[Vec3] {
        self.node_displacements
            .get(yarn)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Store the corrected outline rings as adjusted yarn sections.
    ///
    /// Each slave node's section is matched against the polygon rings of
    /// the uncorrected snapshot under the yarn's repeat translations. When
    /// several copies match, the most displaced one is used. Its ring in
    /// `yarn_meshes` is projected into the slave node's frame; unmatched
    /// slave nodes revert to the base section.
    pub fn adjust_section_meshes(&self, textile: &mut Textile, yarn_meshes: &[Mesh]) -> Result<()> {
        let yarns = textile.num_yarns();
        if self.temp_yarn_meshes.len() != yarns {
            return Err(AdjustError::MissingSnapshot);
        }
        if yarn_meshes.len() != yarns {
            return Err(AdjustError::YarnCountMismatch {
                yarns,
                meshes: yarn_meshes.len(),
            });
        }
        let domain = textile.domain().copied();

        for y in 0..yarns {
            let Some(yarn) = textile.yarn_mut(y) else {
                continue;
            };
            let original = &self.temp_yarn_meshes[y];
            let adjusted = &yarn_meshes[y];
            yarn.clear_adjusted_sections();
            let slaves = yarn.slave_nodes();
            let mut offsets = domain.map(|d| yarn.translations(&d)).unwrap_or_default();
            if !offsets.contains(&Vec3::zeros()) {
                offsets.insert(0, Vec3::zeros());
            }

            let mut matched = 0;
            for slave in &slaves {
                let candidates = find_mesh_polygon_sections(
                    original,
                    &slave.section_points(),
                    &offsets,
                    Tolerance::SECTION.linear,
                );
                let best = candidates
                    .into_iter()
                    .filter_map(|m| {
                        let ring = adjusted.element(ElementType::Polygon, m.ring)?;
                        let moved: f64 = ring
                            .iter()
                            .map(|&i| (adjusted.node(i) - original.node(i)).norm())
                            .sum();
                        Some((m, ring, moved))
                    })
                    .max_by(|a, b| a.2.total_cmp(&b.2));
                let Some((m, ring, _)) = best else {
                    continue;
                };

                let n = ring.len();
                let outline: Vec<Point2> = (0..n)
                    .map(|j| slave.to_local(&(adjusted.node(ring[(j + m.rotation) % n]) - m.offset)))
                    .collect();
                yarn.set_adjusted_section(slave.index, outline)?;
                matched += 1;
            }
            debug!(yarn = y, matched, slaves = slaves.len(), "remapped yarn sections");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersection::tests::hex_grid;
    use approx::assert_relative_eq;
    use texgen_math::Point3;
    use texgen_textile::{Domain, InterferenceReport, Section, Yarn};

    struct StubSource {
        yarns: usize,
        repeats: Vec<Vec3>,
        reports: Vec<InterferenceReport>,
    }

    impl InterferenceSource for StubSource {
        fn num_yarns(&self) -> usize {
            self.yarns
        }

        fn repeats(&self, _yarn: usize) -> Vec<Vec3> {
            self.repeats.clone()
        }

        fn detect_interference(&self) -> Vec<InterferenceReport> {
            self.reports.clone()
        }
    }

    fn report(yarn: usize, depth: f64, point: Point3) -> InterferenceReport {
        InterferenceReport { yarn, depth, point }
    }

    fn shifted_grid(offset: Vec3) -> Mesh {
        let mut mesh = hex_grid(2, 2, 1);
        for i in 0..mesh.num_nodes() {
            mesh.translate_node(i, &offset);
        }
        mesh
    }

    fn crossing_textile(gap: f64) -> Textile {
        let section = Section::Ellipse {
            width: 0.6,
            height: 0.2,
        };
        let mut textile = Textile::new("crossing");
        let warp = Yarn::new(
            vec![Point3::new(0.0, 0.5, 0.0), Point3::new(1.0, 0.5, 0.0)],
            section.clone(),
        )
        .unwrap();
        let weft = Yarn::new(
            vec![Point3::new(0.5, 0.0, gap), Point3::new(0.5, 1.0, gap)],
            section,
        )
        .unwrap();
        textile.add_yarn(warp);
        textile.add_yarn(weft);
        textile.set_domain(
            Domain::new(Point3::new(0.0, 0.0, -0.5), Point3::new(1.0, 1.0, 0.5)).unwrap(),
        );
        textile
    }

    #[test]
    fn test_single_point_moves_half_depth() {
        // Yarn 1 overlaps yarn 0 by 0.1 but only yarn 0's centre is reported
        let source = StubSource {
            yarns: 2,
            repeats: Vec::new(),
            reports: vec![report(0, -0.1, Point3::new(1.0, 1.0, 1.0))],
        };
        let mut meshes = vec![hex_grid(2, 2, 1), shifted_grid(Vec3::new(0.0, 0.0, 0.9))];
        let mut resolver = InterferenceResolver::new();
        resolver.adjust_mesh(&source, &mut meshes, 1e-4).unwrap();

        assert_eq!(resolver.passes(), 1);
        assert_relative_eq!(meshes[0].node(13).z, 0.95, epsilon = 1e-12);

        let displacements = resolver.node_displacements(0);
        assert_eq!(displacements.len(), meshes[0].num_nodes());
        assert_relative_eq!(displacements[13].z, 0.05, epsilon = 1e-12);
        let others: f64 = displacements
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != 13)
            .map(|(_, d)| d.norm())
            .sum();
        assert_eq!(others, 0.0);
    }

    #[test]
    fn test_refinement_reaches_contact() {
        // Yarn 1 sits 0.2 into yarn 0; the top centre of yarn 0 and the
        // bottom centre of yarn 1 are both reported.
        let tol = 1e-4;
        let source = StubSource {
            yarns: 2,
            repeats: Vec::new(),
            reports: vec![
                report(0, -0.2, Point3::new(1.0, 1.0, 1.0)),
                report(1, -0.2, Point3::new(1.3, 1.6, 0.8)),
            ],
        };
        let mut meshes = vec![hex_grid(2, 2, 1), shifted_grid(Vec3::new(0.3, 0.6, 0.8))];
        let mut resolver = InterferenceResolver::new();
        resolver.adjust_mesh(&source, &mut meshes, tol).unwrap();

        assert!(resolver.passes() > 1);
        for ip in resolver.intersections() {
            assert!(ip.interp_index.is_some());
            assert!(ip.remaining_distance < tol);
        }

        // Each centre ends on the other yarn's surface, whose height at
        // that point depends linearly on the other centre.
        let za = meshes[0].node(13).z;
        let zb = meshes[1].node(4).z;
        assert!((za - 6.0 / 7.0).abs() < 2.0 * tol);
        assert!((zb - (0.4 * 6.0 / 7.0 + 0.6)).abs() < 2.0 * tol);
        assert!(za < 0.9 && zb > 0.9);
        assert_relative_eq!(resolver.node_displacements(0)[13].z, 1.0 - za, epsilon = 1e-12);
        assert_relative_eq!(resolver.node_displacements(1)[4].z, 0.8 - zb, epsilon = 1e-12);
    }

    #[test]
    fn test_refinement_timeout_restores_meshes() {
        let source = StubSource {
            yarns: 2,
            repeats: Vec::new(),
            reports: vec![
                report(0, -0.2, Point3::new(1.0, 1.0, 1.0)),
                report(1, -0.2, Point3::new(1.3, 1.6, 0.8)),
            ],
        };
        let mut meshes = vec![hex_grid(2, 2, 1), shifted_grid(Vec3::new(0.3, 0.6, 0.8))];
        let before = meshes.clone();
        let mut resolver = InterferenceResolver::with_settings(AdjustSettings {
            tolerance: 1e-4,
            max_passes: 1,
        });
        let err = resolver.adjust_mesh(&source, &mut meshes, 1e-4).unwrap_err();

        assert!(matches!(err, AdjustError::ConvergenceTimeout { passes: 1 }));
        assert_eq!(resolver.passes(), 1);
        assert_eq!(meshes, before);
    }

    #[test]
    fn test_boundary_pair_moves_together() {
        let repeat = Vec3::new(2.0, 0.0, 0.0);
        let source = StubSource {
            yarns: 1,
            repeats: vec![repeat],
            reports: vec![report(0, -0.2, Point3::new(0.0, 1.0, 1.0))],
        };
        let mut meshes = vec![hex_grid(2, 2, 1)];
        let mut resolver = InterferenceResolver::new();
        resolver.adjust_mesh(&source, &mut meshes, 1e-4).unwrap();

        assert_eq!(resolver.intersections()[0].boundary_pair, Some(14));
        let d = resolver.node_displacements(0);
        assert_relative_eq!(d[12].x, -0.1, epsilon = 1e-12);
        assert_relative_eq!(d[14].x, d[12].x, epsilon = 1e-12);
        assert_relative_eq!(
            meshes[0].node(14) - meshes[0].node(12),
            repeat,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_infeasible_move_restores_meshes() {
        let source = StubSource {
            yarns: 1,
            repeats: Vec::new(),
            reports: vec![
                report(0, -0.2, Point3::new(0.0, 1.0, 1.0)),
                report(0, -2.5, Point3::new(1.0, 1.0, 1.0)),
            ],
        };
        let original = hex_grid(2, 2, 1);
        let mut meshes = vec![original.clone()];
        let mut resolver = InterferenceResolver::new();
        let err = resolver.adjust_mesh(&source, &mut meshes, 1e-4).unwrap_err();

        assert!(matches!(
            err,
            AdjustError::NodeTravelExceeded { yarn: 0, node: 13, .. }
        ));
        assert_eq!(meshes[0], original);
    }

    #[test]
    fn test_shallow_interference_is_left_alone() {
        let source = StubSource {
            yarns: 1,
            repeats: Vec::new(),
            reports: vec![report(0, -1e-5, Point3::new(1.0, 1.0, 1.0))],
        };
        let original = hex_grid(2, 2, 1);
        let mut meshes = vec![original.clone()];
        let mut resolver = InterferenceResolver::new();
        resolver.adjust_mesh(&source, &mut meshes, 1e-4).unwrap();

        assert_eq!(meshes[0], original);
        assert_eq!(resolver.passes(), 0);
        assert!(resolver.node_displacements(0).iter().all(|d| d.norm() == 0.0));
    }

    #[test]
    fn test_argument_errors() {
        let mut resolver = InterferenceResolver::new();
        let empty = StubSource {
            yarns: 0,
            repeats: Vec::new(),
            reports: Vec::new(),
        };
        assert!(matches!(
            resolver.adjust_mesh(&empty, &mut [], 1e-4),
            Err(AdjustError::NoYarns)
        ));

        let two = StubSource {
            yarns: 2,
            ..empty
        };
        let mut meshes = vec![hex_grid(1, 1, 1)];
        assert!(matches!(
            resolver.adjust_mesh(&two, &mut meshes, 1e-4),
            Err(AdjustError::YarnCountMismatch { yarns: 2, meshes: 1 })
        ));

        let one = StubSource { yarns: 1, ..two };
        assert!(matches!(
            resolver.adjust_mesh(&one, &mut meshes, -1.0),
            Err(AdjustError::InvalidSettings(_))
        ));
        assert!(resolver.node_displacements(5).is_empty());
    }

    #[test]
    fn test_volume_meshes_need_domain_and_yarns() {
        let mut textile = Textile::new("empty");
        assert!(matches!(
            InterferenceResolver::create_volume_meshes(&textile),
            Err(AdjustError::NoDomain)
        ));
        textile.set_domain(Domain::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).unwrap());
        assert!(matches!(
            InterferenceResolver::create_volume_meshes(&textile),
            Err(AdjustError::NoYarns)
        ));
    }

    #[test]
    fn test_section_remap_needs_snapshot() {
        let mut textile = crossing_textile(0.15);
        let meshes = InterferenceResolver::create_volume_meshes(&textile).unwrap();
        let resolver = InterferenceResolver::new();
        assert!(matches!(
            resolver.adjust_section_meshes(&mut textile, &meshes),
            Err(AdjustError::MissingSnapshot)
        ));
    }

    #[test]
    fn test_crossing_yarns_are_separated() {
        let mut textile = crossing_textile(0.15);
        let mut meshes = InterferenceResolver::create_volume_meshes(&textile).unwrap();
        assert_eq!(meshes.len(), 2);
        let original = meshes.clone();

        let mut resolver = InterferenceResolver::new();
        resolver.adjust_mesh(&textile, &mut meshes, 1e-4).unwrap();
        assert!(!resolver.intersections().is_empty());
        assert!(resolver.passes() >= 1);
        assert_ne!(meshes[0], original[0]);
        assert_ne!(meshes[1], original[1]);
        for ip in resolver.intersections().iter().filter(|ip| ip.interp_index.is_some()) {
            assert!(ip.remaining_distance < 1e-4);
        }

        resolver.adjust_section_meshes(&mut textile, &meshes).unwrap();
        let warp = textile.yarn(0).unwrap();
        let base = warp.base_outline();
        let centre = warp.num_slave_nodes() / 2;

        // The crossing slave is flattened; the yarn ends are untouched.
        let crossing = warp.adjusted_section(centre).unwrap();
        let moved = crossing
            .iter()
            .zip(&base)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max);
        assert!(moved > 1e-3);
        let end = warp.adjusted_section(0).unwrap();
        for (a, b) in end.iter().zip(&base) {
            assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
        }
    }
}
