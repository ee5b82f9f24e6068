//! Assembly of yarn meshes into an ABAQUS input file.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use texgen_adjust::InterferenceResolver;
use texgen_mesh::{ElementType, Mesh};
use texgen_textile::Textile;
use tracing::{debug, error, info, warn};

use crate::deck::{element_centroids, Deck, YarnPart};
use crate::error::{AbaqusError, Result};
use crate::offsets::IndexOffsets;
use crate::settings::ExportSettings;
use crate::surfaces::{yarn_surfaces, YarnSurfaces};
use crate::volume_fraction::element_volume_fractions;

/// Builds and writes ABAQUS decks for a textile.
#[derive(Debug, Clone, Default)]
pub struct AssemblyExporter {
    resolver: InterferenceResolver,
}

impl AssemblyExporter {
    /// Create an exporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver state from the last export that adjusted the mesh.
    pub fn resolver(&self) -> &InterferenceResolver {
        &self.resolver
    }

    /// Write `textile` as an ABAQUS input file at `path`.
    ///
    /// With `adjust_mesh` the yarn interference is corrected first; with
    /// `regenerate_mesh` as well, the corrected outlines are stored on the
    /// textile's yarns and the meshes are rebuilt from them.
    pub fn create_abaqus_input_file(
        &mut self,
        textile: &mut Textile,
        path: impl AsRef<Path>,
        settings: &ExportSettings,
    ) -> Result<()> {
        let path = path.as_ref();
        let deck = self.build_deck(textile, settings)?;
        let file = File::create(path)?;
        deck.write_to(BufWriter::new(file))?;
        info!(
            path = %path.display(),
            nodes = deck.mesh.num_nodes(),
            elements = deck.offsets.total_elements(),
            "wrote ABAQUS input file"
        );
        Ok(())
    }

    /// Generate, optionally correct, and assemble the yarn meshes.
    pub fn build_deck(&mut self, textile: &mut Textile, settings: &ExportSettings) -> Result<Deck> {
        settings.validate()?;
        let Some(domain) = textile.domain().copied() else {
            error!("cannot export: textile has no domain");
            return Err(AbaqusError::NoDomain);
        };
        if textile.num_yarns() == 0 {
            error!("cannot export: textile has no yarns");
            return Err(AbaqusError::NoYarns);
        }

        let mut meshes = InterferenceResolver::create_volume_meshes(textile)?;
        let mut surfaces = compute_surfaces(textile, &meshes, settings);

        let mut recompute_fractions = false;
        if settings.adjust_mesh {
            self.resolver = InterferenceResolver::with_settings(settings.adjust_settings());
            self.resolver
                .adjust_mesh(&*textile, &mut meshes, settings.tolerance)?;
            if settings.regenerate_mesh {
                self.resolver.adjust_section_meshes(textile, &meshes)?;
                meshes = InterferenceResolver::create_volume_meshes(textile)?;
                surfaces = compute_surfaces(textile, &meshes, settings);
                debug!("regenerated yarn meshes from adjusted sections");
            } else {
                recompute_fractions = true;
            }
        } else if settings.regenerate_mesh {
            warn!("regenerate_mesh has no effect without adjust_mesh");
        }

        let mut yarns = Vec::with_capacity(meshes.len());
        for ((y, mesh), surfaces) in meshes.iter().enumerate().zip(surfaces) {
            let mut element_info = textile.point_information(&element_centroids(mesh), y)?;
            let Some(yarn) = textile.yarn(y) else {
                continue;
            };
            if recompute_fractions {
                let fractions = element_volume_fractions(mesh, yarn.fibres());
                for (info, vf) in element_info.iter_mut().zip(fractions) {
                    if let Some(vf) = vf {
                        info.volume_fraction = vf;
                    }
                }
            }
            yarns.push(YarnPart {
                name: format!("Yarn{y}"),
                material: yarn.material().clone(),
                surfaces,
                element_info,
            });
        }

        let mut global = Mesh::new();
        for mesh in &mut meshes {
            mesh.remove_element_type(ElementType::Polygon);
            mesh.remove_unreferenced_nodes();
        }
        let offsets = IndexOffsets::build(&meshes);
        for mesh in &meshes {
            global.merge(mesh);
        }
        debug!(
            yarns = meshes.len(),
            nodes = global.num_nodes(),
            elements = offsets.total_elements(),
            "assembled global mesh"
        );

        Ok(Deck {
            title: textile.name().to_string(),
            mesh: global,
            offsets,
            yarns,
            domain,
            settings: settings.clone(),
        })
    }
}

fn compute_surfaces(textile: &Textile, meshes: &[Mesh], settings: &ExportSettings) -> Vec<YarnSurfaces> {
    meshes
        .iter()
        .zip(textile.yarns())
        .map(|(mesh, yarn)| yarn_surfaces(mesh, yarn.repeats(), settings.surface_mode))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::SurfaceMode;
    use texgen_math::Point3;
    use texgen_textile::{Domain, FibreModel, Section, Yarn};

    fn crossing_textile(gap: f64) -> Textile {
        let section = Section::Ellipse {
            width: 0.6,
            height: 0.2,
        };
        let mut textile = Textile::new("crossing");
        for (a, b) in [
            (Point3::new(0.0, 0.5, 0.0), Point3::new(1.0, 0.5, 0.0)),
            (Point3::new(0.5, 0.0, gap), Point3::new(0.5, 1.0, gap)),
        ] {
            let mut yarn = Yarn::new(vec![a, b], section.clone()).unwrap();
            yarn.set_fibres(FibreModel::ArealDensity { density: 5.0 });
            textile.add_yarn(yarn);
        }
        textile.set_domain(
            Domain::new(Point3::new(0.0, 0.0, -0.5), Point3::new(1.0, 1.0, 0.5)).unwrap(),
        );
        textile
    }

    fn deck_text(deck: &Deck) -> String {
        let mut out = Vec::new();
        deck.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_preconditions() {
        let mut exporter = AssemblyExporter::new();
        let mut textile = Textile::new("empty");
        assert!(matches!(
            exporter.build_deck(&mut textile, &ExportSettings::default()),
            Err(AbaqusError::NoDomain)
        ));
        textile.set_domain(Domain::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).unwrap());
        assert!(matches!(
            exporter.build_deck(&mut textile, &ExportSettings::default()),
            Err(AbaqusError::NoYarns)
        ));
        let settings = ExportSettings {
            step_time: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            exporter.build_deck(&mut crossing_textile(0.3), &settings),
            Err(AbaqusError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_deck_layout() {
        let mut textile = crossing_textile(0.3);
        let deck = AssemblyExporter::new()
            .build_deck(&mut textile, &ExportSettings::default())
            .unwrap();

        // 4 segments, 16 outline points, 2 layers: 16 hexes and 16 wedges per segment
        assert_eq!(deck.offsets.element_range(0, ElementType::Wedge), 0..64);
        assert_eq!(deck.offsets.element_range(1, ElementType::Wedge), 64..128);
        assert_eq!(deck.offsets.element_range(0, ElementType::Hex), 128..192);
        assert_eq!(deck.offsets.element_range(1, ElementType::Hex), 192..256);
        assert_eq!(deck.mesh.num_elements(ElementType::Polygon), 0);
        assert_eq!(deck.mesh.num_nodes(), 2 * 5 * 33);
        assert_eq!(deck.yarns[0].element_info.len(), 128);

        let text = deck_text(&deck);
        assert!(text.starts_with("*Heading\n** crossing\n"));
        assert!(text.contains("*Element, Type=C3D6\n1, "));
        assert!(text.contains("*Element, Type=C3D8\n129, "));
        assert!(text.contains("*ElSet, ElSet=Yarn1, Generate\n65, 128, 1\n193, 256, 1\n"));
        assert!(text.contains("*NSet, NSet=Yarn1Nodes, Generate\n166, 330, 1\n"));
        assert!(text.contains("*Material, Name=Yarn0Material\n"));
        assert!(text.contains("*Solid Section, ElSet=Yarn1, Material=Yarn1Material"));
        assert!(text.contains("*Surface, Type=Element, Name=Yarn0-Upper\n"));
        assert!(text.contains("*Contact Pair, Interaction=YarnContact"));
        assert!(text.contains("Yarn0-Upper, Yarn1-Lower\n"));
        assert!(text.contains("*Dynamic, Explicit\n, 1\n"));
        assert_eq!(text.matches("*Step,").count(), 1);
        assert!(text.trim_end().ends_with("*End Step"));
    }

    #[test]
    fn test_surface_faces_reference_written_elements() {
        let mut textile = crossing_textile(0.3);
        let deck = AssemblyExporter::new()
            .build_deck(&mut textile, &ExportSettings::default())
            .unwrap();
        let total = deck.offsets.total_elements();
        for (y, part) in deck.yarns.iter().enumerate() {
            assert!(!part.surfaces.upper.is_empty());
            assert!(!part.surfaces.lower.is_empty());
            for face in part.surfaces.upper.iter().chain(&part.surfaces.lower) {
                let g = deck
                    .offsets
                    .global_element_index(y, face.kind, face.element)
                    .unwrap();
                assert!(g < total);
                assert!((1..=6).contains(&face.face));
            }
        }
    }

    #[test]
    fn test_whole_surfaces_and_plates() {
        let mut textile = crossing_textile(0.3);
        let settings = ExportSettings {
            surface_mode: SurfaceMode::Whole,
            include_plates: true,
            plate_displacement: 0.05,
            ..Default::default()
        };
        let deck = AssemblyExporter::new().build_deck(&mut textile, &settings).unwrap();
        let pairs = deck.contact_pairs();
        assert!(pairs.contains(&("Yarn0-Surface".to_string(), "Yarn1-Surface".to_string())));
        assert!(pairs.contains(&("Yarn1-Surface".to_string(), "PlateTop-Surface".to_string())));
        assert!(pairs.contains(&("Yarn0-Surface".to_string(), "PlateBottom-Surface".to_string())));

        let text = deck_text(&deck);
        let nodes = deck.mesh.num_nodes();
        assert!(text.contains(&format!("*NSet, NSet=PlateTopRef\n{}\n", nodes + 5)));
        assert!(text.contains("*Element, Type=R3D4, ElSet=PlateBottom\n"));
        assert!(text.contains("*Amplitude, Name=PlateTravel"));
        assert!(text.contains("PlateTopRef, 3, 3, 1.0\n"));
        // Only x and y are periodic when plates close the z faces
        assert!(text.contains("*NSet, NSet=DummyY\n"));
        assert!(!text.contains("DummyZ"));
    }

    #[test]
    fn test_deformation_steps_and_mass_scaling() {
        let mut textile = crossing_textile(0.3);
        let settings = ExportSettings {
            element_type: crate::settings::ElementIntegration::Reduced,
            mass_scaling: 100.0,
            step_time: 0.5,
            deformation_steps: vec![
                crate::settings::DeformationStep {
                    strain: [0.01, 0.0, 0.0],
                },
                crate::settings::DeformationStep {
                    strain: [0.02, 0.0, 0.0],
                },
            ],
            ..Default::default()
        };
        let deck = AssemblyExporter::new().build_deck(&mut textile, &settings).unwrap();
        let text = deck_text(&deck);
        assert!(text.contains("*Element, Type=C3D8R\n"));
        assert_eq!(text.matches("*Step,").count(), 2);
        assert_eq!(text.matches("*Fixed Mass Scaling, Factor=100").count(), 2);
        assert!(text.contains(
            "*Amplitude, Name=StrainX, Definition=Smooth Step, Time=Total Time\n0, 0, 0.5, 0.01, 1, 0.02,\n"
        ));
        assert_eq!(text.matches("*Contact Pair").count(), 1);
    }

    #[test]
    fn test_orientations_follow_yarn_direction() {
        let mut textile = crossing_textile(0.3);
        let deck = AssemblyExporter::new()
            .build_deck(&mut textile, &ExportSettings::default())
            .unwrap();
        let inside: Vec<_> = deck.yarns[0]
            .element_info
            .iter()
            .filter(|i| i.yarn == Some(0))
            .collect();
        assert!(!inside.is_empty());
        for info in inside {
            assert!((info.tangent.x - 1.0).abs() < 1e-9);
            assert!(info.volume_fraction > 0.0);
        }
    }

    #[test]
    fn test_adjusted_export_lowers_crossing_fractions() {
        let mut plain = crossing_textile(0.15);
        let before = AssemblyExporter::new()
            .build_deck(&mut plain, &ExportSettings::default())
            .unwrap();

        let mut textile = crossing_textile(0.15);
        let settings = ExportSettings {
            adjust_mesh: true,
            ..Default::default()
        };
        let mut exporter = AssemblyExporter::new();
        let after = exporter.build_deck(&mut textile, &settings).unwrap();
        assert!(!exporter.resolver().intersections().is_empty());

        // Areal density: a flattened section carries a lower fraction
        let lowered = before.yarns[0]
            .element_info
            .iter()
            .zip(&after.yarns[0].element_info)
            .filter(|(b, a)| a.volume_fraction < b.volume_fraction - 1e-9)
            .count();
        assert!(lowered > 0);
        assert_eq!(before.mesh.num_nodes(), after.mesh.num_nodes());
    }

    #[test]
    fn test_regenerated_export_stores_adjusted_sections() {
        let mut textile = crossing_textile(0.15);
        let settings = ExportSettings {
            adjust_mesh: true,
            regenerate_mesh: true,
            ..Default::default()
        };
        let deck = AssemblyExporter::new().build_deck(&mut textile, &settings).unwrap();
        let warp = textile.yarn(0).unwrap();
        assert!(warp.adjusted_section(2).is_some());
        assert_eq!(deck.offsets.total_elements(), 256);
    }
}
