//! ABAQUS keyword deck writer.
//!
//! All node and element numbers in the deck are 1-based. Yarn elements
//! and nodes follow the [`IndexOffsets`] layout; plate and dummy nodes
//! are appended after the yarn nodes.

use std::io::{self, Write};

use texgen_math::{Point3, Tolerance, Vec3};
use texgen_mesh::{ElementType, Mesh};
use texgen_textile::{Domain, Material, PointInfo};
use tracing::warn;

use crate::offsets::IndexOffsets;
use crate::periodic::{periodic_pairs, PeriodicPair};
use crate::settings::ExportSettings;
use crate::surfaces::{abaqus_connectivity, SurfaceFace, SurfaceMode, YarnSurfaces};

const AXES: [&str; 3] = ["X", "Y", "Z"];
const ORIENTATION: &str = "TexGenOrientations";
const INTERACTION: &str = "YarnContact";

/// One yarn's contribution to the deck.
#[derive(Debug, Clone)]
pub struct YarnPart {
    /// Set name prefix, e.g. `Yarn0`.
    pub name: String,
    /// Material constants.
    pub material: Material,
    /// Contact surfaces in local element numbering.
    pub surfaces: YarnSurfaces,
    /// Orientation and volume fraction of each solid element, in
    /// [`ElementType::FIXED`] order.
    pub element_info: Vec<PointInfo>,
}

impl YarnPart {
    fn material_name(&self) -> String {
        self.material
            .name
            .clone()
            .unwrap_or_else(|| format!("{}Material", self.name))
    }

    fn surface_names(&self, mode: SurfaceMode) -> (String, String) {
        match mode {
            SurfaceMode::UpperLower => (format!("{}-Upper", self.name), format!("{}-Lower", self.name)),
            SurfaceMode::Whole => (format!("{}-Surface", self.name), String::new()),
        }
    }
}

/// Everything needed to write one input file.
#[derive(Debug, Clone)]
pub struct Deck {
    /// Textile name written in the heading.
    pub title: String,
    /// All yarn meshes merged in yarn order, solids only.
    pub mesh: Mesh,
    /// Local to global numbering.
    pub offsets: IndexOffsets,
    /// Per-yarn data in yarn order.
    pub yarns: Vec<YarnPart>,
    /// Periodic domain.
    pub domain: Domain,
    /// Output options.
    pub settings: ExportSettings,
}

/// Node numbers of one rigid plate.
#[derive(Debug, Clone, Copy)]
struct Plate {
    corners: [usize; 4],
    reference: usize,
    element: usize,
}

impl Deck {
    /// Repeat vectors constrained by periodic equations.
    ///
    /// The plate-normal axis is left free when plates are written.
    pub fn periodic_repeats(&self) -> Vec<Vec3> {
        if self.settings.include_plates {
            self.domain.planar_repeats()
        } else {
            self.domain.axis_repeats().to_vec()
        }
    }

    /// Node pairs tied by periodic equations.
    pub fn periodic_pairs(&self) -> Vec<PeriodicPair> {
        periodic_pairs(
            self.mesh.nodes(),
            &self.periodic_repeats(),
            Tolerance::DEFAULT.linear,
        )
    }

    fn plates(&self) -> Option<[Plate; 2]> {
        if !self.settings.include_plates {
            return None;
        }
        let n = self.mesh.num_nodes();
        let e = self.offsets.total_elements();
        let plate = |first: usize, element: usize| Plate {
            corners: [first, first + 1, first + 2, first + 3],
            reference: first + 4,
            element,
        };
        Some([plate(n, e), plate(n + 5, e + 1)])
    }

    fn dummy_nodes(&self) -> Vec<usize> {
        let first = self.mesh.num_nodes() + if self.settings.include_plates { 10 } else { 0 };
        (0..self.periodic_repeats().len()).map(|i| first + i).collect()
    }

    /// Write the complete deck.
    pub fn write_to(&self, mut writer: impl Write) -> io::Result<()> {
        let pairs = self.periodic_pairs();
        self.write_heading(&mut writer, pairs.len())?;
        self.write_nodes(&mut writer)?;
        self.write_elements(&mut writer)?;
        self.write_sets(&mut writer)?;
        self.write_plates(&mut writer)?;
        self.write_orientations(&mut writer)?;
        self.write_materials(&mut writer)?;
        self.write_sections(&mut writer)?;
        self.write_surfaces(&mut writer)?;
        self.write_equations(&mut writer, &pairs)?;
        self.write_amplitudes(&mut writer)?;
        self.write_volume_fractions(&mut writer)?;
        self.write_steps(&mut writer)?;
        writer.flush()
    }

    fn write_heading(&self, w: &mut impl Write, pairs: usize) -> io::Result<()> {
        writeln!(w, "*Heading")?;
        writeln!(w, "** {}", self.title)?;
        writeln!(w, "** Generated by texgen {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(
            w,
            "** Yarns: {}, nodes: {}, elements: {}, periodic pairs: {}",
            self.yarns.len(),
            self.mesh.num_nodes(),
            self.offsets.total_elements(),
            pairs
        )?;
        writeln!(w, "*Preprint, echo=NO, model=NO, history=NO, contact=NO")
    }

    fn write_nodes(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "*Node")?;
        for (i, p) in self.mesh.nodes().iter().enumerate() {
            writeln!(w, "{}, {}, {}, {}", i + 1, p.x, p.y, p.z)?;
        }
        Ok(())
    }

    fn write_elements(&self, w: &mut impl Write) -> io::Result<()> {
        let mut first = 0;
        for kind in ElementType::ALL {
            let count = self.mesh.num_elements(kind);
            if count == 0 {
                continue;
            }
            let Some(name) = self.settings.element_type.abaqus_name(kind) else {
                warn!(kind = kind.name(), count, "element type not supported by the deck");
                first += count;
                continue;
            };
            writeln!(w, "*Element, Type={name}")?;
            for (i, nodes) in self.mesh.elements(kind).enumerate() {
                write!(w, "{}", first + i + 1)?;
                for n in abaqus_connectivity(kind, nodes) {
                    write!(w, ", {}", n + 1)?;
                }
                writeln!(w)?;
            }
            first += count;
        }
        Ok(())
    }

    fn write_sets(&self, w: &mut impl Write) -> io::Result<()> {
        for (y, part) in self.yarns.iter().enumerate() {
            writeln!(w, "*ElSet, ElSet={}, Generate", part.name)?;
            for kind in ElementType::ALL {
                let range = self.offsets.element_range(y, kind);
                if !range.is_empty() {
                    writeln!(w, "{}, {}, 1", range.start + 1, range.end)?;
                }
            }
            let nodes = self.offsets.node_range(y);
            if !nodes.is_empty() {
                writeln!(w, "*NSet, NSet={}Nodes, Generate", part.name)?;
                writeln!(w, "{}, {}, 1", nodes.start + 1, nodes.end)?;
            }
        }
        writeln!(w, "*ElSet, ElSet=AllYarns")?;
        let names: Vec<&str> = self.yarns.iter().map(|p| p.name.as_str()).collect();
        for chunk in names.chunks(8) {
            writeln!(w, "{}", chunk.join(", "))?;
        }
        Ok(())
    }

    fn write_plates(&self, w: &mut impl Write) -> io::Result<()> {
        let Some([top, bottom]) = self.plates() else {
            return Ok(());
        };
        let aabb = self.domain.aabb();
        let margin = self.domain.size() * 0.1;
        let (x0, x1) = (aabb.min.x - margin.x, aabb.max.x + margin.x);
        let (y0, y1) = (aabb.min.y - margin.y, aabb.max.y + margin.y);
        let cx = 0.5 * (aabb.min.x + aabb.max.x);
        let cy = 0.5 * (aabb.min.y + aabb.max.y);

        writeln!(w, "*Node")?;
        for (plate, z) in [(top, aabb.max.z), (bottom, aabb.min.z)] {
            // Counter-clockwise seen from +z, so the normal points up
            let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
            for (n, (x, y)) in plate.corners.iter().zip(corners) {
                writeln!(w, "{}, {}, {}, {}", n + 1, x, y, z)?;
            }
            writeln!(w, "{}, {}, {}, {}", plate.reference + 1, cx, cy, z)?;
        }

        for (plate, name) in [(top, "PlateTop"), (bottom, "PlateBottom")] {
            writeln!(w, "*Element, Type=R3D4, ElSet={name}")?;
            let c = plate.corners;
            writeln!(
                w,
                "{}, {}, {}, {}, {}",
                plate.element + 1,
                c[0] + 1,
                c[1] + 1,
                c[2] + 1,
                c[3] + 1
            )?;
            writeln!(w, "*NSet, NSet={name}Ref")?;
            writeln!(w, "{}", plate.reference + 1)?;
            writeln!(w, "*Rigid Body, Ref Node={name}Ref, ElSet={name}")?;
        }
        writeln!(w, "*Surface, Type=Element, Name=PlateTop-Surface")?;
        writeln!(w, "{}, SNEG", top.element + 1)?;
        writeln!(w, "*Surface, Type=Element, Name=PlateBottom-Surface")?;
        writeln!(w, "{}, SPOS", bottom.element + 1)
    }

    fn element_info(&self) -> impl Iterator<Item = (usize, &PointInfo)> + '_ {
        self.yarns.iter().enumerate().flat_map(move |(y, part)| {
            let globals = ElementType::FIXED.iter().flat_map(move |&kind| self.offsets.element_range(y, kind));
            globals.zip(&part.element_info)
        })
    }

    fn write_orientations(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "*Distribution Table, Name={ORIENTATION}_Table")?;
        writeln!(w, "COORD3D, COORD3D")?;
        writeln!(
            w,
            "*Distribution, Name={ORIENTATION}_Vectors, Location=Element, Table={ORIENTATION}_Table"
        )?;
        writeln!(w, ", 1.0, 0.0, 0.0, 0.0, 1.0, 0.0")?;
        for (g, info) in self.element_info() {
            if info.yarn.is_none() {
                continue;
            }
            // Local 1 along the yarn, local 3 along the section's up vector
            let a = info.tangent;
            let b = info.up.cross(&info.tangent);
            writeln!(
                w,
                "{}, {}, {}, {}, {}, {}, {}",
                g + 1,
                a.x,
                a.y,
                a.z,
                b.x,
                b.y,
                b.z
            )?;
        }
        writeln!(w, "*Orientation, Name={ORIENTATION}, Definition=Distribution")?;
        writeln!(w, "{ORIENTATION}_Vectors")
    }

    fn write_materials(&self, w: &mut impl Write) -> io::Result<()> {
        for part in &self.yarns {
            let m = &part.material;
            writeln!(w, "*Material, Name={}", part.material_name())?;
            writeln!(w, "*Density")?;
            writeln!(w, "{},", m.density)?;
            // State variable 1 holds the fibre volume fraction
            writeln!(w, "*Depvar")?;
            writeln!(w, "1,")?;
            if m.is_engineering_constants() {
                writeln!(w, "*Elastic, Type=ENGINEERING CONSTANTS")?;
            } else {
                writeln!(w, "*Elastic")?;
            }
            write_values(w, &m.elastic)?;
            if !m.expansion.is_empty() {
                if m.expansion.len() >= 3 {
                    writeln!(w, "*Expansion, Type=ORTHO")?;
                } else {
                    writeln!(w, "*Expansion")?;
                }
                write_values(w, &m.expansion)?;
            }
        }
        Ok(())
    }

    fn write_sections(&self, w: &mut impl Write) -> io::Result<()> {
        for part in &self.yarns {
            writeln!(
                w,
                "*Solid Section, ElSet={}, Material={}, Orientation={ORIENTATION}",
                part.name,
                part.material_name()
            )?;
            writeln!(w, "1.0,")?;
        }
        Ok(())
    }

    fn write_surface(&self, w: &mut impl Write, y: usize, name: &str, faces: &[SurfaceFace]) -> io::Result<()> {
        if faces.is_empty() {
            return Ok(());
        }
        writeln!(w, "*Surface, Type=Element, Name={name}")?;
        for face in faces {
            if let Some(g) = self.offsets.global_element_index(y, face.kind, face.element) {
                writeln!(w, "{}, {}", g + 1, face.label())?;
            }
        }
        Ok(())
    }

    fn write_surfaces(&self, w: &mut impl Write) -> io::Result<()> {
        let mode = self.settings.surface_mode;
        for (y, part) in self.yarns.iter().enumerate() {
            let (upper, lower) = part.surface_names(mode);
            self.write_surface(w, y, &upper, &part.surfaces.upper)?;
            if mode == SurfaceMode::UpperLower {
                self.write_surface(w, y, &lower, &part.surfaces.lower)?;
            }
        }
        writeln!(w, "*Surface Interaction, Name={INTERACTION}")?;
        writeln!(w, "*Friction")?;
        writeln!(w, "0.0,")
    }

    /// Slave/master surface pairs for contact.
    pub fn contact_pairs(&self) -> Vec<(String, String)> {
        let mode = self.settings.surface_mode;
        let named: Vec<((String, bool), (String, bool))> = self
            .yarns
            .iter()
            .map(|p| {
                let (upper, lower) = p.surface_names(mode);
                (
                    (upper, !p.surfaces.upper.is_empty()),
                    (lower, !p.surfaces.lower.is_empty()),
                )
            })
            .collect();

        let mut pairs = Vec::new();
        let mut push = |a: &(String, bool), b: &(String, bool)| {
            if a.1 && b.1 {
                pairs.push((a.0.clone(), b.0.clone()));
            }
        };
        for i in 0..named.len() {
            for j in i + 1..named.len() {
                let (ui, li) = &named[i];
                let (uj, lj) = &named[j];
                match mode {
                    SurfaceMode::Whole => push(ui, uj),
                    SurfaceMode::UpperLower => {
                        push(ui, lj);
                        push(li, uj);
                    }
                }
            }
        }
        if self.settings.include_plates {
            let top = ("PlateTop-Surface".to_string(), true);
            let bottom = ("PlateBottom-Surface".to_string(), true);
            for (upper, lower) in &named {
                push(upper, &top);
                match mode {
                    SurfaceMode::Whole => push(upper, &bottom),
                    SurfaceMode::UpperLower => push(lower, &bottom),
                }
            }
        }
        pairs
    }

    fn write_equations(&self, w: &mut impl Write, pairs: &[PeriodicPair]) -> io::Result<()> {
        let dummies = self.dummy_nodes();
        if dummies.is_empty() {
            return Ok(());
        }
        let aabb = self.domain.aabb();
        let size = self.domain.size();
        writeln!(w, "*Node")?;
        for (axis, &n) in dummies.iter().enumerate() {
            let p = aabb.max + size * (0.2 * (axis + 1) as f64);
            writeln!(w, "{}, {}, {}, {}", n + 1, p.x, p.y, p.z)?;
        }
        for (axis, &n) in dummies.iter().enumerate() {
            writeln!(w, "*NSet, NSet=Dummy{}", AXES[axis])?;
            writeln!(w, "{}", n + 1)?;
        }
        for pair in pairs {
            let dummy = dummies[pair.axis] + 1;
            for dof in 1..=3 {
                writeln!(w, "*Equation")?;
                writeln!(w, "3")?;
                writeln!(
                    w,
                    "{}, {dof}, 1.0, {}, {dof}, -1.0, {dummy}, {dof}, -1.0",
                    pair.dependent + 1,
                    pair.independent + 1
                )?;
            }
        }
        Ok(())
    }

    fn step_count(&self) -> usize {
        self.settings.deformation_steps.len().max(1)
    }

    /// Total displacement of each dummy axis and of the top plate at the
    /// end of every step.
    fn step_targets(&self) -> Vec<([f64; 3], f64)> {
        let size = self.domain.size();
        (0..self.step_count())
            .map(|k| {
                let strain = self
                    .settings
                    .deformation_steps
                    .get(k)
                    .map(|s| s.strain)
                    .unwrap_or_default();
                let axes = [strain[0] * size.x, strain[1] * size.y, strain[2] * size.z];
                (axes, -self.settings.plate_displacement * (k + 1) as f64)
            })
            .collect()
    }

    fn write_amplitudes(&self, w: &mut impl Write) -> io::Result<()> {
        let targets = self.step_targets();
        let time = self.settings.step_time;
        let write_amplitude = |w: &mut dyn Write, name: &str, values: Vec<f64>| -> io::Result<()> {
            writeln!(w, "*Amplitude, Name={name}, Definition=Smooth Step, Time=Total Time")?;
            let mut points = vec![0.0, 0.0];
            for (k, v) in values.into_iter().enumerate() {
                points.push(time * (k + 1) as f64);
                points.push(v);
            }
            write_values(w, &points)
        };
        for axis in 0..self.dummy_nodes().len() {
            let values = targets.iter().map(|(axes, _)| axes[axis]).collect();
            write_amplitude(&mut *w, &format!("Strain{}", AXES[axis]), values)?;
        }
        if self.settings.include_plates {
            let values = targets.iter().map(|(_, plate)| *plate).collect();
            write_amplitude(&mut *w, "PlateTravel", values)?;
        }
        Ok(())
    }

    fn write_volume_fractions(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "*Initial Conditions, Type=Solution")?;
        for (g, info) in self.element_info() {
            writeln!(w, "{}, {}", g + 1, info.volume_fraction)?;
        }
        Ok(())
    }

    fn write_boundaries(&self, w: &mut impl Write) -> io::Result<()> {
        for axis in 0..self.dummy_nodes().len() {
            let name = AXES[axis];
            writeln!(w, "*Boundary, Amplitude=Strain{name}")?;
            writeln!(w, "Dummy{name}, {}, {}, 1.0", axis + 1, axis + 1)?;
            writeln!(w, "*Boundary")?;
            for dof in (1..=3).filter(|&d| d != axis + 1) {
                writeln!(w, "Dummy{name}, {dof}, {dof}")?;
            }
        }
        if self.settings.include_plates {
            writeln!(w, "*Boundary")?;
            writeln!(w, "PlateBottomRef, 1, 6")?;
            writeln!(w, "PlateTopRef, 1, 2")?;
            writeln!(w, "PlateTopRef, 4, 6")?;
            writeln!(w, "*Boundary, Amplitude=PlateTravel")?;
            writeln!(w, "PlateTopRef, 3, 3, 1.0")?;
        }
        Ok(())
    }

    fn write_steps(&self, w: &mut impl Write) -> io::Result<()> {
        for k in 0..self.step_count() {
            writeln!(w, "*Step, Name=Step-{}, NlGeom=YES", k + 1)?;
            writeln!(w, "*Dynamic, Explicit")?;
            writeln!(w, ", {}", self.settings.step_time)?;
            if self.settings.mass_scaling > 1.0 {
                writeln!(w, "*Fixed Mass Scaling, Factor={}", self.settings.mass_scaling)?;
            }
            if k == 0 {
                let pairs = self.contact_pairs();
                if !pairs.is_empty() {
                    writeln!(
                        w,
                        "*Contact Pair, Interaction={INTERACTION}, Mechanical Constraint=Penalty"
                    )?;
                    for (slave, master) in pairs {
                        writeln!(w, "{slave}, {master}")?;
                    }
                }
                self.write_boundaries(w)?;
            }
            writeln!(w, "*Output, Field, Number Interval=20")?;
            writeln!(w, "*Node Output")?;
            writeln!(w, "U, RF")?;
            writeln!(w, "*Element Output")?;
            writeln!(w, "S, LE, SDV")?;
            writeln!(w, "*End Step")?;
        }
        Ok(())
    }
}

/// Comma separated values, eight per line.
fn write_values(w: &mut (impl Write + ?Sized), values: &[f64]) -> io::Result<()> {
    for chunk in values.chunks(8) {
        let line: Vec<String> = chunk.iter().map(|v| v.to_string()).collect();
        writeln!(w, "{},", line.join(", "))?;
    }
    Ok(())
}

/// Centroid of every solid element, in [`ElementType::FIXED`] order.
pub fn element_centroids(mesh: &Mesh) -> Vec<Point3> {
    ElementType::FIXED
        .iter()
        .flat_map(|&kind| {
            mesh.elements(kind)
                .map(|e| texgen_math::centroid(&mesh.element_points(e)).unwrap_or_else(Point3::origin))
                .collect::<Vec<_>>()
        })
        .collect()
}
