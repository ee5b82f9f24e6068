//! Contact surface definitions derived from yarn boundary faces.

use serde::{Deserialize, Serialize};
use texgen_math::{Tolerance, Vec3};
use texgen_mesh::{BoundaryFace, ElementType, Mesh};
use tracing::debug;

use crate::periodic::boundary_nodes;

/// How yarn boundary faces are grouped into contact surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceMode {
    /// Separate surfaces for faces pointing up and down.
    #[default]
    UpperLower,
    /// One surface per yarn.
    Whole,
}

/// One element face of a contact surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFace {
    /// Type of the owning element.
    pub kind: ElementType,
    /// Local index of the owning element in its yarn.
    pub element: usize,
    /// ABAQUS face number, 1-based.
    pub face: usize,
}

impl SurfaceFace {
    /// Face label as written in a surface definition.
    pub fn label(&self) -> String {
        format!("S{}", self.face)
    }
}

/// Contact surfaces of one yarn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YarnSurfaces {
    /// Faces with an upward outward normal, or every face in whole mode.
    pub upper: Vec<SurfaceFace>,
    /// Faces with a downward outward normal; empty in whole mode.
    pub lower: Vec<SurfaceFace>,
}

impl YarnSurfaces {
    /// Total number of faces.
    pub fn len(&self) -> usize {
        self.upper.len() + self.lower.len()
    }

    /// True when no face qualified.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// ABAQUS face number of local face `face` of a `kind` element.
///
/// Wedges are written with their two triangles exchanged so that the
/// element volume is positive, which swaps faces 0 and 1.
pub fn abaqus_face_number(kind: ElementType, face: usize) -> usize {
    match (kind, face) {
        (ElementType::Wedge, 0) => 2,
        (ElementType::Wedge, 1) => 1,
        _ => face + 1,
    }
}

/// Node order of an element as written to the deck.
pub fn abaqus_connectivity(kind: ElementType, nodes: &[usize]) -> Vec<usize> {
    match kind {
        ElementType::Wedge if nodes.len() == 6 => {
            vec![nodes[3], nodes[4], nodes[5], nodes[0], nodes[1], nodes[2]]
        }
        _ => nodes.to_vec(),
    }
}

fn surface_face(face: &BoundaryFace) -> SurfaceFace {
    SurfaceFace {
        kind: face.kind,
        element: face.element,
        face: abaqus_face_number(face.kind, face.face),
    }
}

/// Contact surfaces of a yarn volume mesh.
///
/// Faces whose nodes all have a periodic partner under `repeats` lie on
/// the cut between periodic copies and are left out.
pub fn yarn_surfaces(mesh: &Mesh, repeats: &[Vec3], mode: SurfaceMode) -> YarnSurfaces {
    let mut solids = mesh.clone();
    solids.remove_element_type(ElementType::Polygon);
    solids.remove_unreferenced_nodes();

    let on_boundary = boundary_nodes(solids.nodes(), repeats, Tolerance::DEFAULT.linear);
    let mut surfaces = YarnSurfaces::default();
    let mut skipped = 0;
    for face in solids.boundary_faces() {
        if face.nodes.iter().all(|&n| on_boundary[n]) {
            skipped += 1;
            continue;
        }
        let entry = surface_face(&face);
        match mode {
            SurfaceMode::Whole => surfaces.upper.push(entry),
            SurfaceMode::UpperLower => {
                if solids.outward_normal(&face).z > 0.0 {
                    surfaces.upper.push(entry);
                } else {
                    surfaces.lower.push(entry);
                }
            }
        }
    }
    debug!(
        upper = surfaces.upper.len(),
        lower = surfaces.lower.len(),
        skipped,
        "derived yarn surfaces"
    );
    surfaces
}
