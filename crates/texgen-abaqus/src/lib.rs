#![warn(missing_docs)]

//! ABAQUS input file export for TexGen yarn assemblies.
//!
//! Every yarn of a textile is meshed into hexahedra and wedges, optionally
//! corrected for interference, and merged into one deck with per-element
//! orientations, fibre volume fractions, contact surfaces and periodic
//! boundary equations.
//!
//! # Example
//!
//! ```ignore
//! use texgen_abaqus::{AssemblyExporter, ExportSettings};
//!
//! let settings = ExportSettings {
//!     adjust_mesh: true,
//!     ..Default::default()
//! };
//! AssemblyExporter::new().create_abaqus_input_file(&mut textile, "plain.inp", &settings)?;
//! ```

pub mod deck;
pub mod error;
pub mod exporter;
pub mod offsets;
pub mod periodic;
pub mod settings;
pub mod surfaces;
pub mod volume_fraction;

pub use deck::{Deck, YarnPart};
pub use error::{AbaqusError, Result};
pub use exporter::AssemblyExporter;
pub use offsets::IndexOffsets;
pub use periodic::PeriodicPair;
pub use settings::{DeformationStep, ElementIntegration, ExportSettings};
pub use surfaces::{SurfaceFace, SurfaceMode, YarnSurfaces};
