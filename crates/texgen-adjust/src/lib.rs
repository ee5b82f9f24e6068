#![warn(missing_docs)]

//! Interference correction for TexGen yarn volume meshes.
//!
//! Yarn meshes generated independently from their centrelines may overlap
//! where yarns cross. This crate moves the offending surface nodes inwards
//! until the yarns only touch, then maps the corrected surfaces back onto
//! the yarns as adjusted cross sections.
//!
//! # Example
//!
//! ```ignore
//! use texgen_adjust::InterferenceResolver;
//!
//! let mut meshes = InterferenceResolver::create_volume_meshes(&textile)?;
//! let mut resolver = InterferenceResolver::new();
//! resolver.adjust_mesh(&textile, &mut meshes, 1e-4)?;
//! resolver.adjust_section_meshes(&mut textile, &meshes)?;
//! ```

pub mod error;
pub mod intersection;
pub mod resolver;
pub mod sections;

pub use error::{AdjustError, Result};
pub use intersection::{IntersectionPoint, RingNeighbours};
pub use resolver::InterferenceResolver;
pub use sections::{compare_sections, find_mesh_polygon_sections, SectionMatch};

use serde::{Deserialize, Serialize};

/// Interference correction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustSettings {
    /// Interference depth accepted without correction.
    pub tolerance: f64,
    /// Refinement passes allowed before giving up.
    pub max_passes: usize,
}

impl Default for AdjustSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_passes: 1000,
        }
    }
}

impl AdjustSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(AdjustError::InvalidSettings(
                "tolerance must be positive".into(),
            ));
        }
        if self.max_passes == 0 {
            return Err(AdjustError::InvalidSettings(
                "max_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
