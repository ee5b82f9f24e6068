//! Export options.

use serde::{Deserialize, Serialize};
use texgen_adjust::AdjustSettings;
use texgen_mesh::ElementType;

use crate::error::{AbaqusError, Result};
use crate::surfaces::SurfaceMode;

/// Integration scheme of the hexahedral elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementIntegration {
    /// Full integration (`C3D8`).
    #[default]
    Full,
    /// Reduced integration (`C3D8R`).
    Reduced,
}

impl ElementIntegration {
    /// ABAQUS element name for `kind`, `None` for types not written.
    pub fn abaqus_name(self, kind: ElementType) -> Option<&'static str> {
        match (kind, self) {
            (ElementType::Hex, ElementIntegration::Full) => Some("C3D8"),
            (ElementType::Hex, ElementIntegration::Reduced) => Some("C3D8R"),
            (ElementType::Wedge, _) => Some("C3D6"),
            _ => None,
        }
    }
}

/// Imposed strain of one analysis step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformationStep {
    /// Strain along each domain axis, applied through the periodic dummy nodes.
    pub strain: [f64; 3],
}

/// Options for [`crate::AssemblyExporter::create_abaqus_input_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Rebuild the yarn meshes from the corrected sections after adjustment.
    pub regenerate_mesh: bool,
    /// Hex element integration.
    pub element_type: ElementIntegration,
    /// Correct yarn interference before export.
    pub adjust_mesh: bool,
    /// Interference depth accepted without correction.
    pub tolerance: f64,
    /// Refinement passes allowed during correction.
    pub max_adjust_passes: usize,
    /// Grouping of yarn faces into contact surfaces.
    pub surface_mode: SurfaceMode,
    /// Add rigid compression plates above and below the domain.
    pub include_plates: bool,
    /// Downward travel of the top plate over each step.
    pub plate_displacement: f64,
    /// Duration of each explicit step.
    pub step_time: f64,
    /// Fixed mass scaling factor; 1 disables scaling.
    pub mass_scaling: f64,
    /// Analysis steps; one unloaded step is written when empty.
    pub deformation_steps: Vec<DeformationStep>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            regenerate_mesh: false,
            element_type: ElementIntegration::Full,
            adjust_mesh: false,
            tolerance: 1e-4,
            max_adjust_passes: 1000,
            surface_mode: SurfaceMode::UpperLower,
            include_plates: false,
            plate_displacement: 0.0,
            step_time: 1.0,
            mass_scaling: 1.0,
            deformation_steps: Vec::new(),
        }
    }
}

impl ExportSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(AbaqusError::InvalidSettings(
                "tolerance must be positive".into(),
            ));
        }
        if self.max_adjust_passes == 0 {
            return Err(AbaqusError::InvalidSettings(
                "max_adjust_passes must be at least 1".into(),
            ));
        }
        if self.step_time.is_nan() || self.step_time <= 0.0 {
            return Err(AbaqusError::InvalidSettings(
                "step_time must be positive".into(),
            ));
        }
        if self.mass_scaling.is_nan() || self.mass_scaling < 1.0 {
            return Err(AbaqusError::InvalidSettings(
                "mass_scaling must be at least 1".into(),
            ));
        }
        if !self.plate_displacement.is_finite() {
            return Err(AbaqusError::InvalidSettings(
                "plate_displacement must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Settings for the interference resolver.
    pub fn adjust_settings(&self) -> AdjustSettings {
        AdjustSettings {
            tolerance: self.tolerance,
            max_passes: self.max_adjust_passes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = ExportSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.adjust_settings().validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let bad = [
            ExportSettings {
                tolerance: -1.0,
                ..Default::default()
            },
            ExportSettings {
                step_time: 0.0,
                ..Default::default()
            },
            ExportSettings {
                mass_scaling: 0.5,
                ..Default::default()
            },
            ExportSettings {
                max_adjust_passes: 0,
                ..Default::default()
            },
            ExportSettings {
                plate_displacement: f64::NAN,
                ..Default::default()
            },
        ];
        for settings in bad {
            assert!(matches!(
                settings.validate(),
                Err(AbaqusError::InvalidSettings(_))
            ));
        }
    }

    #[test]
    fn test_element_names() {
        let full = ElementIntegration::Full;
        let reduced = ElementIntegration::Reduced;
        assert_eq!(full.abaqus_name(ElementType::Hex), Some("C3D8"));
        assert_eq!(reduced.abaqus_name(ElementType::Hex), Some("C3D8R"));
        assert_eq!(reduced.abaqus_name(ElementType::Wedge), Some("C3D6"));
        assert_eq!(full.abaqus_name(ElementType::Polygon), None);
    }

    #[test]
    fn test_settings_from_json() {
        let settings: ExportSettings = serde_json::from_str(
            r#"{
                "element_type": "reduced",
                "surface_mode": "whole",
                "adjust_mesh": true,
                "deformation_steps": [{ "strain": [0.0, 0.0, -0.1] }]
            }"#,
        )
        .unwrap();
        assert_eq!(settings.element_type, ElementIntegration::Reduced);
        assert_eq!(settings.surface_mode, SurfaceMode::Whole);
        assert!(settings.adjust_mesh);
        assert_eq!(settings.deformation_steps[0].strain[2], -0.1);
        assert_eq!(settings.tolerance, 1e-4);
    }
}
