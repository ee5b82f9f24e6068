//! Fibre distribution and material constants.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Relation between yarn cross-section area and fibre volume fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FibreModel {
    /// A fixed bundle of fibres packed into whatever area the section has.
    FixedFibreArea {
        /// Number of fibres in the yarn.
        fibre_count: usize,
        /// Fibre diameter in model units.
        fibre_diameter: f64,
    },
    /// Volume fraction proportional to section area.
    ArealDensity {
        /// Volume fraction per unit section area.
        density: f64,
    },
}

impl Default for FibreModel {
    fn default() -> Self {
        FibreModel::FixedFibreArea {
            fibre_count: 12000,
            fibre_diameter: 0.007,
        }
    }
}

impl FibreModel {
    /// Fibre volume fraction for a cross section of the given area.
    ///
    /// Returns 0 for non-positive areas.
    pub fn volume_fraction(&self, area: f64) -> f64 {
        if area <= 0.0 {
            return 0.0;
        }
        match *self {
            FibreModel::FixedFibreArea {
                fibre_count,
                fibre_diameter,
            } => fibre_count as f64 * 0.25 * PI * fibre_diameter * fibre_diameter / area,
            FibreModel::ArealDensity { density } => density * area,
        }
    }
}

/// Elastic and thermal expansion constants of a yarn material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Name used for the `*Material` block; defaults to the yarn name.
    pub name: Option<String>,
    /// Elastic constants; up to two means isotropic `E, nu`.
    pub elastic: Vec<f64>,
    /// Thermal expansion coefficients.
    pub expansion: Vec<f64>,
    /// Mass density, required by explicit dynamics.
    pub density: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            elastic: vec![1.0, 0.2],
            expansion: vec![0.0],
            density: 1.0,
        }
    }
}

impl Material {
    /// True when the constants describe an orthotropic material.
    pub fn is_engineering_constants(&self) -> bool {
        self.elastic.len() > 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_fibre_area() {
        let model = FibreModel::FixedFibreArea {
            fibre_count: 100,
            fibre_diameter: 0.1,
        };
        let fibre_area = 100.0 * 0.25 * PI * 0.01;
        assert_relative_eq!(model.volume_fraction(fibre_area * 2.0), 0.5);
        assert_eq!(model.volume_fraction(0.0), 0.0);
    }

    #[test]
    fn test_areal_density_tracks_area() {
        let model = FibreModel::ArealDensity { density: 2.0 };
        assert_relative_eq!(model.volume_fraction(0.25), 0.5);
        assert!(model.volume_fraction(0.2) < model.volume_fraction(0.25));
    }

    #[test]
    fn test_material_kind() {
        assert!(!Material::default().is_engineering_constants());
        let ortho = Material {
            elastic: vec![1.0; 9],
            ..Material::default()
        };
        assert!(ortho.is_engineering_constants());
    }
}
