//! Textile description files (TOML or JSON).
//!
//! ```toml
//! name = "plain"
//!
//! [domain]
//! min = [0.0, 0.0, -0.3]
//! max = [2.0, 2.0, 0.3]
//!
//! [[yarns]]
//! nodes = [[0.0, 0.5, 0.05], [1.0, 0.5, -0.05], [2.0, 0.5, 0.05]]
//! section = { shape = "ellipse", width = 0.8, height = 0.15 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use texgen_math::{Point3, Vec3};
use tracing::debug;

use crate::domain::Domain;
use crate::error::{Result, TextileError};
use crate::fibre::{FibreModel, Material};
use crate::section::Section;
use crate::textile::Textile;
use crate::yarn::{Yarn, YarnResolution};

/// Domain corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
}

/// One yarn of a textile description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YarnConfig {
    /// Centreline nodes.
    pub nodes: Vec<[f64; 3]>,
    /// Cross section.
    pub section: Section,
    /// Mesh resolution.
    #[serde(default)]
    pub resolution: YarnResolution,
    /// Repeat vectors; omitted means the domain's x and y edges.
    #[serde(default)]
    pub repeats: Option<Vec<[f64; 3]>>,
    /// Preferred section up direction.
    #[serde(default)]
    pub up: Option<[f64; 3]>,
    /// Fibre distribution.
    #[serde(default)]
    pub fibres: FibreModel,
    /// Material constants.
    #[serde(default)]
    pub material: Material,
}

/// Complete textile description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextileConfig {
    /// Textile name.
    #[serde(default)]
    pub name: String,
    /// Unit-cell domain.
    #[serde(default)]
    pub domain: Option<DomainConfig>,
    /// Yarns in order.
    pub yarns: Vec<YarnConfig>,
}

fn point(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

fn vector(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

impl TextileConfig {
    /// Parse a TOML description.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Parse a JSON description.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read a description file; `.json` is parsed as JSON, anything else as TOML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        debug!(path = %path.display(), json = is_json, "reading textile description");
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Build the textile.
    pub fn build(&self) -> Result<Textile> {
        if self.yarns.is_empty() {
            return Err(TextileError::Config("no yarns defined".into()));
        }
        let domain = self
            .domain
            .as_ref()
            .map(|d| Domain::new(point(d.min), point(d.max)))
            .transpose()?;

        let mut textile = Textile::new(if self.name.is_empty() {
            "textile"
        } else {
            self.name.as_str()
        });
        for (i, yc) in self.yarns.iter().enumerate() {
            let wrap = |e: TextileError| TextileError::InvalidYarn {
                yarn: i,
                reason: e.to_string(),
            };
            let nodes = yc.nodes.iter().copied().map(point).collect();
            let mut yarn = Yarn::new(nodes, yc.section.clone()).map_err(wrap)?;
            yarn.set_resolution(yc.resolution).map_err(wrap)?;
            if let Some(up) = yc.up {
                yarn.set_up_hint(vector(up));
            }
            let repeats = match (&yc.repeats, &domain) {
                (Some(r), _) => r.iter().copied().map(vector).collect(),
                (None, Some(d)) => d.planar_repeats(),
                (None, None) => Vec::new(),
            };
            yarn.set_repeats(repeats);
            yarn.set_fibres(yc.fibres.clone());
            yarn.set_material(yc.material.clone());
            textile.add_yarn(yarn);
        }
        if let Some(d) = domain {
            textile.set_domain(d);
        }
        Ok(textile)
    }
}
