#![warn(missing_docs)]

//! Textile model for the TexGen mesh core.
//!
//! A [`Textile`] is a set of [`Yarn`]s inside a periodic [`Domain`]. Each
//! yarn follows a polyline centreline sampled into [`SlaveNode`]s that carry
//! a local frame and a 2D cross section. The crate generates yarn volume
//! meshes, detects interference between yarns, reports orientation and
//! fibre volume fraction at arbitrary points and loads textiles from TOML
//! or JSON descriptions.

pub mod config;
pub mod domain;
pub mod error;
pub mod fibre;
pub mod interference;
pub mod mesher;
pub mod section;
pub mod textile;
pub mod yarn;

pub use config::{DomainConfig, TextileConfig, YarnConfig};
pub use domain::Domain;
pub use error::{Result, TextileError};
pub use fibre::{FibreModel, Material};
pub use interference::{InterferenceReport, InterferenceSource};
pub use section::{polygon_area, Section};
pub use textile::{PointInfo, Textile};
pub use yarn::{SlaveNode, Yarn, YarnLocation, YarnResolution};
