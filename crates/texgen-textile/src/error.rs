//! Error types for the textile model.

use thiserror::Error;
use texgen_mesh::MeshError;

/// Errors raised while building, meshing or loading a textile.
#[derive(Error, Debug)]
pub enum TextileError {
    /// Yarn definition cannot be meshed.
    #[error("invalid yarn {yarn}: {reason}")]
    InvalidYarn {
        /// Yarn index.
        yarn: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Centreline cannot define a yarn path.
    #[error("invalid centreline: {0}")]
    InvalidCentreline(String),

    /// Mesh resolution is out of range.
    #[error("invalid resolution: {0}")]
    InvalidResolution(String),

    /// Cross-section definition is unusable.
    #[error("invalid section: {0}")]
    InvalidSection(String),

    /// Operation needs a domain but none is assigned.
    #[error("textile has no domain")]
    NoDomain,

    /// Configuration file is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Mesh construction failed.
    #[error("mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// I/O error while reading a configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for textile operations.
pub type Result<T> = std::result::Result<T, TextileError>;
