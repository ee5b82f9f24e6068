//! Error types for ABAQUS export.

use texgen_adjust::AdjustError;
use texgen_textile::TextileError;
use thiserror::Error;

/// Errors that abort an export.
#[derive(Error, Debug)]
pub enum AbaqusError {
    /// The textile has no domain.
    #[error("textile has no domain")]
    NoDomain,

    /// The textile has no yarns.
    #[error("textile has no yarns")]
    NoYarns,

    /// Invalid settings value.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Interference correction failed.
    #[error("mesh adjustment failed: {0}")]
    Adjust(#[from] AdjustError),

    /// Textile query failed.
    #[error("textile error: {0}")]
    Textile(#[from] TextileError),

    /// Writing the deck failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ABAQUS export.
pub type Result<T> = std::result::Result<T, AbaqusError>;
