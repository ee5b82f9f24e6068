//! Error types for mesh interference correction.

use texgen_mesh::MeshError;
use texgen_textile::TextileError;
use thiserror::Error;

/// Errors that abort an interference correction.
#[derive(Error, Debug)]
pub enum AdjustError {
    /// The textile has no domain to mesh against.
    #[error("textile has no domain")]
    NoDomain,

    /// The textile has no yarns.
    #[error("textile has no yarns")]
    NoYarns,

    /// The number of yarn meshes differs from the number of yarns.
    #[error("{meshes} yarn meshes supplied for {yarns} yarns")]
    YarnCountMismatch {
        /// Yarns in the textile.
        yarns: usize,
        /// Meshes supplied.
        meshes: usize,
    },

    /// A yarn volume mesh could not be generated.
    #[error("failed to generate mesh for yarn {yarn}: {source}")]
    MeshGeneration {
        /// Yarn index.
        yarn: usize,
        /// Underlying failure.
        #[source]
        source: TextileError,
    },

    /// A yarn produced no elements.
    #[error("yarn {0} produced an empty mesh")]
    EmptyMesh(usize),

    /// Moving a node far enough would collapse its element.
    #[error(
        "yarn {yarn}: node {node} must move {required} but only {available} is available"
    )]
    NodeTravelExceeded {
        /// Yarn index.
        yarn: usize,
        /// Node index in the yarn mesh.
        node: usize,
        /// Half of the interference depth.
        required: f64,
        /// Distance to the interpolation node, less the wedge margin.
        available: f64,
    },

    /// A node was moved before an interpolation node was selected.
    #[error("yarn {yarn}: node {node} has no interpolation node")]
    NoInterpolationNode {
        /// Yarn index.
        yarn: usize,
        /// Node index in the yarn mesh.
        node: usize,
    },

    /// Refinement did not reach a fixed point.
    #[error("interference refinement did not converge after {passes} passes")]
    ConvergenceTimeout {
        /// Passes performed.
        passes: usize,
    },

    /// Section remapping requested before any adjustment snapshot exists.
    #[error("no uncorrected mesh snapshot; run adjust_mesh first")]
    MissingSnapshot,

    /// Invalid settings value.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Mesh operation failed.
    #[error("mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// Textile operation failed.
    #[error("textile error: {0}")]
    Textile(#[from] TextileError),
}

/// Result type for interference correction.
pub type Result<T> = std::result::Result<T, AdjustError>;
