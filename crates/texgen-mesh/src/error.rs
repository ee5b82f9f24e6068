//! Error types for mesh construction.

use thiserror::Error;

use crate::ElementType;

/// Errors that can occur while building or editing a mesh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Element index list has the wrong length for its type.
    #[error("{kind:?} element needs {expected} nodes, got {got}")]
    InvalidNodeCount {
        /// Element type being added.
        kind: ElementType,
        /// Nodes required by the type.
        expected: usize,
        /// Nodes supplied.
        got: usize,
    },

    /// Element refers to a node that does not exist.
    #[error("node index {index} out of range (mesh has {count} nodes)")]
    NodeIndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of nodes in the mesh.
        count: usize,
    },

    /// Polygon ring with fewer than three distinct nodes.
    #[error("polygon ring has only {0} nodes")]
    DegenerateRing(usize),

    /// Flat polygon sequence whose ring starting at the given position never closes.
    #[error("polygon ring starting at position {0} is not closed")]
    UnclosedRing(usize),

    /// Fixed-size storage requested for a variable-length element type.
    #[error("{0:?} elements have no fixed node count")]
    VariableLength(ElementType),
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
