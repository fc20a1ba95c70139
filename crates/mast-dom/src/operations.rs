//! DOM Node Operations
//!
//! Error type shared by the tree mutation methods.

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found (never existed or already removed)
    #[error("Node not found")]
    NotFound,
    /// Hierarchy error (e.g., inserting an ancestor into its descendant)
    #[error("Hierarchy request error")]
    HierarchyRequest,
    /// Invalid node type (e.g., appending into a text node)
    #[error("Invalid node type")]
    InvalidNodeType,
    /// Reference node is not a child of the given parent
    #[error("Node is not a child")]
    NotAChild,
}
