//! DOM operation errors
//!
//! Every public mutating or query operation reports failure through
//! `DomResult`. Validation always happens before the tree is touched.

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM exception kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Missing or foreign node argument
    #[error("NotFoundError: the node was not found")]
    NotFound,

    /// Disallowed parent/child combination or cyclic insertion
    #[error("HierarchyRequestError: the operation would yield an incorrect node tree")]
    HierarchyRequest,

    /// Boundary points live in different trees
    #[error("WrongDocumentError: the nodes are not in the same tree")]
    WrongDocument,

    /// Offset out of bounds for the container
    #[error("IndexSizeError: the offset is out of range")]
    IndexSize,

    /// Node kind is not allowed here
    #[error("InvalidNodeTypeError: the node type is not supported here")]
    InvalidNodeType,

    /// Object is not in a usable state (detached range, partial selection)
    #[error("InvalidStateError: the object is in an invalid state")]
    InvalidState,
}

impl DomError {
    /// Legacy DOM exception code
    pub fn code(self) -> u16 {
        match self {
            Self::IndexSize => 1,
            Self::HierarchyRequest => 3,
            Self::WrongDocument => 4,
            Self::NotFound => 8,
            Self::InvalidState => 11,
            Self::InvalidNodeType => 24,
        }
    }
}
