use std::collections::TryReserveError;
use thiserror::Error;

/// Status values returned across the tree API. All are recoverable
/// conditions reported to the immediate caller; none abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("operation requires an initialized tree")]
    NotInitialized,
    #[error("tree is already initialized")]
    AlreadyInitialized,
    #[error("no node exists at the given path")]
    NoSuchPath,
    #[error("a node already exists at the given path")]
    AlreadyInTree,
    #[error("path is incompatible with the existing root")]
    ConflictingPath,
    #[error("expected a directory but found a file")]
    NotADirectory,
    #[error("expected a file but found a directory")]
    NotAFile,
    #[error("parent/child link precondition violated")]
    ParentChild,
    #[error("node allocation failed")]
    Allocation(#[from] TryReserveError),
}
