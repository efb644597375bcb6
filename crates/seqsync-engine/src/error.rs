use thiserror::Error;

use crate::models::{Identity, ParentRef};

/// A patch operation that cannot be applied to the tree it was given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("unknown identity {0}")]
    UnknownIdentity(Identity),

    #[error("identity {0} already exists")]
    DuplicateIdentity(Identity),

    #[error("{0} is not a valid parent")]
    BadParent(ParentRef),

    #[error("index {index} out of range for {parent} ({len} children)")]
    IndexOutOfRange {
        parent: ParentRef,
        index: usize,
        len: usize,
    },

    #[error("cannot move {0} into its own subtree")]
    CyclicMove(Identity),

    #[error("branch {branch} of {block} still has children")]
    NonEmptyBranch { block: Identity, branch: usize },
}

/// Failures that abort a sync cycle. The session keeps its prior model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The computed patch does not turn the old model into the new one, or
    /// refers to an identity that exists on neither side. The host should
    /// fall back to [`Session::resync_from_text`](crate::Session::resync_from_text).
    #[error("diff inconsistency: {0}")]
    DiffInconsistency(String),

    #[error("unknown identity {0}")]
    UnknownIdentity(Identity),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("catalog: {0}")]
    Catalog(String),
}
