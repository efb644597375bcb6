//! Keeping text and model in step.
//!
//! - [`identity`]: stable identities across reparses
//! - [`projector`]: AST → action model
//! - [`diff`]: old model + new model → patch
//! - [`validate`]: semantic warnings over a projected model
//! - [`handle`]: orchestrator state and the edit queue
//! - [`session`]: the orchestrator itself

pub mod diff;
pub mod handle;
pub mod identity;
pub mod projector;
pub mod session;
pub mod validate;

pub use diff::{Diff, DiffOptions, diff, diff_with, verify};
pub use handle::{ChangeOrigin, EchoTag, SyncHandle, SyncState, TextChange};
pub use identity::{IdentityConflict, IdentityKey, IdentityManager, IdentityPolicy};
pub use projector::{Projection, project};
pub use session::{
    Dispatched, ModelSync, Session, SessionOptions, SkipReason, SyncListener, TextOutcome,
    TextSync,
};
pub use validate::semantic_warnings;
