//! Bidirectional sync between sequence diagram text and an editable model.
//!
//! Text is parsed by `seqsync-syntax` and projected into a [`ModelTree`] of
//! actions with stable [`Identity`]s. GUI edits go the other way as
//! [`Cmd`]s that compile to a [`Patch`], after which the text is
//! regenerated. A [`Session`] runs both directions for one document.

pub mod catalog;
pub mod editing;
pub mod error;
pub mod io;
pub mod models;
pub mod sync;

pub use catalog::{ActorCatalog, CatalogActor, StaticCatalog};
pub use editing::{
    CaretAnchor, Cmd, CursorTracker, FormatOptions, Patch, PatchOp, Regenerated, apply_patch,
    regenerate,
};
pub use error::{PatchError, SyncError};
pub use io::IoError;
pub use models::{ActionContent, ActionKind, Identity, ModelTree, ParentRef, SourceMap};
pub use sync::{
    ChangeOrigin, EchoTag, IdentityConflict, IdentityManager, IdentityPolicy, ModelSync, Session,
    SessionOptions, SkipReason, SyncHandle, SyncListener, SyncState, TextChange, TextOutcome,
    TextSync,
};
