//! The action model: what the GUI sees.
//!
//! - [`action`]: identities and action content
//! - [`tree`]: the arena-backed [`ModelTree`] and its mutation primitives
//! - [`source_map`]: where each action sits in the current text

pub mod action;
pub mod source_map;
pub mod tree;

pub use action::{
    ActionContent, ActionKind, Arrow, BlockKind, Identity, NotePlacement, ParticipantKind,
};
pub use source_map::SourceMap;
pub use tree::{ModelTree, ParentRef};
