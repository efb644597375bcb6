use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use seqsync_syntax::{Arrow, BlockKind, NotePlacement, ParticipantKind};

/// Stable identifier of an action within one session.
///
/// Minted by the [`IdentityManager`](crate::sync::identity::IdentityManager),
/// never reused for a different element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub u64);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    Title,
    Participant,
    Message,
    Note,
    Activation,
    Block,
}

/// What the GUI renders for one statement.
///
/// Children of blocks are not stored here; the [`ModelTree`](super::ModelTree)
/// owns the structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionContent {
    Title {
        text: String,
    },
    Participant {
        kind: ParticipantKind,
        name: String,
        alias: Option<String>,
    },
    Message {
        from: String,
        to: String,
        arrow: Arrow,
        text: String,
    },
    Note {
        placement: NotePlacement,
        targets: Vec<String>,
        text: String,
    },
    Activation {
        target: String,
        active: bool,
    },
    Block {
        kind: BlockKind,
        /// One condition per branch; the first is the header's.
        conditions: Vec<String>,
    },
}

impl ActionContent {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionContent::Title { .. } => ActionKind::Title,
            ActionContent::Participant { .. } => ActionKind::Participant,
            ActionContent::Message { .. } => ActionKind::Message,
            ActionContent::Note { .. } => ActionKind::Note,
            ActionContent::Activation { .. } => ActionKind::Activation,
            ActionContent::Block { .. } => ActionKind::Block,
        }
    }

    /// Number of child lists this action owns (zero unless it is a block).
    pub fn branch_count(&self) -> usize {
        match self {
            ActionContent::Block { conditions, .. } => conditions.len(),
            _ => 0,
        }
    }

    /// Hash over the fields that make two actions "the same element".
    ///
    /// Messages hash sender, receiver and text; blocks hash their kind and
    /// first condition only, so adding an `else` keeps the block's key.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.kind().hash(&mut hasher);
        match self {
            ActionContent::Title { text } => text.hash(&mut hasher),
            ActionContent::Participant { kind, name, alias } => {
                kind.hash(&mut hasher);
                name.hash(&mut hasher);
                alias.hash(&mut hasher);
            }
            ActionContent::Message { from, to, text, .. } => {
                from.hash(&mut hasher);
                to.hash(&mut hasher);
                text.hash(&mut hasher);
            }
            ActionContent::Note {
                placement,
                targets,
                text,
            } => {
                placement.hash(&mut hasher);
                targets.hash(&mut hasher);
                text.hash(&mut hasher);
            }
            ActionContent::Activation { target, active } => {
                target.hash(&mut hasher);
                active.hash(&mut hasher);
            }
            ActionContent::Block { kind, conditions } => {
                kind.hash(&mut hasher);
                conditions.first().hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Short one-line description, used by tree dumps and log messages.
    pub fn summary(&self) -> String {
        match self {
            ActionContent::Title { text } => format!("title {text:?}"),
            ActionContent::Participant { kind, name, alias } => match alias {
                Some(alias) => format!("{} {name:?} as {alias:?}", kind.keyword()),
                None => format!("{} {name:?}", kind.keyword()),
            },
            ActionContent::Message {
                from,
                to,
                arrow,
                text,
            } => format!("message {from:?} {arrow} {to:?} {text:?}"),
            ActionContent::Note {
                placement,
                targets,
                text,
            } => format!("note {} {targets:?} {text:?}", placement.keyword()),
            ActionContent::Activation { target, active } => {
                let word = if *active { "activate" } else { "deactivate" };
                format!("{word} {target:?}")
            }
            ActionContent::Block { kind, conditions } => {
                format!("{} {conditions:?}", kind.keyword())
            }
        }
    }
}
