use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PatchError;
use crate::models::{ActionContent, Identity, ModelTree, ParentRef};

/// One tree edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    /// Insert a new action (a block arrives with empty branches).
    Insert {
        parent: ParentRef,
        index: usize,
        id: Identity,
        content: ActionContent,
    },
    /// Remove an action with everything nested inside it.
    Remove { id: Identity },
    /// Move an existing action; `index` counts after detaching it.
    Move {
        id: Identity,
        parent: ParentRef,
        index: usize,
    },
    /// Replace content in place.
    Update { id: Identity, content: ActionContent },
}

/// An ordered list of tree edits: the only way one model snapshot becomes
/// the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: PatchOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchOp> {
        self.ops.iter()
    }

    /// Identities removed by this patch (topmost only).
    pub fn removed(&self) -> impl Iterator<Item = Identity> + '_ {
        self.ops.iter().filter_map(|op| match op {
            PatchOp::Remove { id } => Some(*id),
            _ => None,
        })
    }

    pub fn extend(&mut self, other: Patch) {
        self.ops.extend(other.ops);
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOp::Insert {
                parent,
                index,
                id,
                content,
            } => write!(f, "insert {id} at {parent}.{index}: {}", content.summary()),
            PatchOp::Remove { id } => write!(f, "remove {id}"),
            PatchOp::Move { id, parent, index } => write!(f, "move {id} to {parent}.{index}"),
            PatchOp::Update { id, content } => write!(f, "update {id}: {}", content.summary()),
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.ops {
            writeln!(f, "{op}")?;
        }
        Ok(())
    }
}

/// Apply one operation in place.
pub fn apply_op(tree: &mut ModelTree, op: &PatchOp) -> Result<(), PatchError> {
    match op {
        PatchOp::Insert {
            parent,
            index,
            id,
            content,
        } => tree.insert(*parent, *index, *id, content.clone()),
        PatchOp::Remove { id } => tree.remove(*id).map(|_| ()),
        PatchOp::Move { id, parent, index } => tree.move_to(*id, *parent, *index),
        PatchOp::Update { id, content } => tree.update(*id, content.clone()),
    }
}

/// Apply a whole patch. Works on a copy: on error `tree` is untouched.
pub fn apply_patch(tree: &ModelTree, patch: &Patch) -> Result<ModelTree, PatchError> {
    let mut next = tree.clone();
    for op in &patch.ops {
        apply_op(&mut next, op)?;
    }
    Ok(next)
}
