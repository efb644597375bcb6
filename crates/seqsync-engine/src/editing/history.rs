use std::collections::VecDeque;

use crate::models::ModelTree;

/// Bounded undo/redo stacks of model snapshots.
///
/// Snapshots keep their identities, so stepping back is a diff between two
/// trees that already agree on who is who.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<ModelTree>,
    redo: Vec<ModelTree>,
    limit: usize,
}

impl History {
    /// `limit` of 0 disables history.
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    /// Remember the model as it was before a change. Clears redo.
    pub fn record(&mut self, before: ModelTree) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }
        self.undo.push_back(before);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// The snapshot to go back to; `current` becomes redoable.
    pub fn undo(&mut self, current: ModelTree) -> Option<ModelTree> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: ModelTree) -> Option<ModelTree> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    /// Put back a snapshot taken by `undo`/`redo` that could not be applied.
    pub fn restore_undo(&mut self, snapshot: ModelTree) {
        self.redo.pop();
        self.undo.push_back(snapshot);
    }

    pub fn restore_redo(&mut self, snapshot: ModelTree) {
        self.undo.pop_back();
        self.redo.push(snapshot);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}
