//! The orchestrator's state and its edit queue.
//!
//! A cycle runs to completion on the host's thread. Anything that arrives
//! meanwhile, typically from a [`SyncListener`](crate::sync::SyncListener)
//! reacting to the cycle's own output, goes through a [`SyncHandle`] into
//! the mailbox and is dispatched once the session is idle again.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use crate::editing::Cmd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    ParsingFromText,
    ApplyingFromModel,
    /// A cycle is running and at least one edit is waiting for it.
    Reconciling,
}

/// Marks text the session generated itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EchoTag(pub u64);

impl fmt::Display for EchoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "echo#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    User,
    /// The host is feeding back text the session regenerated.
    Echo(EchoTag),
}

/// The editor's text after a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    /// The whole new text.
    pub text: String,
    /// Byte range of the old text that was replaced, if the host knows it.
    /// Only a hint for incremental lexing.
    pub edit: Option<Range<usize>>,
    /// Caret in the new text, if the host knows it.
    pub caret: Option<usize>,
    pub origin: ChangeOrigin,
}

impl TextChange {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            edit: None,
            caret: None,
            origin: ChangeOrigin::User,
        }
    }

    pub fn echo(text: impl Into<String>, tag: EchoTag) -> Self {
        Self {
            text: text.into(),
            edit: None,
            caret: None,
            origin: ChangeOrigin::Echo(tag),
        }
    }

    pub fn with_edit(mut self, edit: Range<usize>) -> Self {
        self.edit = Some(edit);
        self
    }

    pub fn with_caret(mut self, caret: usize) -> Self {
        self.caret = Some(caret);
        self
    }
}

/// A queued edit, in the order it should run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pending {
    Text(TextChange),
    /// Command batches submitted back to back. Each is compiled on its own
    /// against the model the earlier ones left; the run regenerates once.
    Model(Vec<Vec<Cmd>>),
}

/// Edits waiting for the session, in arrival order.
///
/// At most one text change is pending. A later one replaces it outright,
/// and its edit hint is dropped since it was relative to text the session
/// never saw. Command batches that arrive back to back share one entry, so
/// they cost one regeneration; a text change in between starts a new one.
#[derive(Debug, Default)]
pub(crate) struct Mailbox {
    entries: VecDeque<Pending>,
}

impl Mailbox {
    fn push_text(&mut self, mut change: TextChange) {
        if let Some(at) = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Pending::Text(_)))
        {
            log::warn!("dropping a superseded text edit");
            change.edit = None;
            self.entries.remove(at);
            self.merge_models_at(at);
        }
        self.entries.push_back(Pending::Text(change));
    }

    fn push_model(&mut self, cmds: Vec<Cmd>) {
        match self.entries.back_mut() {
            Some(Pending::Model(batches)) => batches.push(cmds),
            _ => self.entries.push_back(Pending::Model(vec![cmds])),
        }
    }

    /// Join the model entries on either side of a removed text change.
    fn merge_models_at(&mut self, at: usize) {
        if at == 0 || at >= self.entries.len() {
            return;
        }
        if let (Some(Pending::Model(_)), Some(Pending::Model(_))) =
            (self.entries.get(at - 1), self.entries.get(at))
        {
            if let Some(Pending::Model(later)) = self.entries.remove(at) {
                if let Some(Pending::Model(earlier)) = self.entries.get_mut(at - 1) {
                    earlier.extend(later);
                }
            }
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Pending> {
        self.entries.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) state: Cell<SyncState>,
    pub(crate) queue: RefCell<Mailbox>,
}

impl Shared {
    pub(crate) fn enter(&self, state: SyncState) {
        self.state.set(state);
    }

    pub(crate) fn leave(&self) {
        self.state.set(SyncState::Idle);
    }

    fn mark_pending(&self) {
        if self.state.get() != SyncState::Idle {
            self.state.set(SyncState::Reconciling);
        }
    }
}

/// Enqueues edits for a session. Cheap to clone; safe to use while a
/// cycle is running.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    pub(crate) shared: Rc<Shared>,
}

impl SyncHandle {
    pub fn submit_text(&self, change: TextChange) {
        self.shared.queue.borrow_mut().push_text(change);
        self.shared.mark_pending();
    }

    pub fn submit_model(&self, cmds: Vec<Cmd>) {
        self.shared.queue.borrow_mut().push_model(cmds);
        self.shared.mark_pending();
    }

    pub fn state(&self) -> SyncState {
        self.shared.state.get()
    }

    pub fn has_pending(&self) -> bool {
        !self.shared.queue.borrow().is_empty()
    }
}
