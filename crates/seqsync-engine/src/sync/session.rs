//! The sync orchestrator.
//!
//! A [`Session`] owns everything one open document needs: the text buffer,
//! the current model, the identity table, the caret. Each edit from either
//! side runs one cycle:
//!
//! - **text → model** (`ParsingFromText`): lex (incrementally when possible),
//!   parse, lower, project, diff against the current model, commit.
//! - **model → text** (`ApplyingFromModel`): compile commands into a patch,
//!   regenerate the whole text, carry the caret across by identity.
//!
//! A cycle either commits completely or leaves the model as it was. Work
//! state is cloned up front and swapped in at the end, so an error halfway
//! through never leaves half-bound identities behind.

use std::ops::Range;
use std::rc::Rc;

use seqsync_syntax::ast::Diagram;
use seqsync_syntax::lexer::{Token, TokenRecord, common_prefix_len, lex, relex};
use seqsync_syntax::{Diagnostic, parse_tokens};
use xi_rope::delta::Transformer;
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::{
    CaretAnchor, Cmd, CursorTracker, FormatOptions, History, Patch, SelectionAnchor, compile,
    regenerate, text_delta,
};
use crate::error::SyncError;
use crate::models::{Identity, ModelTree, SourceMap};
use crate::sync::diff::{DiffOptions, diff, diff_with};
use crate::sync::handle::{ChangeOrigin, EchoTag, Pending, Shared, SyncHandle, SyncState, TextChange};
use crate::sync::identity::{IdentityConflict, IdentityManager, IdentityPolicy};
use crate::sync::projector::project;
use crate::sync::validate::semantic_warnings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub format: FormatOptions,
    pub policy: IdentityPolicy,
    /// Reuse cached tokens before the first changed line.
    pub incremental: bool,
    pub history_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            format: FormatOptions::default(),
            policy: IdentityPolicy::default(),
            incremental: true,
            history_limit: 100,
        }
    }
}

/// Result of a text → model cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSync {
    pub patch: Patch,
    pub caret: usize,
    /// The action under the caret.
    pub focus: Option<Identity>,
    pub diagnostics: Vec<Diagnostic>,
    pub conflicts: Vec<IdentityConflict>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Text the session generated itself.
    Echo,
    /// Same text as the buffer.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextOutcome {
    Synced(TextSync),
    Skipped(SkipReason),
}

/// Result of a model → text cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSync {
    pub patch: Patch,
    /// The regenerated text; the host feeds it back tagged with `echo`.
    pub text: String,
    pub echo: EchoTag,
    pub caret: usize,
}

/// A queued edit after it ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Text(TextOutcome),
    Model(ModelSync),
}

/// Observes every committed cycle, including ones run from the queue.
pub trait SyncListener {
    fn on_patch(&mut self, _patch: &Patch) {}

    fn on_text(&mut self, _text: &str, _echo: EchoTag) {}

    fn on_diagnostics(&mut self, _diagnostics: &[Diagnostic]) {}

    /// A queued edit failed. Direct calls return their errors instead.
    fn on_error(&mut self, _error: &SyncError) {}
}

pub struct Session {
    options: SessionOptions,
    buffer: Rope,
    model: ModelTree,
    identities: IdentityManager,
    source_map: SourceMap,
    tokens: Vec<TokenRecord>,
    diagnostics: Vec<Diagnostic>,
    selection: Range<usize>,
    history: History,
    listeners: Vec<Box<dyn SyncListener>>,
    shared: Rc<Shared>,
    last_echo: Option<EchoTag>,
    next_echo: u64,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            buffer: Rope::from(""),
            model: ModelTree::new(),
            identities: IdentityManager::new(options.policy),
            source_map: SourceMap::new(),
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            selection: 0..0,
            history: History::new(options.history_limit),
            listeners: Vec::new(),
            shared: Rc::new(Shared::default()),
            last_echo: None,
            next_echo: 0,
            options,
        }
    }

    /// A session with `text` already synced into the model.
    pub fn open(text: &str, options: SessionOptions) -> Result<Self, SyncError> {
        let mut session = Self::new(options);
        session.apply_text(TextChange::user(text))?;
        Ok(session)
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn model(&self) -> &ModelTree {
        &self.model
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn identities(&self) -> &IdentityManager {
        &self.identities
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> SyncState {
        self.shared.state.get()
    }

    pub fn caret(&self) -> usize {
        self.selection.end
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    pub fn set_selection(&mut self, selection: Range<usize>) {
        let len = self.buffer.len();
        self.selection = selection.start.min(len)..selection.end.min(len);
    }

    pub fn set_caret(&mut self, caret: usize) {
        self.set_selection(caret..caret);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            shared: Rc::clone(&self.shared),
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn SyncListener>) {
        self.listeners.push(listener);
    }

    /// Sync a text change into the model.
    pub fn apply_text(&mut self, change: TextChange) -> Result<TextOutcome, SyncError> {
        let result = self.run_text(change);
        self.drain();
        result
    }

    /// Apply GUI commands and regenerate the text.
    pub fn apply_model(&mut self, cmds: Vec<Cmd>) -> Result<ModelSync, SyncError> {
        let result = self.run_model(cmds);
        self.drain();
        result
    }

    /// Rebuild the model from the buffer as if the session had just been
    /// opened on it. The fallback after a `DiffInconsistency`: GUI state that
    /// never made it into the text is lost, and the returned patch starts
    /// from an empty model.
    pub fn resync_from_text(&mut self) -> Result<TextSync, SyncError> {
        self.shared.enter(SyncState::ParsingFromText);
        let result = self.resync();
        self.shared.leave();
        self.drain();
        result
    }

    pub fn undo(&mut self) -> Result<Option<ModelSync>, SyncError> {
        let Some(snapshot) = self.history.undo(self.model.clone()) else {
            return Ok(None);
        };
        self.shared.enter(SyncState::ApplyingFromModel);
        let result = self.restore(snapshot.clone());
        self.shared.leave();
        if result.is_err() {
            self.history.restore_undo(snapshot);
        }
        self.drain();
        result.map(Some)
    }

    pub fn redo(&mut self) -> Result<Option<ModelSync>, SyncError> {
        let Some(snapshot) = self.history.redo(self.model.clone()) else {
            return Ok(None);
        };
        self.shared.enter(SyncState::ApplyingFromModel);
        let result = self.restore(snapshot.clone());
        self.shared.leave();
        if result.is_err() {
            self.history.restore_redo(snapshot);
        }
        self.drain();
        result.map(Some)
    }

    /// Run everything queued through a [`SyncHandle`], in arrival order.
    ///
    /// Back-to-back command batches run as one model cycle. A batch that
    /// fails is dropped on its own and reported before the cycle's result;
    /// the batches around it still apply.
    pub fn dispatch(&mut self) -> Vec<Result<Dispatched, SyncError>> {
        let mut results = Vec::new();
        loop {
            let next = self.shared.queue.borrow_mut().pop();
            let Some(pending) = next else {
                break;
            };
            let result = match pending {
                Pending::Text(change) => Some(self.run_text(change).map(Dispatched::Text)),
                Pending::Model(batches) => {
                    let (failures, result) = self.run_batches(&batches);
                    for error in failures {
                        self.report(&error);
                        results.push(Err(error));
                    }
                    result.map(|result| result.map(Dispatched::Model))
                }
            };
            if let Some(result) = result {
                if let Err(error) = &result {
                    self.report(error);
                }
                results.push(result);
            }
        }
        results
    }

    fn report(&mut self, error: &SyncError) {
        log::warn!("queued edit failed: {error}");
        for listener in &mut self.listeners {
            listener.on_error(error);
        }
    }

    fn drain(&mut self) {
        if self.shared.queue.borrow().is_empty() {
            return;
        }
        let ran = self.dispatch();
        log::debug!("dispatched {} queued edits", ran.len());
    }

    fn run_text(&mut self, change: TextChange) -> Result<TextOutcome, SyncError> {
        self.shared.enter(SyncState::ParsingFromText);
        let result = self.sync_text(change);
        self.shared.leave();
        result
    }

    fn run_model(&mut self, cmds: Vec<Cmd>) -> Result<ModelSync, SyncError> {
        self.shared.enter(SyncState::ApplyingFromModel);
        let result = self.sync_model(&cmds);
        self.shared.leave();
        result
    }

    /// Compile each batch against the model the earlier ones left, then
    /// regenerate once. Returns the failed batches' errors, and the cycle's
    /// result unless every batch failed.
    fn run_batches(
        &mut self,
        batches: &[Vec<Cmd>],
    ) -> (Vec<SyncError>, Option<Result<ModelSync, SyncError>>) {
        self.shared.enter(SyncState::ApplyingFromModel);
        let mut model = self.model.clone();
        let mut identities = self.identities.clone();
        let mut patch = Patch::new();
        let mut applied = 0;
        let mut failures = Vec::new();

        for cmds in batches {
            let mut attempt = identities.clone();
            match compile(&model, &mut attempt, cmds) {
                Ok(compiled) => {
                    model = compiled.model;
                    patch.extend(compiled.patch);
                    identities = attempt;
                    applied += 1;
                }
                Err(error) => failures.push(error),
            }
        }
        log::debug!("compiled {applied} of {} queued batches", batches.len());

        let result = (applied > 0).then(|| self.commit_model(model, patch, identities, true));
        self.shared.leave();
        (failures, result)
    }

    fn sync_text(&mut self, change: TextChange) -> Result<TextOutcome, SyncError> {
        let old_text = self.buffer.to_string();

        if let ChangeOrigin::Echo(tag) = change.origin {
            if Some(tag) == self.last_echo && change.text == old_text {
                log::debug!("skipping {tag}");
            } else {
                log::warn!("dropping stale {tag}");
            }
            return Ok(TextOutcome::Skipped(SkipReason::Echo));
        }
        if change.text == old_text {
            return Ok(TextOutcome::Skipped(SkipReason::Unchanged));
        }

        let text = change.text.as_str();
        let prefix = common_prefix_len(&old_text, text);
        let changed_from = change
            .edit
            .as_ref()
            .map_or(prefix, |edit| edit.start.min(prefix));
        let tokens = if self.options.incremental && !self.tokens.is_empty() {
            relex(text, &self.tokens, changed_from)
        } else {
            lex(text)
        };
        log::debug!("lexed {} tokens (cached up to byte {changed_from})", tokens.len());

        let delta = text_delta(&old_text, text);
        let records: Vec<TokenRecord> = tokens.iter().map(Token::record).collect();
        let anchor =
            CursorTracker::capture_selection(self.selection.clone(), &self.source_map, &self.model);

        // The text is the host's truth even if the model cannot follow it.
        self.buffer = delta.apply(&self.buffer);
        self.tokens = records;
        self.selection = match change.caret {
            Some(caret) => caret.min(text.len())..caret.min(text.len()),
            None => transform_range(&self.selection, &delta, text.len()),
        };

        let (root, mut diagnostics) = parse_tokens(&tokens).into_parts();
        let diagram = Diagram::lower(&root, text);

        let mut identities = self.identities.clone();
        let projection = project(&diagram, &mut identities).map_err(|e| {
            SyncError::DiffInconsistency(format!("projection failed: {e}"))
        });
        let projection = match projection {
            Ok(projection) => projection,
            Err(error) => return Err(self.abort(error, diagnostics)),
        };
        let diff = match diff(&self.model, &projection.model) {
            Ok(diff) => diff,
            Err(error) => return Err(self.abort(error, diagnostics)),
        };

        let model = diff.target(&projection.model);
        let source_map = projection.source_map.rekey(&diff.rekeyed);
        let conflicts = identities.rebind(&model);
        diagnostics.extend(semantic_warnings(&model, &source_map, text));

        if change.caret.is_none() {
            self.selection = snap_selection(&anchor, self.selection.clone(), &model, &source_map);
        }
        let caret = self.selection.end;
        let focus = source_map.innermost_at(caret, &model);

        if !diff.patch.is_empty() {
            let previous = std::mem::replace(&mut self.model, model);
            self.history.record(previous);
        } else {
            self.model = model;
        }
        self.identities = identities;
        self.source_map = source_map;
        self.diagnostics = diagnostics.clone();

        log::debug!(
            "text cycle: {} ops, {} diagnostics",
            diff.patch.len(),
            diagnostics.len()
        );
        self.notify_patch(&diff.patch);
        self.notify_diagnostics();

        Ok(TextOutcome::Synced(TextSync {
            patch: diff.patch,
            caret,
            focus,
            diagnostics,
            conflicts,
        }))
    }

    fn sync_model(&mut self, cmds: &[Cmd]) -> Result<ModelSync, SyncError> {
        let mut identities = self.identities.clone();
        let compiled = compile(&self.model, &mut identities, cmds)?;
        self.commit_model(compiled.model, compiled.patch, identities, true)
    }

    fn restore(&mut self, snapshot: ModelTree) -> Result<ModelSync, SyncError> {
        let diff = diff_with(
            &self.model,
            &snapshot,
            DiffOptions {
                pair_leftovers: false,
            },
        )?;
        let identities = self.identities.clone();
        self.commit_model(snapshot, diff.patch, identities, false)
    }

    /// Swap in a new model and regenerate the text from it.
    fn commit_model(
        &mut self,
        model: ModelTree,
        patch: Patch,
        mut identities: IdentityManager,
        record: bool,
    ) -> Result<ModelSync, SyncError> {
        let old_text = self.buffer.to_string();
        let anchor = CursorTracker::capture_selection(self.selection.clone(), &self.source_map, &self.model);

        let regenerated = regenerate(&model, &self.options.format);
        let delta = text_delta(&old_text, &regenerated.text);
        let selection = CursorTracker::resolve_selection(
            &anchor,
            &regenerated.spans,
            regenerated.text.len(),
            Some(&delta),
        );

        for conflict in identities.rebind(&model) {
            log::warn!("identity conflict: {conflict}");
        }
        let diagnostics = semantic_warnings(&model, &regenerated.spans, &regenerated.text);

        self.next_echo += 1;
        let echo = EchoTag(self.next_echo);
        self.last_echo = Some(echo);

        let previous = std::mem::replace(&mut self.model, model);
        if record && !patch.is_empty() {
            self.history.record(previous);
        }
        self.identities = identities;
        self.buffer = delta.apply(&self.buffer);
        self.tokens = lex(&regenerated.text).iter().map(Token::record).collect();
        self.source_map = regenerated.spans;
        self.diagnostics = diagnostics;
        self.selection = selection;

        log::debug!("model cycle: {} ops, tagged {echo}", patch.len());
        self.notify_patch(&patch);
        for listener in &mut self.listeners {
            listener.on_text(&regenerated.text, echo);
        }
        self.notify_diagnostics();

        Ok(ModelSync {
            patch,
            text: regenerated.text,
            echo,
            caret: self.selection.end,
        })
    }

    fn resync(&mut self) -> Result<TextSync, SyncError> {
        let text = self.buffer.to_string();
        let tokens = lex(&text);
        let (root, mut diagnostics) = parse_tokens(&tokens).into_parts();
        let diagram = Diagram::lower(&root, &text);

        let mut identities = self.identities.clone();
        let projection = project(&diagram, &mut identities)
            .map_err(|e| SyncError::DiffInconsistency(format!("projection failed: {e}")))?;
        let diff = diff_with(
            &ModelTree::new(),
            &projection.model,
            DiffOptions {
                pair_leftovers: false,
            },
        )?;

        let conflicts = identities.rebind(&projection.model);
        diagnostics.extend(semantic_warnings(&projection.model, &projection.source_map, &text));
        let caret = self.selection.end.min(text.len());
        let focus = projection.source_map.innermost_at(caret, &projection.model);

        let previous = std::mem::replace(&mut self.model, projection.model);
        self.history.record(previous);
        self.identities = identities;
        self.source_map = projection.source_map;
        self.tokens = tokens.iter().map(Token::record).collect();
        self.diagnostics = diagnostics.clone();

        log::info!("resynced model from text: {} actions", self.model.len());
        self.notify_patch(&diff.patch);
        self.notify_diagnostics();

        Ok(TextSync {
            patch: diff.patch,
            caret,
            focus,
            diagnostics,
            conflicts,
        })
    }

    /// Give up on a text cycle. The buffer already holds the new text and
    /// the model is left as it was, so no span describes the buffer any
    /// more; carets fall back to raw offsets until the next commit.
    fn abort(&mut self, error: SyncError, diagnostics: Vec<Diagnostic>) -> SyncError {
        log::error!("{error}; keeping the previous model, resync from text to recover");
        self.source_map = SourceMap::new();
        self.diagnostics = diagnostics;
        self.notify_diagnostics();
        error
    }

    fn notify_patch(&mut self, patch: &Patch) {
        for listener in &mut self.listeners {
            listener.on_patch(patch);
        }
    }

    fn notify_diagnostics(&mut self) {
        for listener in &mut self.listeners {
            listener.on_diagnostics(&self.diagnostics);
        }
    }
}

/// Carry each end of a selection whose action was deleted from the text to
/// the start of the following action the delta moved it into.
fn snap_selection(
    anchor: &SelectionAnchor,
    selection: Range<usize>,
    model: &ModelTree,
    spans: &SourceMap,
) -> Range<usize> {
    let start = snap(&anchor.start, selection.start, model, spans);
    let end = snap(&anchor.end, selection.end, model, spans);
    start.min(end)..start.max(end)
}

fn snap(anchor: &CaretAnchor, offset: usize, model: &ModelTree, spans: &SourceMap) -> usize {
    let CaretAnchor::Node { id, fallback, .. } = anchor else {
        return offset;
    };
    if model.contains(*id) {
        return offset;
    }
    spans
        .innermost_at(offset, model)
        .filter(|landed| fallback.contains(landed))
        .and_then(|landed| spans.get(landed))
        .map_or(offset, |range| range.start)
}

fn transform_range(range: &Range<usize>, delta: &Delta<RopeInfo>, len: usize) -> Range<usize> {
    let mut transformer = Transformer::new(delta);
    let start = transformer.transform(range.start, false).min(len);
    let end = transformer.transform(range.end, true).min(len);
    start.min(end)..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionContent, ParentRef};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    fn plain() -> SessionOptions {
        SessionOptions {
            format: FormatOptions {
                indent: 2,
                envelope: false,
            },
            ..SessionOptions::default()
        }
    }

    fn synced(outcome: TextOutcome) -> TextSync {
        match outcome {
            TextOutcome::Synced(sync) => sync,
            TextOutcome::Skipped(reason) => panic!("unexpected skip: {reason:?}"),
        }
    }

    #[test]
    fn open_projects_the_text() {
        let session = Session::open("A -> B: hi\n", plain()).unwrap();
        assert_eq!(session.model().len(), 1);
        assert_eq!(session.state(), SyncState::Idle);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn unchanged_text_is_skipped() {
        let mut session = Session::open("A -> B\n", plain()).unwrap();
        assert_eq!(
            session.apply_text(TextChange::user("A -> B\n")).unwrap(),
            TextOutcome::Skipped(SkipReason::Unchanged)
        );
    }

    #[test]
    fn own_regeneration_is_not_reparsed() {
        let mut session = Session::open("A -> B: hi\n", plain()).unwrap();
        let id = session.model().children(ParentRef::Root).unwrap()[0];
        let sync = session.apply_model(vec![Cmd::Delete { id }]).unwrap();
        assert_eq!(sync.text, "");

        let echoed = session.apply_text(TextChange::echo(sync.text, sync.echo)).unwrap();
        assert_eq!(echoed, TextOutcome::Skipped(SkipReason::Echo));
        assert!(session.model().is_empty());
    }

    #[test]
    fn stale_echo_never_rolls_the_model_back() {
        let mut session = Session::open("A -> B: one\n", plain()).unwrap();
        let id = session.model().children(ParentRef::Root).unwrap()[0];
        let edit = |text: &str| Cmd::Edit {
            id,
            content: ActionContent::Message {
                from: "A".into(),
                to: "B".into(),
                arrow: crate::models::Arrow::SYNC,
                text: text.into(),
            },
        };
        let two = session.apply_model(vec![edit("two")]).unwrap();
        session.apply_model(vec![edit("three")]).unwrap();

        let outcome = session.apply_text(TextChange::echo(two.text, two.echo)).unwrap();
        assert_eq!(outcome, TextOutcome::Skipped(SkipReason::Echo));
        assert_eq!(session.text(), "A -> B: three\n");
    }

    #[test]
    fn caret_follows_the_delta_without_a_hint() {
        let mut session = Session::open("A -> B\nC -> D\n", plain()).unwrap();
        session.set_caret(9);
        let sync = synced(session.apply_text(TextChange::user("X -> Y\nA -> B\nC -> D\n")).unwrap());
        assert_eq!(sync.caret, 16);
        assert_eq!(sync.focus, session.source_map().innermost_at(16, session.model()));
    }

    #[test]
    fn caret_on_a_deleted_line_lands_at_the_next_action() {
        let mut session = Session::open("A -> B: x\nA -> B: x2\n", plain()).unwrap();
        session.set_caret(3);
        let sync = synced(session.apply_text(TextChange::user("A -> B: x2\n")).unwrap());
        assert_eq!(sync.caret, 0);
        assert_eq!(sync.focus, session.model().children(ParentRef::Root).unwrap().first().copied());
    }

    #[test]
    fn caret_in_a_line_being_retyped_stays_put() {
        let mut session = Session::open("A -> B: x\nC -> D\n", plain()).unwrap();
        session.set_caret(9);
        let sync = synced(session.apply_text(TextChange::user("A -> \nC -> D\n")).unwrap());
        assert_eq!(sync.caret, 5);
    }

    #[test]
    fn aborted_text_cycle_keeps_the_model_and_forgets_stale_spans() {
        let mut session =
            Session::open("A -> B: one\nA -> B: two\ndeactivate A\n", plain()).unwrap();
        assert_eq!(session.diagnostics().len(), 1);
        // Two root entries with the same identity: no patch can reproduce
        // the projection from here.
        let ids = session.model().preorder();
        let broken = session.model().rekey(&BTreeMap::from([(ids[1], ids[0])]));
        session.model = broken.clone();

        let result = session.apply_text(TextChange::user("A -> B: one\n"));

        assert!(matches!(result, Err(SyncError::DiffInconsistency(_))));
        assert_eq!(session.text(), "A -> B: one\n");
        assert_eq!(session.model(), &broken);
        assert!(session.source_map().is_empty());
        assert!(session.diagnostics().is_empty());

        let sync = session.resync_from_text().unwrap();
        assert_eq!(sync.patch.len(), 1);
        assert_eq!(session.source_map().len(), 1);
    }

    #[test]
    fn undo_and_redo_restore_identities() {
        let mut session = Session::open("A -> B: one\nA -> B: two\n", plain()).unwrap();
        let before = session.model().clone();
        let second = session.model().children(ParentRef::Root).unwrap()[1];

        session.apply_model(vec![Cmd::Delete { id: second }]).unwrap();
        assert_eq!(session.text(), "A -> B: one\n");

        let undone = session.undo().unwrap().unwrap();
        assert_eq!(undone.text, "A -> B: one\nA -> B: two\n");
        assert_eq!(session.model(), &before);

        session.redo().unwrap().unwrap();
        assert_eq!(session.text(), "A -> B: one\n");
        assert_eq!(session.undo().unwrap().map(|s| s.patch.len()), Some(1));
    }

    #[test]
    fn nothing_to_undo() {
        let mut session = Session::new(plain());
        assert_eq!(session.undo().unwrap(), None);
        assert_eq!(session.redo().unwrap(), None);
    }

    #[test]
    fn resync_rebuilds_from_the_buffer() {
        let mut session = Session::open("A -> B: hi\nalt x\n  C -> D\nend\n", plain()).unwrap();
        let ids = session.model().preorder();

        let sync = session.resync_from_text().unwrap();
        assert_eq!(sync.patch.len(), 3);
        assert_eq!(session.model().preorder(), ids);
    }

    #[derive(Default)]
    struct Recorded {
        texts: Vec<String>,
        patches: usize,
    }

    struct Recorder(Rc<RefCell<Recorded>>);

    impl SyncListener for Recorder {
        fn on_patch(&mut self, _patch: &Patch) {
            self.0.borrow_mut().patches += 1;
        }

        fn on_text(&mut self, text: &str, _echo: EchoTag) {
            self.0.borrow_mut().texts.push(text.to_string());
        }
    }

    #[test]
    fn listeners_see_every_cycle() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut session = Session::new(plain());
        session.add_listener(Box::new(Recorder(Rc::clone(&recorded))));

        session.apply_text(TextChange::user("A -> B\n")).unwrap();
        session
            .apply_model(vec![Cmd::Insert {
                parent: ParentRef::Root,
                index: 1,
                content: ActionContent::Title { text: "t".into() },
            }])
            .unwrap();

        let recorded = recorded.borrow();
        assert_eq!(recorded.patches, 2);
        assert_eq!(recorded.texts, vec!["A -> B\ntitle t\n".to_string()]);
    }

    #[test]
    fn handle_edits_submitted_while_idle_wait_for_dispatch() {
        let mut session = Session::open("A -> B\n", plain()).unwrap();
        let handle = session.handle();
        handle.submit_text(TextChange::user("A -> C\n"));
        assert_eq!(session.text(), "A -> B\n");

        let results = session.dispatch();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Ok(Dispatched::Text(TextOutcome::Synced(_)))));
        assert_eq!(session.text(), "A -> C\n");
    }
}
