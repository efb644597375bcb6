//! End-to-end behaviour of a session driven from both sides.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use seqsync_engine::models::Arrow;
use seqsync_engine::sync::Dispatched;
use seqsync_engine::{
    ActionContent, Cmd, EchoTag, FormatOptions, Identity, ParentRef, Patch, PatchOp, Session,
    SessionOptions, SyncError, SyncHandle, SyncListener, SyncState, TextChange, TextOutcome,
    TextSync,
};
use seqsync_syntax::{DiagnosticKind, Severity};

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

fn message(from: &str, to: &str, text: &str) -> ActionContent {
    ActionContent::Message {
        from: from.into(),
        to: to.into(),
        arrow: Arrow::SYNC,
        text: text.into(),
    }
}

fn root(session: &Session) -> Vec<Identity> {
    session
        .model()
        .children(ParentRef::Root)
        .unwrap_or_default()
        .to_vec()
}

#[test]
fn editing_message_text_keeps_its_identity() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: hi\n", plain())?;
    assert_eq!(root(&session), vec![Identity(1)]);

    let sync = synced(session.apply_text(TextChange::user("A -> B: hi there\n"))?);

    assert_eq!(
        sync.patch.iter().collect::<Vec<_>>(),
        vec![&PatchOp::Update {
            id: Identity(1),
            content: message("A", "B", "hi there"),
        }]
    );
    assert_eq!(root(&session), vec![Identity(1)]);
    assert_eq!(
        session.model().get(Identity(1)),
        Some(&message("A", "B", "hi there"))
    );
    Ok(())
}

#[test]
fn dragging_inside_a_loop_swaps_the_lines() -> anyhow::Result<()> {
    let text = "loop retry\n  A -> B: first\n  A -> B: second\nend\n";
    let mut session = Session::open(text, plain())?;
    let block = root(&session)[0];
    let body = ParentRef::Branch { block, branch: 0 };
    let children = session.model().children(body).unwrap_or_default().to_vec();

    let sync = session.apply_model(vec![Cmd::Reorder {
        id: children[1],
        parent: body,
        index: 0,
    }])?;

    assert_eq!(sync.text, "loop retry\n  A -> B: second\n  A -> B: first\nend\n");
    assert_eq!(sync.patch.len(), 1);
    assert!(matches!(
        sync.patch.iter().next(),
        Some(PatchOp::Move { id, .. }) if *id == children[1]
    ));
    assert_eq!(
        session.model().children(body),
        Some(&[children[1], children[0]][..])
    );
    assert_eq!(root(&session), vec![block]);
    Ok(())
}

#[test]
fn unclosed_alt_keeps_earlier_lines_and_reports_once() -> anyhow::Result<()> {
    let session = Session::open("A -> B: ok\nalt cond1\n  B -> A: back\n", plain())?;

    let errors: Vec<_> = session
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert_eq!(errors[0].kind, DiagnosticKind::Parse);
    assert_eq!(errors[0].message, "unclosed `alt` block: expected `end`");
    assert_eq!((errors[0].span.line, errors[0].span.column), (2, 1));

    let ids = root(&session);
    assert_eq!(session.model().get(ids[0]), Some(&message("A", "B", "ok")));
    Ok(())
}

/// Fires two GUI edits through the handle the first time it sees a patch,
/// i.e. while the cycle that produced the patch is still running.
struct Burst {
    handle: SyncHandle,
    target: Identity,
    fired: bool,
    states: Rc<RefCell<Vec<SyncState>>>,
    texts: Rc<RefCell<Vec<String>>>,
}

impl SyncListener for Burst {
    fn on_patch(&mut self, _patch: &Patch) {
        if self.fired {
            return;
        }
        self.fired = true;
        for text in ["two", "three"] {
            self.handle.submit_model(vec![Cmd::Edit {
                id: self.target,
                content: message("A", "B", text),
            }]);
        }
        self.states.borrow_mut().push(self.handle.state());
    }

    fn on_text(&mut self, text: &str, _echo: EchoTag) {
        self.texts.borrow_mut().push(text.to_string());
    }
}

#[test]
fn rapid_model_edits_coalesce_into_one_regeneration() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\nC -> D\n", plain())?;
    let ids = root(&session);
    let (first, second) = (ids[0], ids[1]);

    let states = Rc::new(RefCell::new(Vec::new()));
    let texts = Rc::new(RefCell::new(Vec::new()));
    session.add_listener(Box::new(Burst {
        handle: session.handle(),
        target: first,
        fired: false,
        states: Rc::clone(&states),
        texts: Rc::clone(&texts),
    }));

    session.apply_model(vec![Cmd::Delete { id: second }])?;

    assert_eq!(*states.borrow(), vec![SyncState::Reconciling]);
    assert_eq!(
        *texts.borrow(),
        vec!["A -> B: one\n".to_string(), "A -> B: three\n".to_string()]
    );
    assert_eq!(session.text(), "A -> B: three\n");
    assert_eq!(session.state(), SyncState::Idle);
    assert!(!session.handle().has_pending());
    Ok(())
}

#[test]
fn queued_model_batches_dispatch_as_one() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\n", plain())?;
    let id = root(&session)[0];
    let handle = session.handle();
    handle.submit_model(vec![Cmd::Edit {
        id,
        content: message("A", "B", "two"),
    }]);
    handle.submit_model(vec![Cmd::Edit {
        id,
        content: message("A", "B", "three"),
    }]);

    let results = session.dispatch();

    assert_eq!(results.len(), 1);
    let Ok(Dispatched::Model(sync)) = &results[0] else {
        panic!("expected one model cycle, got {results:?}");
    };
    assert_eq!(sync.text, "A -> B: three\n");
    assert_eq!(root(&session), vec![id]);
    Ok(())
}

struct Errors(Rc<RefCell<Vec<SyncError>>>);

impl SyncListener for Errors {
    fn on_error(&mut self, error: &SyncError) {
        self.0.borrow_mut().push(error.clone());
    }
}

#[test]
fn a_failing_queued_batch_drops_only_itself() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\n", plain())?;
    let id = root(&session)[0];
    let errors = Rc::new(RefCell::new(Vec::new()));
    session.add_listener(Box::new(Errors(Rc::clone(&errors))));

    let handle = session.handle();
    handle.submit_model(vec![Cmd::Edit {
        id,
        content: message("A", "B", "two"),
    }]);
    handle.submit_model(vec![Cmd::Delete { id: Identity(99) }]);
    handle.submit_model(vec![Cmd::Insert {
        parent: ParentRef::Root,
        index: 1,
        content: message("C", "D", "three"),
    }]);

    let results = session.dispatch();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0], Err(SyncError::UnknownIdentity(Identity(99))));
    let Ok(Dispatched::Model(sync)) = &results[1] else {
        panic!("expected one model cycle, got {results:?}");
    };
    assert_eq!(sync.text, "A -> B: two\nC -> D: three\n");
    assert_eq!(session.text(), "A -> B: two\nC -> D: three\n");
    assert_eq!(root(&session)[0], id);
    assert_eq!(
        *errors.borrow(),
        vec![SyncError::UnknownIdentity(Identity(99))]
    );
    Ok(())
}

#[test]
fn a_queue_of_only_failing_batches_regenerates_nothing() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\n", plain())?;
    let model = session.model().clone();
    let handle = session.handle();
    handle.submit_model(vec![Cmd::Delete { id: Identity(98) }]);
    handle.submit_model(vec![Cmd::Delete { id: Identity(99) }]);

    let results = session.dispatch();

    assert_eq!(
        results,
        vec![
            Err(SyncError::UnknownIdentity(Identity(98))),
            Err(SyncError::UnknownIdentity(Identity(99))),
        ]
    );
    assert_eq!(session.text(), "A -> B: one\n");
    assert_eq!(session.model(), &model);
    Ok(())
}

#[test]
fn text_queued_between_batches_runs_between_them() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\n", plain())?;
    let id = root(&session)[0];
    let handle = session.handle();
    handle.submit_model(vec![Cmd::Edit {
        id,
        content: message("A", "B", "two"),
    }]);
    handle.submit_text(TextChange::user("A -> B: two\nC -> D\n"));
    handle.submit_model(vec![Cmd::Delete { id }]);

    let results = session.dispatch();

    assert_eq!(results.len(), 3);
    assert!(matches!(results[0], Ok(Dispatched::Model(_))));
    assert!(matches!(results[1], Ok(Dispatched::Text(TextOutcome::Synced(_)))));
    assert!(matches!(results[2], Ok(Dispatched::Model(_))));
    assert_eq!(session.text(), "C -> D\n");
    Ok(())
}

#[test]
fn queued_text_edits_keep_only_the_last() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B\n", plain())?;
    let handle = session.handle();
    handle.submit_text(TextChange::user("A -> C\n"));
    handle.submit_text(TextChange::user("A -> D\n"));

    let results = session.dispatch();

    assert_eq!(results.len(), 1);
    assert_eq!(session.text(), "A -> D\n");
    Ok(())
}

#[test]
fn echoed_regeneration_does_not_reparse() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\n", plain())?;
    let id = root(&session)[0];
    let sync = session.apply_model(vec![Cmd::Edit {
        id,
        content: message("A", "B", "two"),
    }])?;
    let model = session.model().clone();

    let outcome = session.apply_text(TextChange::echo(sync.text, sync.echo))?;

    assert!(matches!(outcome, TextOutcome::Skipped(_)));
    assert_eq!(session.model(), &model);
    Ok(())
}
