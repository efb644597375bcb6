//! Properties that hold for every cycle, whichever side started it.

use pretty_assertions::assert_eq;
use rstest::rstest;
use seqsync_engine::models::Arrow;
use seqsync_engine::sync::{IdentityPolicy, diff};
use seqsync_engine::{
    ActionContent, Cmd, FormatOptions, Identity, ModelTree, ParentRef, PatchOp, Session,
    SessionOptions, TextChange, TextOutcome, TextSync, apply_patch,
};

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

/// Identity of the first action (in document order) with this content.
fn find(model: &ModelTree, content: &ActionContent) -> Option<Identity> {
    model
        .preorder()
        .into_iter()
        .find(|id| model.get(*id) == Some(content))
}

fn message(from: &str, to: &str, text: &str) -> ActionContent {
    ActionContent::Message {
        from: from.into(),
        to: to.into(),
        arrow: Arrow::SYNC,
        text: text.into(),
    }
}

/// A run of user edits touching every kind of change the diff handles.
const EDITS: &[&str] = &[
    "A -> B: one\nA -> B: two\nA -> B: three\n",
    "A -> B: three\nA -> B: one\nA -> B: two\n",
    "title Flow\nA -> B: three\nalt ok\n  A -> B: one\nelse no\n  A -> B: two\nend\n",
    "title Flow\nalt ok\n  A -> B: one\n  A -> B: three\nelse no\n  A -> B: two\nend\n",
    "title Flow\nalt ok\n  loop again\n    A -> B: one\n  end\nend\nA -> B: two\n",
    "title Renamed\nA -> B: one\nA -> B: two\n",
    "",
    "participant A\nA -> B: one\n",
];

#[test]
fn every_text_patch_turns_the_old_model_into_the_new() -> anyhow::Result<()> {
    let mut session = Session::new(plain());
    for text in EDITS {
        let before = session.model().clone();
        let sync = synced(session.apply_text(TextChange::user(*text))?);
        assert_eq!(&apply_patch(&before, &sync.patch)?, session.model(), "{text:?}");
    }
    Ok(())
}

#[test]
fn every_model_patch_turns_the_old_model_into_the_new() -> anyhow::Result<()> {
    let mut session = Session::open("alt ok\n  A -> B: one\nend\nC -> D\n", plain())?;
    let block = session.model().children(ParentRef::Root).unwrap_or_default()[0];

    let batches = vec![
        vec![Cmd::AddBranch {
            block,
            index: 1,
            condition: "no".into(),
        }],
        vec![Cmd::Insert {
            parent: ParentRef::Branch { block, branch: 1 },
            index: 0,
            content: message("B", "A", "fallback"),
        }],
        vec![Cmd::RemoveBranch { block, branch: 0 }],
    ];
    for cmds in batches {
        let before = session.model().clone();
        let sync = session.apply_model(cmds)?;
        assert_eq!(&apply_patch(&before, &sync.patch)?, session.model());
    }
    assert_eq!(session.text(), "alt no\n  B -> A: fallback\nend\nC -> D\n");
    Ok(())
}

#[rstest]
#[case::line_added_above("X -> Y\nA -> B: one\nA -> B: two\n")]
#[case::lines_swapped("A -> B: two\nA -> B: one\n")]
#[case::wrapped_in_a_block("alt x\n  A -> B: one\n  A -> B: two\nend\n")]
#[case::reindented("   A -> B: one\n\tA -> B: two\n")]
#[case::comment_between("A -> B: one\n' note to self\nA -> B: two\n")]
fn unchanged_statements_keep_their_identity(#[case] edited: &str) -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\nA -> B: two\n", plain())?;
    let one = find(session.model(), &message("A", "B", "one"));
    let two = find(session.model(), &message("A", "B", "two"));

    session.apply_text(TextChange::user(edited))?;

    assert_eq!(find(session.model(), &message("A", "B", "one")), one);
    assert_eq!(find(session.model(), &message("A", "B", "two")), two);
    Ok(())
}

#[test]
fn repeated_messages_are_told_apart_by_position() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: ping\nA -> B: ping\n", plain())?;
    let before = session.model().children(ParentRef::Root).unwrap_or_default().to_vec();
    assert_eq!(before.len(), 2);
    assert_ne!(before[0], before[1]);

    let sync = synced(session.apply_text(TextChange::user("A -> B: ping\nA -> B: ping\nC -> D\n"))?);

    assert!(sync.conflicts.is_empty());
    let after = session.model().children(ParentRef::Root).unwrap_or_default().to_vec();
    assert_eq!(after[..2].to_vec(), before);
    Ok(())
}

#[test]
fn same_edits_produce_the_same_patches() -> anyhow::Result<()> {
    let run = || -> anyhow::Result<Vec<String>> {
        let mut session = Session::new(plain());
        let mut out = Vec::new();
        for text in EDITS {
            let sync = synced(session.apply_text(TextChange::user(*text))?);
            out.push(sync.patch.to_string());
        }
        Ok(out)
    };
    assert_eq!(run()?, run()?);
    Ok(())
}

#[test]
fn diff_is_a_pure_function_of_its_inputs() -> anyhow::Result<()> {
    let mut session = Session::open(EDITS[2], plain())?;
    let old = session.model().clone();
    session.apply_text(TextChange::user(EDITS[3]))?;
    let new = session.model().clone();

    let first = diff(&old, &new)?;
    let second = diff(&old, &new)?;
    assert_eq!(first.patch, second.patch);
    assert_eq!(first.rekeyed, second.rekeyed);
    Ok(())
}

#[test]
fn caret_stays_in_its_action_when_the_model_changes_above_it() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\nC -> D: two\n", plain())?;
    // "C -> D: two" starts at 12; put the caret after "C -> ".
    session.set_caret(17);
    let target = session.source_map().innermost_at(17, session.model());

    let sync = session.apply_model(vec![Cmd::Insert {
        parent: ParentRef::Root,
        index: 0,
        content: ActionContent::Title {
            text: "Flow".into(),
        },
    }])?;

    assert_eq!(sync.text, "title Flow\nA -> B: one\nC -> D: two\n");
    assert_eq!(sync.caret, 17 + "title Flow\n".len());
    assert_eq!(session.source_map().innermost_at(sync.caret, session.model()), target);
    Ok(())
}

#[test]
fn caret_in_a_deleted_action_moves_to_the_next_one() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\nC -> D: two\nE -> F\n", plain())?;
    session.set_caret(17);
    let ids = session.model().children(ParentRef::Root).unwrap_or_default().to_vec();

    let sync = session.apply_model(vec![Cmd::Delete { id: ids[1] }])?;

    assert_eq!(sync.text, "A -> B: one\nE -> F\n");
    assert_eq!(sync.caret, "A -> B: one\n".len());
    Ok(())
}

#[test]
fn selection_survives_a_regeneration() -> anyhow::Result<()> {
    let mut session = Session::open("A -> B: one\nC -> D: two\n", plain())?;
    session.set_selection(12..17);
    let ids = session.model().children(ParentRef::Root).unwrap_or_default().to_vec();

    session.apply_model(vec![Cmd::Reorder {
        id: ids[1],
        parent: ParentRef::Root,
        index: 0,
    }])?;

    assert_eq!(session.text(), "C -> D: two\nA -> B: one\n");
    assert_eq!(session.selection(), 0..5);
    Ok(())
}

#[test]
fn content_addressed_duplicates_conflict_and_pair_back_by_position() -> anyhow::Result<()> {
    let options = SessionOptions {
        policy: IdentityPolicy::ContentAddressed,
        ..plain()
    };
    let mut session = Session::new(options);
    let sync = synced(session.apply_text(TextChange::user("A -> B: hi\nA -> B: hi\n"))?);
    assert_eq!(sync.conflicts.len(), 1);
    let before = session.model().children(ParentRef::Root).unwrap_or_default().to_vec();
    assert_eq!(sync.conflicts[0].first, before[0]);
    assert_eq!(sync.conflicts[0].duplicate, before[1]);

    // A line after both: the unbound duplicate is paired back by position.
    session.apply_text(TextChange::user("A -> B: hi\nA -> B: hi\nC -> D\n"))?;
    let after = session.model().children(ParentRef::Root).unwrap_or_default().to_vec();
    assert_eq!(after[..2].to_vec(), before);
    Ok(())
}

#[test]
fn content_addressed_duplicate_loses_its_identity_when_it_changes_slot() -> anyhow::Result<()> {
    let moved = "A -> B: hi\nopt x\n  A -> B: hi\nend\n";

    let options = SessionOptions {
        policy: IdentityPolicy::ContentAddressed,
        ..plain()
    };
    let mut session = Session::open("A -> B: hi\nA -> B: hi\n", options)?;
    let duplicate = session.model().children(ParentRef::Root).unwrap_or_default()[1];
    let sync = synced(session.apply_text(TextChange::user(moved))?);
    assert!(!session.model().contains(duplicate));
    assert!(sync.patch.iter().any(|op| *op == PatchOp::Remove { id: duplicate }));

    // The default policy keys the second copy by its ordinal instead.
    let mut session = Session::open("A -> B: hi\nA -> B: hi\n", plain())?;
    let second = session.model().children(ParentRef::Root).unwrap_or_default()[1];
    session.apply_text(TextChange::user(moved))?;
    let block = session.model().children(ParentRef::Root).unwrap_or_default()[1];
    assert_eq!(
        session.model().children(ParentRef::Branch { block, branch: 0 }),
        Some(&[second][..])
    );
    Ok(())
}

#[test]
fn incremental_and_full_lexing_agree() -> anyhow::Result<()> {
    let full = SessionOptions {
        incremental: false,
        ..plain()
    };
    let mut incremental = Session::new(plain());
    let mut from_scratch = Session::new(full);
    for text in EDITS {
        let a = incremental.apply_text(TextChange::user(*text))?;
        let b = from_scratch.apply_text(TextChange::user(*text))?;
        assert_eq!(a, b, "{text:?}");
    }
    assert_eq!(incremental.model(), from_scratch.model());
    Ok(())
}

#[test]
fn regenerated_text_reparses_to_the_same_model() -> anyhow::Result<()> {
    let mut session = Session::open(EDITS[4], plain())?;
    let model = session.model().clone();
    let text = seqsync_engine::regenerate(&model, &session.options().format).text;

    // Feed the canonical text back as a user edit: nothing should change.
    let outcome = session.apply_text(TextChange::user(text))?;
    if let TextOutcome::Synced(sync) = outcome {
        assert!(sync.patch.is_empty(), "{}", sync.patch);
    }
    assert_eq!(session.model(), &model);
    Ok(())
}
