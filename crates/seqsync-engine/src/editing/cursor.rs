//! Caret and selection tracking across a sync cycle.
//!
//! Before the text is rewritten the caret is captured relative to the
//! innermost action containing it. Afterwards the same identity is looked
//! up in the new source map and the caret lands at the same distance into
//! it. If the action is gone, the caret moves to the start of the nearest
//! surviving action that followed it, or to the end of the document.
//!
//! A caret outside every action (blank lines, indentation, the envelope)
//! is carried through an xi-rope `Delta` of the text change instead.

use std::ops::Range;

use xi_rope::delta::{Builder, Transformer};
use xi_rope::{Delta, Rope, RopeInfo};

use crate::models::{Identity, ModelTree, ParentRef, SourceMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaretAnchor {
    /// `relative` bytes into action `id`.
    Node {
        id: Identity,
        relative: usize,
        /// Where to go if `id` does not survive, nearest first.
        fallback: Vec<Identity>,
    },
    Raw { offset: usize },
}

/// Both ends of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionAnchor {
    pub start: CaretAnchor,
    pub end: CaretAnchor,
}

pub struct CursorTracker;

impl CursorTracker {
    pub fn capture(offset: usize, spans: &SourceMap, model: &ModelTree) -> CaretAnchor {
        let Some(id) = spans.innermost_at(offset, model) else {
            return CaretAnchor::Raw { offset };
        };
        let start = spans.get(id).map_or(offset, |range| range.start);
        CaretAnchor::Node {
            id,
            relative: offset - start,
            fallback: following(model, id),
        }
    }

    /// Resolve `anchor` against the new source map. `delta` maps old text
    /// offsets to new ones and is only needed for raw anchors.
    pub fn resolve(
        anchor: &CaretAnchor,
        spans: &SourceMap,
        text_len: usize,
        delta: Option<&Delta<RopeInfo>>,
    ) -> usize {
        match anchor {
            CaretAnchor::Node {
                id,
                relative,
                fallback,
            } => {
                if let Some(range) = spans.get(*id) {
                    return range.start + (*relative).min(range.len());
                }
                fallback
                    .iter()
                    .find_map(|id| spans.get(*id))
                    .map_or(text_len, |range| range.start)
            }
            CaretAnchor::Raw { offset } => {
                let moved = match delta {
                    Some(delta) => Transformer::new(delta).transform(*offset, true),
                    None => *offset,
                };
                moved.min(text_len)
            }
        }
    }

    pub fn capture_selection(
        selection: Range<usize>,
        spans: &SourceMap,
        model: &ModelTree,
    ) -> SelectionAnchor {
        SelectionAnchor {
            start: Self::capture(selection.start, spans, model),
            end: Self::capture(selection.end, spans, model),
        }
    }

    pub fn resolve_selection(
        anchor: &SelectionAnchor,
        spans: &SourceMap,
        text_len: usize,
        delta: Option<&Delta<RopeInfo>>,
    ) -> Range<usize> {
        let start = Self::resolve(&anchor.start, spans, text_len, delta);
        let end = Self::resolve(&anchor.end, spans, text_len, delta);
        start.min(end)..start.max(end)
    }
}

/// Actions after `id` in document order that are not inside it: later
/// siblings, then later branches of the enclosing block, then whatever
/// follows that block, outwards.
fn following(model: &ModelTree, id: Identity) -> Vec<Identity> {
    let mut out = Vec::new();
    let mut current = id;
    while let (Some(parent), Some(index)) = (model.parent_of(current), model.index_of(current)) {
        if let Some(siblings) = model.children(parent) {
            out.extend(siblings.iter().skip(index + 1));
        }
        let ParentRef::Branch { block, branch } = parent else {
            break;
        };
        for later in model.slots_of(block).into_iter().skip(branch + 1) {
            out.extend(model.children(later).unwrap_or_default());
        }
        current = block;
    }
    out
}

/// The delta from `old` to `new`: one replacement between their common
/// prefix and common suffix.
pub fn text_delta(old: &str, new: &str) -> Delta<RopeInfo> {
    let prefix = common_prefix(old, new);
    let suffix = common_suffix(&old[prefix..], &new[prefix..]);

    let mut builder = Builder::new(old.len());
    builder.replace(
        prefix..old.len() - suffix,
        Rope::from(&new[prefix..new.len() - suffix]),
    );
    builder.build()
}

fn common_prefix(a: &str, b: &str) -> usize {
    let mut len = a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count();
    while !a.is_char_boundary(len) || !b.is_char_boundary(len) {
        len -= 1;
    }
    len
}

fn common_suffix(a: &str, b: &str) -> usize {
    let mut len = a
        .bytes()
        .rev()
        .zip(b.bytes().rev())
        .take_while(|(x, y)| x == y)
        .count();
    while !a.is_char_boundary(a.len() - len) || !b.is_char_boundary(b.len() - len) {
        len -= 1;
    }
    len
}
