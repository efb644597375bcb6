use std::collections::BTreeMap;
use std::ops::Range;

use crate::models::action::Identity;
use crate::models::tree::ModelTree;

/// Byte range of every action in the current text.
///
/// Ranges start at the first significant token of the statement and end
/// after its newline; a block's range covers its whole body up to `end`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    spans: BTreeMap<Identity, Range<usize>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Identity, range: Range<usize>) {
        self.spans.insert(id, range);
    }

    pub fn get(&self, id: Identity) -> Option<Range<usize>> {
        self.spans.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Identity, &Range<usize>)> {
        self.spans.iter().map(|(id, range)| (*id, range))
    }

    /// Innermost action whose range contains `offset` (half-open, so the
    /// start of a line belongs to the statement on it).
    pub fn innermost_at(&self, offset: usize, tree: &ModelTree) -> Option<Identity> {
        let mut found = None;
        tree.walk(|id, _, _| {
            if let Some(range) = self.spans.get(&id)
                && range.contains(&offset)
            {
                // Document order visits parents before children.
                found = Some(id);
            }
        });
        found
    }

    pub fn rekey(&self, map: &BTreeMap<Identity, Identity>) -> SourceMap {
        SourceMap {
            spans: self
                .spans
                .iter()
                .map(|(id, range)| (map.get(id).copied().unwrap_or(*id), range.clone()))
                .collect(),
        }
    }
}
