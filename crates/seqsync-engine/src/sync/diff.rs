//! # Diff Engine
//!
//! `diff(old, new)` computes the [`Patch`] that turns one model snapshot into
//! the next. The patch is built in phases:
//!
//! 1. **Pair by identity.** Actions present on both sides are the same
//!    element.
//! 2. **Pair leftovers.** A new action nobody recognised (its content, and
//!    so its key, changed) is matched to an unpaired old action of the same
//!    kind in the same parent slot, nearest index first, lower old index on
//!    ties. The new action takes the old identity; this is what keeps `id1`
//!    alive when `A -> B: hi` becomes `A -> B: hi there`.
//! 3. **Growing updates.** Content changes that keep or add branches go
//!    first, so moves and inserts have somewhere to land.
//! 4. **Insert/move walk.** Slots are visited in document order. In each,
//!    the longest run of children already in the right relative order stays
//!    put; every other child is moved (if it exists anywhere) or inserted
//!    right after its predecessor. Reordering never becomes remove+insert.
//! 5. **Removals** of the topmost old actions that have no counterpart.
//! 6. **Shrinking updates**, once the branches they drop are empty.
//!
//! The patch is then applied to a copy of the old model and compared with
//! the new one. A mismatch is a [`SyncError::DiffInconsistency`].
//!
//! Everything iterates in document or identity order, so the same pair of
//! trees always yields the same patch.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::editing::patch::{Patch, PatchOp, apply_op, apply_patch};
use crate::error::SyncError;
use crate::models::{ActionKind, Identity, ModelTree, ParentRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Pair unmatched actions by kind and position (phase 2). Off when both
    /// trees already share identities, e.g. undo.
    pub pair_leftovers: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            pair_leftovers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub patch: Patch,
    /// New-side identity → the old identity it was paired with.
    pub rekeyed: BTreeMap<Identity, Identity>,
}

impl Diff {
    /// The new tree as the patch produces it: `new` with paired identities
    /// renamed to their old names.
    pub fn target(&self, new: &ModelTree) -> ModelTree {
        new.rekey(&self.rekeyed)
    }
}

pub fn diff(old: &ModelTree, new: &ModelTree) -> Result<Diff, SyncError> {
    diff_with(old, new, DiffOptions::default())
}

pub fn diff_with(old: &ModelTree, new: &ModelTree, options: DiffOptions) -> Result<Diff, SyncError> {
    let rekeyed = if options.pair_leftovers {
        pair_leftovers(old, new)
    } else {
        BTreeMap::new()
    };
    let target = new.rekey(&rekeyed);

    let patch = Planner::new(old, &target).plan()?;
    verify(old, &patch, &target)?;

    log::debug!("diff: {} ops, {} paired by position", patch.len(), rekeyed.len());
    Ok(Diff { patch, rekeyed })
}

/// Check that `patch` turns `old` into exactly `expected`.
pub fn verify(old: &ModelTree, patch: &Patch, expected: &ModelTree) -> Result<(), SyncError> {
    let applied = apply_patch(old, patch)
        .map_err(|e| SyncError::DiffInconsistency(format!("patch does not apply: {e}")))?;
    if applied != *expected {
        return Err(SyncError::DiffInconsistency(
            "patch does not reproduce the new model".to_string(),
        ));
    }
    Ok(())
}

/// Phase 2: match new actions that have no old identity to unpaired old
/// actions of the same kind in the same slot.
fn pair_leftovers(old: &ModelTree, new: &ModelTree) -> BTreeMap<Identity, Identity> {
    let old_index = old.sibling_indices();
    let new_index = new.sibling_indices();

    // Unpaired old actions by slot and kind, in document order.
    let mut pool: HashMap<(ParentRef, ActionKind), Vec<(usize, Identity)>> = HashMap::new();
    for id in old.preorder() {
        if new.contains(id) {
            continue;
        }
        if let (Some(content), Some(parent), Some(at)) =
            (old.get(id), old.parent_of(id), old_index.get(&id))
        {
            pool.entry((parent, content.kind())).or_default().push((*at, id));
        }
    }

    let mut rekeyed = BTreeMap::new();
    let mut taken = BTreeSet::new();

    for id in new.preorder() {
        if old.contains(id) {
            continue;
        }
        let (Some(content), Some(parent), Some(index)) =
            (new.get(id), new.parent_of(id), new_index.get(&id))
        else {
            continue;
        };
        // The slot as the old tree names it.
        let slot = match parent {
            ParentRef::Root => ParentRef::Root,
            ParentRef::Branch { block, branch } => ParentRef::Branch {
                block: rekeyed.get(&block).copied().unwrap_or(block),
                branch,
            },
        };

        let best = pool
            .get(&(slot, content.kind()))
            .into_iter()
            .flatten()
            .filter(|(_, candidate)| !taken.contains(candidate))
            .map(|(at, candidate)| (at.abs_diff(*index), *at, *candidate))
            .min();

        if let Some((_, _, candidate)) = best {
            rekeyed.insert(id, candidate);
            taken.insert(candidate);
        }
    }
    rekeyed
}

/// Builds the patch while replaying it on a working copy, so every index
/// it emits is valid at the point it is applied.
struct Planner<'a> {
    old: &'a ModelTree,
    target: &'a ModelTree,
    work: ModelTree,
    patch: Patch,
}

impl<'a> Planner<'a> {
    fn new(old: &'a ModelTree, target: &'a ModelTree) -> Self {
        Self {
            old,
            target,
            work: old.clone(),
            patch: Patch::new(),
        }
    }

    fn plan(mut self) -> Result<Patch, SyncError> {
        let order = self.target.preorder();

        let mut shrinking = Vec::new();
        for id in &order {
            let (Some(before), Some(after)) = (self.old.get(*id), self.target.get(*id)) else {
                continue;
            };
            if before == after {
                continue;
            }
            if after.branch_count() >= before.branch_count() {
                self.emit(PatchOp::Update {
                    id: *id,
                    content: after.clone(),
                })?;
            } else {
                shrinking.push(*id);
            }
        }

        self.place(ParentRef::Root)?;
        for id in &order {
            for slot in self.target.slots_of(*id) {
                self.place(slot)?;
            }
        }

        let doomed: Vec<Identity> = self
            .work
            .preorder()
            .into_iter()
            .filter(|id| !self.target.contains(*id))
            .collect();
        for id in doomed {
            // Already gone if an ancestor was removed.
            if self.work.contains(id) {
                self.emit(PatchOp::Remove { id })?;
            }
        }

        for id in shrinking {
            let content = self
                .target
                .get(id)
                .cloned()
                .ok_or(SyncError::UnknownIdentity(id))?;
            self.emit(PatchOp::Update { id, content })?;
        }

        Ok(self.patch)
    }

    /// Make the children of `slot` in the working tree match the target,
    /// apart from children that will later move away or be removed.
    fn place(&mut self, slot: ParentRef) -> Result<(), SyncError> {
        let desired: Vec<Identity> = self
            .target
            .children(slot)
            .map(<[Identity]>::to_vec)
            .unwrap_or_default();
        let current: Vec<Identity> = self
            .work
            .children(slot)
            .map(<[Identity]>::to_vec)
            .unwrap_or_default();

        let current: HashMap<Identity, usize> = current
            .iter()
            .enumerate()
            .map(|(at, id)| (*id, at))
            .collect();
        let in_place: Vec<(Identity, usize)> = desired
            .iter()
            .filter_map(|id| current.get(id).map(|at| (*id, *at)))
            .collect();
        let positions: Vec<usize> = in_place.iter().map(|(_, at)| *at).collect();
        let stable: BTreeSet<Identity> = longest_increasing(&positions)
            .into_iter()
            .map(|i| in_place[i].0)
            .collect();

        let mut previous: Option<Identity> = None;
        for id in desired {
            if !stable.contains(&id) {
                let index = self.index_after(previous, id, slot)?;
                if self.work.contains(id) {
                    self.emit(PatchOp::Move {
                        id,
                        parent: slot,
                        index,
                    })?;
                } else {
                    let content = self
                        .target
                        .get(id)
                        .cloned()
                        .ok_or(SyncError::UnknownIdentity(id))?;
                    self.emit(PatchOp::Insert {
                        parent: slot,
                        index,
                        id,
                        content,
                    })?;
                }
            }
            previous = Some(id);
        }
        Ok(())
    }

    /// Index just after `previous` in `slot`, counted as if `id` had
    /// already been detached.
    fn index_after(
        &self,
        previous: Option<Identity>,
        id: Identity,
        slot: ParentRef,
    ) -> Result<usize, SyncError> {
        let Some(previous) = previous else {
            return Ok(0);
        };
        let list = self
            .work
            .children(slot)
            .ok_or_else(|| SyncError::DiffInconsistency(format!("missing slot {slot}")))?;
        let at = list.iter().position(|c| *c == previous).ok_or_else(|| {
            SyncError::DiffInconsistency(format!("{previous} is not in {slot}"))
        })?;
        match list.iter().position(|c| *c == id) {
            Some(own) if own < at => Ok(at),
            _ => Ok(at + 1),
        }
    }

    fn emit(&mut self, op: PatchOp) -> Result<(), SyncError> {
        apply_op(&mut self.work, &op)
            .map_err(|e| SyncError::DiffInconsistency(format!("{op}: {e}")))?;
        self.patch.push(op);
        Ok(())
    }
}

/// Indices of one longest strictly increasing subsequence of `values`.
fn longest_increasing(values: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; values.len()];

    for (i, value) in values.iter().enumerate() {
        let at = tails.partition_point(|t| values[*t] < *value);
        if at > 0 {
            previous[i] = Some(tails[at - 1]);
        }
        if at == tails.len() {
            tails.push(i);
        } else {
            tails[at] = i;
        }
    }

    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(i);
        cursor = previous[i];
    }
    out.reverse();
    out
}
