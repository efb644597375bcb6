use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PatchError;
use crate::models::action::{ActionContent, Identity};

/// Where a child list lives: the document's top level, or one branch of a
/// block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParentRef {
    Root,
    Branch { block: Identity, branch: usize },
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentRef::Root => write!(f, "root"),
            ParentRef::Branch { block, branch } => write!(f, "{block}[{branch}]"),
        }
    }
}

/// A snapshot of the action model.
///
/// Actions live in an arena keyed by [`Identity`]; the structure is kept in
/// separate ordered child lists so no action points at its parent. Two trees
/// are equal when they hold the same identities with the same content in the
/// same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelTree {
    actions: BTreeMap<Identity, ActionContent>,
    root: Vec<Identity>,
    /// Child lists of every block, one per branch.
    branches: BTreeMap<Identity, Vec<Vec<Identity>>>,
    /// Derived from `root` and `branches`.
    parents: BTreeMap<Identity, ParentRef>,
}

impl ModelTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, id: Identity) -> Option<&ActionContent> {
        self.actions.get(&id)
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.actions.contains_key(&id)
    }

    /// Ordered children of a slot, or `None` if the slot does not exist.
    pub fn children(&self, parent: ParentRef) -> Option<&[Identity]> {
        match parent {
            ParentRef::Root => Some(&self.root),
            ParentRef::Branch { block, branch } => self
                .branches
                .get(&block)
                .and_then(|lists| lists.get(branch))
                .map(Vec::as_slice),
        }
    }

    /// Every slot owned by `id` (empty unless it is a block).
    pub fn slots_of(&self, id: Identity) -> Vec<ParentRef> {
        let count = self.branches.get(&id).map_or(0, Vec::len);
        (0..count)
            .map(|branch| ParentRef::Branch { block: id, branch })
            .collect()
    }

    pub fn parent_of(&self, id: Identity) -> Option<ParentRef> {
        self.parents.get(&id).copied()
    }

    pub fn index_of(&self, id: Identity) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children(parent)?.iter().position(|c| *c == id)
    }

    /// Every action's index among its siblings, in one pass.
    pub fn sibling_indices(&self) -> HashMap<Identity, usize> {
        std::iter::once(&self.root)
            .chain(self.branches.values().flatten())
            .flat_map(|list| list.iter().enumerate().map(|(at, id)| (*id, at)))
            .collect()
    }

    /// True if `ancestor` is `id` or contains it.
    pub fn is_within(&self, id: Identity, ancestor: Identity) -> bool {
        let mut current = id;
        loop {
            if current == ancestor {
                return true;
            }
            match self.parent_of(current) {
                Some(ParentRef::Branch { block, .. }) => current = block,
                _ => return false,
            }
        }
    }

    /// All identities in document order.
    pub fn preorder(&self) -> Vec<Identity> {
        let mut out = Vec::with_capacity(self.len());
        self.walk(|id, _, _| out.push(id));
        out
    }

    /// Visit every action in document order with its nesting depth.
    pub fn walk(&self, mut visit: impl FnMut(Identity, &ActionContent, usize)) {
        fn go(
            tree: &ModelTree,
            list: &[Identity],
            depth: usize,
            visit: &mut dyn FnMut(Identity, &ActionContent, usize),
        ) {
            for id in list {
                if let Some(content) = tree.actions.get(id) {
                    visit(*id, content, depth);
                }
                if let Some(lists) = tree.branches.get(id) {
                    for branch in lists {
                        go(tree, branch, depth + 1, visit);
                    }
                }
            }
        }
        go(self, &self.root, 0, &mut visit);
    }

    /// Identities of `id` and everything nested inside it.
    pub fn subtree(&self, id: Identity) -> Vec<Identity> {
        let mut out = vec![id];
        let mut i = 0;
        while i < out.len() {
            if let Some(lists) = self.branches.get(&out[i]) {
                out.extend(lists.iter().flatten().copied());
            }
            i += 1;
        }
        out
    }

    /// Copy of the tree with identities renamed through `map`; identities
    /// not in the map keep their name.
    pub fn rekey(&self, map: &BTreeMap<Identity, Identity>) -> ModelTree {
        let name = |id: &Identity| map.get(id).copied().unwrap_or(*id);
        let parent = |p: &ParentRef| match p {
            ParentRef::Root => ParentRef::Root,
            ParentRef::Branch { block, branch } => ParentRef::Branch {
                block: name(block),
                branch: *branch,
            },
        };
        ModelTree {
            actions: self
                .actions
                .iter()
                .map(|(id, c)| (name(id), c.clone()))
                .collect(),
            root: self.root.iter().map(name).collect(),
            branches: self
                .branches
                .iter()
                .map(|(id, lists)| {
                    let lists = lists
                        .iter()
                        .map(|list| list.iter().map(name).collect())
                        .collect();
                    (name(id), lists)
                })
                .collect(),
            parents: self
                .parents
                .iter()
                .map(|(id, p)| (name(id), parent(p)))
                .collect(),
        }
    }

    /// Append an action at the end of `parent`.
    pub fn push(
        &mut self,
        parent: ParentRef,
        id: Identity,
        content: ActionContent,
    ) -> Result<(), PatchError> {
        let index = self.slot(parent)?.len();
        self.insert(parent, index, id, content)
    }

    /// Insert a new action; blocks start with one empty list per condition.
    pub fn insert(
        &mut self,
        parent: ParentRef,
        index: usize,
        id: Identity,
        content: ActionContent,
    ) -> Result<(), PatchError> {
        if self.contains(id) {
            return Err(PatchError::DuplicateIdentity(id));
        }
        let list = self.slot_mut(parent)?;
        if index > list.len() {
            return Err(PatchError::IndexOutOfRange {
                parent,
                index,
                len: list.len(),
            });
        }
        list.insert(index, id);

        let count = content.branch_count();
        if matches!(content, ActionContent::Block { .. }) {
            self.branches.insert(id, vec![Vec::new(); count]);
        }
        self.actions.insert(id, content);
        self.parents.insert(id, parent);
        Ok(())
    }

    /// Remove an action and everything nested inside it.
    pub fn remove(&mut self, id: Identity) -> Result<Vec<Identity>, PatchError> {
        let parent = self
            .parent_of(id)
            .ok_or(PatchError::UnknownIdentity(id))?;
        self.slot_mut(parent)?.retain(|c| *c != id);

        let removed = self.subtree(id);
        for gone in &removed {
            self.actions.remove(gone);
            self.branches.remove(gone);
            self.parents.remove(gone);
        }
        Ok(removed)
    }

    /// Move an action to `index` of `parent`. The index is counted after the
    /// action has been detached from its current position.
    pub fn move_to(
        &mut self,
        id: Identity,
        parent: ParentRef,
        index: usize,
    ) -> Result<(), PatchError> {
        let from = self
            .parent_of(id)
            .ok_or(PatchError::UnknownIdentity(id))?;
        if let ParentRef::Branch { block, .. } = parent
            && self.contains(block)
            && self.is_within(block, id)
        {
            return Err(PatchError::CyclicMove(id));
        }
        // Validate the destination before detaching anything.
        let len = self.slot(parent)?.len() - usize::from(from == parent);
        if index > len {
            return Err(PatchError::IndexOutOfRange { parent, index, len });
        }

        self.slot_mut(from)?.retain(|c| *c != id);
        self.slot_mut(parent)?.insert(index, id);
        self.parents.insert(id, parent);
        Ok(())
    }

    /// Replace an action's content.
    ///
    /// A block that gains conditions gets empty branches appended; a block
    /// that loses conditions drops trailing branches, which must already be
    /// empty.
    pub fn update(&mut self, id: Identity, content: ActionContent) -> Result<(), PatchError> {
        if !self.contains(id) {
            return Err(PatchError::UnknownIdentity(id));
        }
        let wanted = content.branch_count();
        let is_block = matches!(content, ActionContent::Block { .. });
        let lists = self.branches.get(&id).cloned().unwrap_or_default();

        if let Some(branch) = (wanted..lists.len()).find(|b| !lists[*b].is_empty()) {
            return Err(PatchError::NonEmptyBranch { block: id, branch });
        }

        if is_block {
            let mut lists = lists;
            lists.resize(wanted, Vec::new());
            self.branches.insert(id, lists);
        } else {
            self.branches.remove(&id);
        }
        self.actions.insert(id, content);
        Ok(())
    }

    fn slot(&self, parent: ParentRef) -> Result<&Vec<Identity>, PatchError> {
        match parent {
            ParentRef::Root => Ok(&self.root),
            ParentRef::Branch { block, branch } => self
                .branches
                .get(&block)
                .and_then(|lists| lists.get(branch))
                .ok_or(PatchError::BadParent(parent)),
        }
    }

    fn slot_mut(&mut self, parent: ParentRef) -> Result<&mut Vec<Identity>, PatchError> {
        match parent {
            ParentRef::Root => Ok(&mut self.root),
            ParentRef::Branch { block, branch } => self
                .branches
                .get_mut(&block)
                .and_then(|lists| lists.get_mut(branch))
                .ok_or(PatchError::BadParent(parent)),
        }
    }
}
