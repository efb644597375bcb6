//! Stable identities across reparses.
//!
//! Every action gets an [`IdentityKey`] derived from its kind and a
//! structural hash of its significant fields. The [`IdentityManager`] keeps
//! a two-way table between keys and [`Identity`]s, so reparsing unchanged
//! text resolves every action to the identity it had before.
//!
//! ## Equal content
//!
//! Two actions with identical content share a fingerprint. What happens
//! next depends on the [`IdentityPolicy`]:
//!
//! - [`IdentityPolicy::Disambiguated`] (default) adds an ordinal counting
//!   earlier actions with the same fingerprint in document order, so
//!   repeated messages get distinct, stable keys.
//! - [`IdentityPolicy::ContentAddressed`] treats equal content as the same
//!   logical element. Only the first occurrence in a snapshot can own the
//!   key; every later one is an [`IdentityConflict`] and receives a fresh
//!   identity that is not bound to any key. Such identities only survive
//!   the next reparse because the diff pairs them back by position, so they
//!   are less stable than keyed ones. That is a known limitation of the
//!   policy, not a hash defect.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{ActionContent, ActionKind, Identity, ModelTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    #[default]
    Disambiguated,
    ContentAddressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub kind: ActionKind,
    pub fingerprint: u64,
    /// Earlier actions with the same fingerprint; always 0 when content
    /// addressed.
    pub ordinal: u32,
}

impl IdentityKey {
    pub fn of(content: &ActionContent, ordinal: u32) -> Self {
        Self {
            kind: content.kind(),
            fingerprint: content.fingerprint(),
            ordinal,
        }
    }
}

/// Two actions in one snapshot that resolve to the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConflict {
    pub key: IdentityKey,
    /// The action that kept the key.
    pub first: Identity,
    /// The later action, given an unbound identity.
    pub duplicate: Identity,
}

impl fmt::Display for IdentityConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} has the same content as {}; {} keeps the identity",
            self.duplicate, self.first, self.first
        )
    }
}

/// Computes keys for actions visited in document order.
#[derive(Debug)]
pub struct KeyAssigner {
    policy: IdentityPolicy,
    seen: HashMap<(ActionKind, u64), u32>,
}

/// A computed key. `duplicate` is set when the key was already handed out
/// in this pass (content addressed policy only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignedKey {
    pub key: IdentityKey,
    pub duplicate: bool,
}

impl KeyAssigner {
    pub fn new(policy: IdentityPolicy) -> Self {
        Self {
            policy,
            seen: HashMap::new(),
        }
    }

    pub fn next(&mut self, content: &ActionContent) -> AssignedKey {
        let count = self
            .seen
            .entry((content.kind(), content.fingerprint()))
            .or_insert(0);
        let earlier = *count;
        *count += 1;
        match self.policy {
            IdentityPolicy::Disambiguated => AssignedKey {
                key: IdentityKey::of(content, earlier),
                duplicate: false,
            },
            IdentityPolicy::ContentAddressed => AssignedKey {
                key: IdentityKey::of(content, 0),
                duplicate: earlier > 0,
            },
        }
    }
}

/// The key ↔ identity table for one session.
#[derive(Debug, Clone)]
pub struct IdentityManager {
    policy: IdentityPolicy,
    next: u64,
    by_key: HashMap<IdentityKey, Identity>,
    by_id: HashMap<Identity, IdentityKey>,
}

impl Default for IdentityManager {
    fn default() -> Self {
        Self::new(IdentityPolicy::default())
    }
}

impl IdentityManager {
    pub fn new(policy: IdentityPolicy) -> Self {
        Self {
            policy,
            next: 1,
            by_key: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    pub fn assigner(&self) -> KeyAssigner {
        KeyAssigner::new(self.policy)
    }

    /// Number of bound keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// A fresh identity, bound to nothing.
    pub fn mint(&mut self) -> Identity {
        let id = Identity(self.next);
        self.next += 1;
        id
    }

    /// The identity bound to `key`, minting and binding one if there is none.
    pub fn resolve(&mut self, key: &IdentityKey) -> Identity {
        if let Some(id) = self.lookup(key) {
            return id;
        }
        let id = self.mint();
        self.bind(*key, id);
        id
    }

    /// Bind `key` to `id`, dropping whatever either was bound to before.
    ///
    /// Used when two differently keyed actions are asserted to be the same
    /// element: a GUI edit, or the diff pairing an edited line with its old
    /// self.
    pub fn preserve(&mut self, key: IdentityKey, id: Identity) {
        if self.by_key.get(&key) == Some(&id) {
            return;
        }
        if let Some(old_key) = self.by_id.remove(&id) {
            self.by_key.remove(&old_key);
        }
        self.bind(key, id);
        // Never mint an identity that was handed in from outside.
        self.next = self.next.max(id.0 + 1);
    }

    /// Forget the binding for `key`.
    pub fn release(&mut self, key: &IdentityKey) -> Option<Identity> {
        let id = self.by_key.remove(key)?;
        self.by_id.remove(&id);
        Some(id)
    }

    pub fn lookup(&self, key: &IdentityKey) -> Option<Identity> {
        self.by_key.get(key).copied()
    }

    pub fn key_of(&self, id: Identity) -> Option<IdentityKey> {
        self.by_id.get(&id).copied()
    }

    /// Release every key whose identity is no longer in `model`.
    pub fn retain_live(&mut self, model: &ModelTree) {
        self.by_key.retain(|_, id| model.contains(*id));
        self.by_id.retain(|id, _| model.contains(*id));
    }

    /// Recompute every key in `model` and bind it to the action's current
    /// identity, so the next reparse of the same content resolves to the
    /// same identities. Returns the conflicts found along the way.
    pub fn rebind(&mut self, model: &ModelTree) -> Vec<IdentityConflict> {
        let mut assigner = self.assigner();
        let mut conflicts = Vec::new();
        let mut owners: HashMap<IdentityKey, Identity> = HashMap::new();

        model.walk(|id, content, _| {
            let assigned = assigner.next(content);
            if assigned.duplicate {
                if let Some(first) = owners.get(&assigned.key) {
                    conflicts.push(IdentityConflict {
                        key: assigned.key,
                        first: *first,
                        duplicate: id,
                    });
                }
                // A duplicate must not keep a key from an earlier binding.
                if let Some(stale) = self.by_id.remove(&id) {
                    self.by_key.remove(&stale);
                }
            } else {
                owners.insert(assigned.key, id);
                self.preserve(assigned.key, id);
            }
        });

        self.retain_live(model);
        log::debug!(
            "rebound {} keys ({} conflicts)",
            self.by_key.len(),
            conflicts.len()
        );
        conflicts
    }

    fn bind(&mut self, key: IdentityKey, id: Identity) {
        if let Some(previous) = self.by_key.insert(key, id) {
            self.by_id.remove(&previous);
        }
        self.by_id.insert(id, key);
    }
}
