//! Actor catalog seam.
//!
//! The host owns the master data behind participant names; the engine only
//! reads it, keyed by id, to build participant declarations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::ParticipantKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogActor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ParticipantKind,
}

pub trait ActorCatalog {
    fn actor(&self, id: &str) -> Option<CatalogActor>;

    /// Every actor, ordered by id.
    fn actors(&self) -> Vec<CatalogActor>;
}

/// An in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    actors: BTreeMap<String, CatalogActor>,
}

impl StaticCatalog {
    /// Later entries replace earlier ones with the same id.
    pub fn new(actors: impl IntoIterator<Item = CatalogActor>) -> Self {
        Self {
            actors: actors.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl ActorCatalog for StaticCatalog {
    fn actor(&self, id: &str) -> Option<CatalogActor> {
        self.actors.get(id).cloned()
    }

    fn actors(&self) -> Vec<CatalogActor> {
        self.actors.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: &str, name: &str) -> CatalogActor {
        CatalogActor {
            id: id.into(),
            name: name.into(),
            kind: ParticipantKind::default(),
        }
    }

    #[test]
    fn lookup_by_id() {
        let catalog = StaticCatalog::new([actor("db", "Database"), actor("api", "API")]);
        assert_eq!(catalog.actor("db").map(|a| a.name), Some("Database".to_string()));
        assert_eq!(catalog.actor("nope"), None);
    }

    #[test]
    fn actors_are_ordered_and_deduplicated() {
        let catalog = StaticCatalog::new([actor("b", "B"), actor("a", "A"), actor("b", "Bee")]);
        let names: Vec<String> = catalog.actors().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["A", "Bee"]);
        assert_eq!(catalog.len(), 2);
    }
}
