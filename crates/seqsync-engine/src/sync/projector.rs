//! AST → action model.
//!
//! Statements become actions in document order, each resolved to an
//! identity through the [`IdentityManager`]. The projection also records the
//! byte range each action came from, which the cursor tracker needs.

use seqsync_syntax::ast::{Block, Diagram, Statement};

use crate::error::PatchError;
use crate::models::{ActionContent, Identity, ModelTree, ParentRef, SourceMap};
use crate::sync::identity::{IdentityConflict, IdentityManager, KeyAssigner};

#[derive(Debug, Clone)]
pub struct Projection {
    pub model: ModelTree,
    pub source_map: SourceMap,
    pub conflicts: Vec<IdentityConflict>,
}

/// Project a lowered diagram into a fresh model.
pub fn project(
    diagram: &Diagram,
    identities: &mut IdentityManager,
) -> Result<Projection, PatchError> {
    let mut projector = Projector {
        assigner: identities.assigner(),
        identities,
        model: ModelTree::new(),
        source_map: SourceMap::new(),
        conflicts: Vec::new(),
    };
    projector.statements(&diagram.statements, ParentRef::Root)?;

    log::debug!(
        "projected {} actions ({} conflicts)",
        projector.model.len(),
        projector.conflicts.len()
    );
    Ok(Projection {
        model: projector.model,
        source_map: projector.source_map,
        conflicts: projector.conflicts,
    })
}

/// The action a statement projects to, without its children.
pub fn content_of(statement: &Statement) -> ActionContent {
    match statement {
        Statement::Title(title) => ActionContent::Title {
            text: title.text.clone(),
        },
        Statement::Participant(decl) => ActionContent::Participant {
            kind: decl.kind,
            name: decl.name.clone(),
            alias: decl.alias.clone(),
        },
        Statement::Message(message) => ActionContent::Message {
            from: message.from.clone(),
            to: message.to.clone(),
            arrow: message.arrow,
            text: message.text.clone(),
        },
        Statement::Note(note) => ActionContent::Note {
            placement: note.placement,
            targets: note.targets.clone(),
            text: note.text.clone(),
        },
        Statement::Activation(activation) => ActionContent::Activation {
            target: activation.target.clone(),
            active: activation.active,
        },
        Statement::Block(block) => ActionContent::Block {
            kind: block.kind,
            conditions: block.branches.iter().map(|b| b.condition.clone()).collect(),
        },
    }
}

struct Projector<'a> {
    identities: &'a mut IdentityManager,
    assigner: KeyAssigner,
    model: ModelTree,
    source_map: SourceMap,
    conflicts: Vec<IdentityConflict>,
}

impl Projector<'_> {
    fn statements(&mut self, statements: &[Statement], parent: ParentRef) -> Result<(), PatchError> {
        for statement in statements {
            let content = content_of(statement);
            let id = self.identify(&content);
            self.model.push(parent, id, content)?;
            self.source_map.insert(id, statement.span().range());

            if let Statement::Block(block) = statement {
                self.branches(id, block)?;
            }
        }
        Ok(())
    }

    fn branches(&mut self, id: Identity, block: &Block) -> Result<(), PatchError> {
        for (branch, body) in block.branches.iter().enumerate() {
            self.statements(&body.statements, ParentRef::Branch { block: id, branch })?;
        }
        Ok(())
    }

    fn identify(&mut self, content: &ActionContent) -> Identity {
        let assigned = self.assigner.next(content);
        if !assigned.duplicate {
            return self.identities.resolve(&assigned.key);
        }

        let duplicate = self.identities.mint();
        if let Some(first) = self.identities.lookup(&assigned.key) {
            let conflict = IdentityConflict {
                key: assigned.key,
                first,
                duplicate,
            };
            log::warn!("identity conflict: {conflict} ({})", content.summary());
            self.conflicts.push(conflict);
        }
        duplicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::identity::IdentityPolicy;
    use pretty_assertions::assert_eq;
    use seqsync_syntax::parse;

    fn project_text(text: &str, identities: &mut IdentityManager) -> Projection {
        let diagram = Diagram::lower(&parse(text).syntax(), text);
        project(&diagram, identities).unwrap()
    }

    #[test]
    fn first_message_is_id1() {
        let mut ids = IdentityManager::default();
        let projection = project_text("A -> B: hi", &mut ids);
        assert_eq!(projection.model.preorder(), vec![Identity(1)]);
        assert_eq!(projection.source_map.get(Identity(1)), Some(0..10));
    }

    #[test]
    fn unchanged_text_reprojects_to_the_same_identities() {
        let text = "participant A\nloop retry\n  A -> B: ping\n  A -> B: ping\nend\n";
        let mut ids = IdentityManager::default();
        let first = project_text(text, &mut ids);
        let second = project_text(text, &mut ids);
        assert_eq!(first.model, second.model);
        assert_eq!(first.model.len(), 4);
    }

    #[test]
    fn blocks_own_their_branches() {
        let mut ids = IdentityManager::default();
        let projection =
            project_text("alt ok\n  A -> B\nelse no\n  A -> C\nend\n", &mut ids);
        let block = projection.model.children(ParentRef::Root).unwrap()[0];
        assert_eq!(
            projection.model.get(block),
            Some(&ActionContent::Block {
                kind: seqsync_syntax::BlockKind::Alt,
                conditions: vec!["ok".into(), "no".into()],
            })
        );
        assert_eq!(projection.model.slots_of(block).len(), 2);
        assert_eq!(projection.source_map.get(block), Some(0..37));
    }

    #[test]
    fn content_addressed_duplicates_conflict() {
        let mut ids = IdentityManager::new(IdentityPolicy::ContentAddressed);
        let projection = project_text("A -> B: ping\nA -> B: ping\n", &mut ids);
        assert_eq!(projection.conflicts.len(), 1);
        assert_eq!(projection.conflicts[0].first, Identity(1));
        assert_eq!(projection.conflicts[0].duplicate, Identity(2));
        assert_eq!(projection.model.len(), 2);
    }
}
