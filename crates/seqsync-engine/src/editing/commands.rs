use seqsync_syntax::SyntaxKind;
use seqsync_syntax::lexer::lex;

use crate::catalog::ActorCatalog;
use crate::editing::patch::{Patch, PatchOp, apply_op};
use crate::error::{PatchError, SyncError};
use crate::models::{ActionContent, Identity, ModelTree, ParentRef};
use crate::sync::identity::IdentityManager;

/// A model edit issued by the GUI, addressed by identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Insert a new action; blocks arrive with empty branches.
    Insert {
        parent: ParentRef,
        index: usize,
        content: ActionContent,
    },
    /// Replace an action's content. Kind and branch count must stay the
    /// same; use `AddBranch`/`RemoveBranch` to reshape a block.
    Edit { id: Identity, content: ActionContent },
    Delete { id: Identity },
    /// Move an action; `index` counts after detaching it.
    Reorder {
        id: Identity,
        parent: ParentRef,
        index: usize,
    },
    /// Open a new `else` branch at `index`, shifting later branches down.
    AddBranch {
        block: Identity,
        index: usize,
        condition: String,
    },
    /// Drop a branch and everything in it.
    RemoveBranch { block: Identity, branch: usize },
}

impl Cmd {
    /// Declare a participant picked from the actor catalog.
    ///
    /// The catalog id becomes the alias when it differs from the display
    /// name, so messages can keep using the short id.
    pub fn insert_participant_from_catalog(
        catalog: &dyn ActorCatalog,
        actor_id: &str,
        index: usize,
    ) -> Result<Cmd, SyncError> {
        let actor = catalog
            .actor(actor_id)
            .ok_or_else(|| SyncError::Catalog(format!("no actor with id `{actor_id}`")))?;
        let alias = (actor.id != actor.name).then_some(actor.id);
        Ok(Cmd::Insert {
            parent: ParentRef::Root,
            index,
            content: ActionContent::Participant {
                kind: actor.kind,
                name: actor.name,
                alias,
            },
        })
    }
}

/// The outcome of compiling a command batch.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub patch: Patch,
    /// `model` with the patch applied.
    pub model: ModelTree,
}

/// Compile `cmds` against `model` into one patch.
///
/// Commands run in order, each against the model the previous ones left,
/// so a batch may insert a block and then fill it. New actions get fresh
/// identities from `identities`. Any invalid command rejects the batch.
pub fn compile(
    model: &ModelTree,
    identities: &mut IdentityManager,
    cmds: &[Cmd],
) -> Result<Compiled, SyncError> {
    let mut compiler = Compiler {
        model: model.clone(),
        patch: Patch::new(),
    };
    for cmd in cmds {
        compiler.command(cmd, identities)?;
    }
    log::debug!("compiled {} commands into {} ops", cmds.len(), compiler.patch.len());
    Ok(Compiled {
        patch: compiler.patch,
        model: compiler.model,
    })
}

struct Compiler {
    model: ModelTree,
    patch: Patch,
}

impl Compiler {
    fn command(&mut self, cmd: &Cmd, identities: &mut IdentityManager) -> Result<(), SyncError> {
        match cmd {
            Cmd::Insert {
                parent,
                index,
                content,
            } => {
                let content = normalize(content);
                validate(&content)?;
                let id = identities.mint();
                self.emit(PatchOp::Insert {
                    parent: *parent,
                    index: *index,
                    id,
                    content,
                })
            }
            Cmd::Edit { id, content } => {
                let current = self.content(*id)?;
                let content = normalize(content);
                validate(&content)?;
                if current.kind() != content.kind() {
                    return Err(SyncError::InvalidCommand(format!(
                        "cannot turn {id} from {:?} into {:?}",
                        current.kind(),
                        content.kind()
                    )));
                }
                if current.branch_count() != content.branch_count() {
                    return Err(SyncError::InvalidCommand(format!(
                        "edit of {id} changes its branch count; add or remove branches instead"
                    )));
                }
                if *current == content {
                    return Ok(());
                }
                self.emit(PatchOp::Update { id: *id, content })
            }
            Cmd::Delete { id } => self.emit(PatchOp::Remove { id: *id }),
            Cmd::Reorder { id, parent, index } => self.emit(PatchOp::Move {
                id: *id,
                parent: *parent,
                index: *index,
            }),
            Cmd::AddBranch {
                block,
                index,
                condition,
            } => self.add_branch(*block, *index, condition),
            Cmd::RemoveBranch { block, branch } => self.remove_branch(*block, *branch),
        }
    }

    fn add_branch(&mut self, block: Identity, index: usize, condition: &str) -> Result<(), SyncError> {
        let ActionContent::Block { kind, conditions } = self.content(block)?.clone() else {
            return Err(SyncError::InvalidCommand(format!("{block} is not a block")));
        };
        if !kind.allows_else() {
            return Err(SyncError::InvalidCommand(format!(
                "`{}` blocks cannot have more than one branch",
                kind.keyword()
            )));
        }
        if index > conditions.len() {
            return Err(SyncError::InvalidCommand(format!(
                "branch index {index} out of range for {block}"
            )));
        }

        let last = conditions.len();
        let mut grown = conditions;
        grown.insert(index, condition.trim().to_string());
        let content = ActionContent::Block {
            kind,
            conditions: grown,
        };
        validate(&content)?;

        // Grow first: the new trailing branch is empty, then shift bodies
        // down one slot from the back.
        self.emit(PatchOp::Update { id: block, content })?;
        for from in (index..last).rev() {
            self.shift_children(block, from, from + 1)?;
        }
        Ok(())
    }

    fn remove_branch(&mut self, block: Identity, branch: usize) -> Result<(), SyncError> {
        let ActionContent::Block { kind, conditions } = self.content(block)?.clone() else {
            return Err(SyncError::InvalidCommand(format!("{block} is not a block")));
        };
        if branch >= conditions.len() {
            return Err(SyncError::InvalidCommand(format!(
                "{block} has no branch {branch}"
            )));
        }
        if conditions.len() == 1 {
            return Err(SyncError::InvalidCommand(format!(
                "cannot remove the only branch of {block}; delete the block instead"
            )));
        }

        let doomed = self.children(ParentRef::Branch { block, branch });
        for id in doomed {
            self.emit(PatchOp::Remove { id })?;
        }
        for from in branch + 1..conditions.len() {
            self.shift_children(block, from, from - 1)?;
        }

        let mut shrunk = conditions;
        shrunk.remove(branch);
        self.emit(PatchOp::Update {
            id: block,
            content: ActionContent::Block {
                kind,
                conditions: shrunk,
            },
        })
    }

    /// Move every child of branch `from` into the (empty) branch `to`.
    fn shift_children(&mut self, block: Identity, from: usize, to: usize) -> Result<(), SyncError> {
        let children = self.children(ParentRef::Branch { block, branch: from });
        for (index, id) in children.into_iter().enumerate() {
            self.emit(PatchOp::Move {
                id,
                parent: ParentRef::Branch { block, branch: to },
                index,
            })?;
        }
        Ok(())
    }

    fn children(&self, parent: ParentRef) -> Vec<Identity> {
        self.model
            .children(parent)
            .map(<[Identity]>::to_vec)
            .unwrap_or_default()
    }

    fn content(&self, id: Identity) -> Result<&ActionContent, SyncError> {
        self.model.get(id).ok_or(SyncError::UnknownIdentity(id))
    }

    fn emit(&mut self, op: PatchOp) -> Result<(), SyncError> {
        apply_op(&mut self.model, &op).map_err(rejected)?;
        self.patch.push(op);
        Ok(())
    }
}

fn rejected(error: PatchError) -> SyncError {
    match error {
        PatchError::UnknownIdentity(id) => SyncError::UnknownIdentity(id),
        other => SyncError::InvalidCommand(other.to_string()),
    }
}

/// Trim free text the way the parser would, so a regenerate and reparse
/// gives back exactly this content.
pub fn normalize(content: &ActionContent) -> ActionContent {
    let mut content = content.clone();
    match &mut content {
        ActionContent::Title { text } | ActionContent::Message { text, .. } => {
            *text = text.trim().to_string();
        }
        ActionContent::Note { text, .. } => {
            let lines: Vec<&str> = text.lines().map(str::trim).collect();
            *text = lines.join("\n").trim().to_string();
        }
        ActionContent::Block { conditions, .. } => {
            for condition in conditions {
                *condition = condition.trim().to_string();
            }
        }
        ActionContent::Participant { .. } | ActionContent::Activation { .. } => {}
    }
    content
}

/// Reject content that the text form cannot carry.
pub fn validate(content: &ActionContent) -> Result<(), SyncError> {
    match content {
        ActionContent::Title { text } => single_line("title", text),
        ActionContent::Participant { name, alias, .. } => {
            check_name(name)?;
            alias.as_deref().map_or(Ok(()), check_name)
        }
        ActionContent::Message { from, to, text, .. } => {
            check_name(from)?;
            check_name(to)?;
            single_line("message text", text)
        }
        ActionContent::Note { targets, text, .. } => {
            for target in targets {
                check_name(target)?;
            }
            free_text("note", text)?;
            if text.lines().any(closes_note) {
                return Err(SyncError::InvalidCommand(
                    "note text cannot contain an `end note` line".to_string(),
                ));
            }
            Ok(())
        }
        ActionContent::Activation { target, .. } => check_name(target),
        ActionContent::Block { kind, conditions } => {
            if conditions.is_empty() {
                return Err(SyncError::InvalidCommand(format!(
                    "a `{}` block needs at least one branch",
                    kind.keyword()
                )));
            }
            if conditions.len() > 1 && !kind.allows_else() {
                return Err(SyncError::InvalidCommand(format!(
                    "`{}` blocks cannot have more than one branch",
                    kind.keyword()
                )));
            }
            conditions
                .iter()
                .try_for_each(|condition| single_line("condition", condition))
        }
    }
}

fn check_name(name: &str) -> Result<(), SyncError> {
    if name.is_empty() {
        return Err(SyncError::InvalidCommand("names cannot be empty".to_string()));
    }
    if name.contains(['"', '\n', '\r']) {
        return Err(SyncError::InvalidCommand(format!(
            "name {name:?} cannot contain quotes or line breaks"
        )));
    }
    Ok(())
}

fn single_line(what: &str, text: &str) -> Result<(), SyncError> {
    if text.contains(['\n', '\r']) {
        return Err(SyncError::InvalidCommand(format!(
            "{what} must be a single line"
        )));
    }
    free_text(what, text)
}

fn free_text(what: &str, text: &str) -> Result<(), SyncError> {
    // `/'` would open a block comment and swallow the following lines.
    if text.contains("/'") {
        return Err(SyncError::InvalidCommand(format!(
            "{what} cannot contain `/'`"
        )));
    }
    Ok(())
}

/// True if `line` would be read as the `end note` terminator.
fn closes_note(line: &str) -> bool {
    let mut significant = lex(line)
        .into_iter()
        .map(|t| t.kind)
        .filter(|kind| !kind.is_trivia());
    significant.next() == Some(SyntaxKind::END_KW) && significant.next() == Some(SyntaxKind::NOTE_KW)
}
