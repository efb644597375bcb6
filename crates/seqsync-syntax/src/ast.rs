//! Typed, owned AST lowered from the lossless tree.
//!
//! The CST keeps every byte; the AST keeps only meaning. Trivia is dropped,
//! quoted names are unquoted, free text is trimmed, and `ERROR` nodes are
//! skipped entirely so that one malformed line never hides the rest of the
//! document. Each node keeps the span of the source it came from.
//!
//! ```
//! use seqsync_syntax::{parse, ast::{Diagram, Statement}};
//!
//! let source = "A -> B: hi\n";
//! let diagram = Diagram::lower(&parse(source).syntax(), source);
//! assert!(matches!(diagram.statements[0], Statement::Message(_)));
//! ```

use serde::{Deserialize, Serialize};

use crate::arrow::Arrow;
use crate::span::{LineIndex, Span};
use crate::syntax_kind::{SyntaxKind, SyntaxNode, SyntaxToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    #[default]
    Participant,
    Actor,
    Boundary,
    Control,
    Entity,
    Database,
    Collections,
    Queue,
}

impl ParticipantKind {
    fn from_keyword(kind: SyntaxKind) -> Option<Self> {
        Some(match kind {
            SyntaxKind::PARTICIPANT_KW => Self::Participant,
            SyntaxKind::ACTOR_KW => Self::Actor,
            SyntaxKind::BOUNDARY_KW => Self::Boundary,
            SyntaxKind::CONTROL_KW => Self::Control,
            SyntaxKind::ENTITY_KW => Self::Entity,
            SyntaxKind::DATABASE_KW => Self::Database,
            SyntaxKind::COLLECTIONS_KW => Self::Collections,
            SyntaxKind::QUEUE_KW => Self::Queue,
            _ => return None,
        })
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Actor => "actor",
            Self::Boundary => "boundary",
            Self::Control => "control",
            Self::Entity => "entity",
            Self::Database => "database",
            Self::Collections => "collections",
            Self::Queue => "queue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Alt,
    Loop,
    Par,
    Opt,
    Break,
    Critical,
    Group,
}

impl BlockKind {
    fn from_keyword(kind: SyntaxKind) -> Option<Self> {
        Some(match kind {
            SyntaxKind::ALT_KW => Self::Alt,
            SyntaxKind::LOOP_KW => Self::Loop,
            SyntaxKind::PAR_KW => Self::Par,
            SyntaxKind::OPT_KW => Self::Opt,
            SyntaxKind::BREAK_KW => Self::Break,
            SyntaxKind::CRITICAL_KW => Self::Critical,
            SyntaxKind::GROUP_KW => Self::Group,
            _ => return None,
        })
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Alt => "alt",
            Self::Loop => "loop",
            Self::Par => "par",
            Self::Opt => "opt",
            Self::Break => "break",
            Self::Critical => "critical",
            Self::Group => "group",
        }
    }

    /// Whether `else` may open further branches.
    pub fn allows_else(&self) -> bool {
        matches!(self, Self::Alt | Self::Par | Self::Critical | Self::Group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotePlacement {
    Left,
    #[default]
    Right,
    Over,
}

impl NotePlacement {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "over" => Some(Self::Over),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Over => "over",
        }
    }
}

/// The whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagram {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Title(Title),
    Participant(ParticipantDecl),
    Message(Message),
    Note(Note),
    Activation(Activation),
    Block(Block),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Title(t) => t.span,
            Statement::Participant(p) => p.span,
            Statement::Message(m) => m.span,
            Statement::Note(n) => n.span,
            Statement::Activation(a) => a.span,
            Statement::Block(b) => b.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantDecl {
    pub kind: ParticipantKind,
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub arrow: Arrow,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub placement: NotePlacement,
    pub targets: Vec<String>,
    /// Lines joined with `\n`.
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub target: String,
    pub active: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Never empty: the first branch holds the header condition.
    pub branches: Vec<Branch>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub condition: String,
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Diagram {
    /// Lower a parsed `ROOT` node. `source` must be the text it was parsed
    /// from; it is only used to compute line/column positions.
    pub fn lower(root: &SyntaxNode, source: &str) -> Diagram {
        let index = LineIndex::new(source);
        let lower = Lower { index: &index };
        let mut statements = Vec::new();
        for child in root.children() {
            if child.kind() == SyntaxKind::DIAGRAM {
                statements.extend(lower.statements(&child));
            } else if let Some(statement) = lower.statement(&child) {
                statements.push(statement);
            }
        }
        Diagram {
            statements,
            span: lower.span(root),
        }
    }
}

struct Lower<'a> {
    index: &'a LineIndex<'a>,
}

impl Lower<'_> {
    fn span(&self, node: &SyntaxNode) -> Span {
        let range = node.text_range();
        self.index
            .span(usize::from(range.start())..usize::from(range.end()))
    }

    fn statements(&self, parent: &SyntaxNode) -> Vec<Statement> {
        parent
            .children()
            .filter_map(|child| self.statement(&child))
            .collect()
    }

    fn statement(&self, node: &SyntaxNode) -> Option<Statement> {
        match node.kind() {
            SyntaxKind::TITLE => Some(Statement::Title(Title {
                text: text_child(node),
                span: self.span(node),
            })),
            SyntaxKind::PARTICIPANT_DECL => self.participant(node).map(Statement::Participant),
            SyntaxKind::MESSAGE => self.message(node).map(Statement::Message),
            SyntaxKind::NOTE => self.note(node).map(Statement::Note),
            SyntaxKind::ACTIVATION => self.activation(node).map(Statement::Activation),
            SyntaxKind::BLOCK => self.block(node).map(Statement::Block),
            _ => None,
        }
    }

    fn participant(&self, node: &SyntaxNode) -> Option<ParticipantDecl> {
        let tokens = significant_tokens(node);
        let kind = ParticipantKind::from_keyword(tokens.first()?.kind())?;
        let name = name_text(tokens.get(1)?)?;
        let alias = match tokens.get(2) {
            Some(t) if t.kind() == SyntaxKind::IDENT && t.text() == "as" => {
                tokens.get(3).and_then(name_text)
            }
            _ => None,
        };
        Some(ParticipantDecl {
            kind,
            name,
            alias,
            span: self.span(node),
        })
    }

    fn message(&self, node: &SyntaxNode) -> Option<Message> {
        let tokens = significant_tokens(node);
        let from = name_text(tokens.first()?)?;
        let arrow = Arrow::from_glyph(tokens.get(1)?.text())?;
        let to = name_text(tokens.get(2)?)?;
        Some(Message {
            from,
            to,
            arrow,
            text: text_child(node),
            span: self.span(node),
        })
    }

    fn note(&self, node: &SyntaxNode) -> Option<Note> {
        // Header tokens after `note`, mirroring the grammar: an optional
        // placement word, an optional `of`, then comma-separated targets.
        let mut header = significant_tokens(node).into_iter().skip(1).peekable();
        let mut placement = NotePlacement::default();
        if let Some(word) = header
            .peek()
            .filter(|t| t.kind() == SyntaxKind::IDENT)
            .and_then(|t| NotePlacement::from_word(t.text()))
        {
            placement = word;
            header.next();
            if header
                .peek()
                .is_some_and(|t| t.kind() == SyntaxKind::IDENT && t.text() == "of")
            {
                header.next();
            }
        }

        let mut targets = Vec::new();
        for token in header {
            match token.kind() {
                SyntaxKind::IDENT | SyntaxKind::STRING => targets.extend(name_text(&token)),
                SyntaxKind::COMMA => {}
                _ => break,
            }
        }

        let text = match node.children().find(|n| n.kind() == SyntaxKind::NOTE_BODY) {
            Some(body) => body
                .text()
                .to_string()
                .lines()
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string(),
            None => text_child(node),
        };

        Some(Note {
            placement,
            targets,
            text,
            span: self.span(node),
        })
    }

    fn activation(&self, node: &SyntaxNode) -> Option<Activation> {
        let tokens = significant_tokens(node);
        let active = tokens.first()?.kind() == SyntaxKind::ACTIVATE_KW;
        let target = name_text(tokens.get(1)?)?;
        Some(Activation {
            target,
            active,
            span: self.span(node),
        })
    }

    fn block(&self, node: &SyntaxNode) -> Option<Block> {
        let keyword = significant_tokens(node).first()?.kind();
        let kind = BlockKind::from_keyword(keyword)?;
        let header_condition = text_child(node);

        let branches = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::BRANCH)
            .enumerate()
            .map(|(i, branch)| Branch {
                condition: if i == 0 {
                    header_condition.clone()
                } else {
                    text_child(&branch)
                },
                statements: self.statements(&branch),
                span: self.span(&branch),
            })
            .collect::<Vec<_>>();

        if branches.is_empty() {
            return None;
        }

        Some(Block {
            kind,
            branches,
            span: self.span(node),
        })
    }
}

/// Direct child tokens that carry meaning (no whitespace or comments).
fn significant_tokens(node: &SyntaxNode) -> Vec<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| !t.kind().is_trivia())
        .collect()
}

/// Trimmed text of the node's direct TEXT child, or empty.
fn text_child(node: &SyntaxNode) -> String {
    node.children()
        .find(|n| n.kind() == SyntaxKind::TEXT)
        .map(|n| n.text().to_string().trim().to_string())
        .unwrap_or_default()
}

/// Name carried by an IDENT or STRING token.
fn name_text(token: &SyntaxToken) -> Option<String> {
    match token.kind() {
        SyntaxKind::IDENT => Some(token.text().to_string()),
        SyntaxKind::STRING => {
            let text = token.text();
            Some(text[1..text.len() - 1].to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrow::{Direction, LineStyle, Synchronicity};
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn lower(source: &str) -> Diagram {
        Diagram::lower(&parse(source).syntax(), source)
    }

    #[test]
    fn lowers_message() {
        let diagram = lower("A -> B: hi there\n");
        assert_eq!(
            diagram.statements,
            vec![Statement::Message(Message {
                from: "A".into(),
                to: "B".into(),
                arrow: Arrow::SYNC,
                text: "hi there".into(),
                span: Span {
                    line: 1,
                    column: 1,
                    offset: 0,
                    len: 17
                },
            })]
        );
    }

    #[test]
    fn lowers_quoted_names_and_async_arrow() {
        let diagram = lower("\"Web Shop\" <<-- 決済: done\n");
        let Statement::Message(message) = &diagram.statements[0] else {
            panic!("expected message");
        };
        assert_eq!(message.from, "Web Shop");
        assert_eq!(message.to, "決済");
        assert_eq!(message.arrow.direction, Direction::RightToLeft);
        assert_eq!(message.arrow.sync, Synchronicity::Async);
        assert_eq!(message.arrow.style, LineStyle::Dashed);
    }

    #[test]
    fn lowers_participant_with_alias() {
        let diagram = lower("actor \"Long Name\" as L\n");
        assert_eq!(
            diagram.statements[0],
            Statement::Participant(ParticipantDecl {
                kind: ParticipantKind::Actor,
                name: "Long Name".into(),
                alias: Some("L".into()),
                span: Span {
                    line: 1,
                    column: 1,
                    offset: 0,
                    len: 23
                },
            })
        );
    }

    #[test]
    fn lowers_notes() {
        let diagram = lower(
            "note left of A: one\nnote over A, B: two\nnote: three\nnote right of B\n  first\n  second\nend note\n",
        );
        let notes: Vec<_> = diagram
            .statements
            .iter()
            .map(|s| match s {
                Statement::Note(n) => (n.placement, n.targets.clone(), n.text.clone()),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            notes,
            vec![
                (NotePlacement::Left, vec!["A".to_string()], "one".to_string()),
                (
                    NotePlacement::Over,
                    vec!["A".to_string(), "B".to_string()],
                    "two".to_string()
                ),
                (NotePlacement::Right, vec![], "three".to_string()),
                (
                    NotePlacement::Right,
                    vec!["B".to_string()],
                    "first\nsecond".to_string()
                ),
            ]
        );
    }

    #[test]
    fn lowers_blocks_with_branches() {
        let diagram = lower("alt ok\n  A -> B\nelse failed\n  A -> C\n  loop retry\n    A -> D\n  end\nend\n");
        let Statement::Block(block) = &diagram.statements[0] else {
            panic!("expected block");
        };
        assert_eq!(block.kind, BlockKind::Alt);
        let conditions: Vec<_> = block.branches.iter().map(|b| b.condition.as_str()).collect();
        assert_eq!(conditions, vec!["ok", "failed"]);
        assert_eq!(block.branches[0].statements.len(), 1);
        assert_eq!(block.branches[1].statements.len(), 2);
        assert!(matches!(
            block.branches[1].statements[1],
            Statement::Block(Block {
                kind: BlockKind::Loop,
                ..
            })
        ));
    }

    #[test]
    fn lowers_envelope_and_skips_errors() {
        let diagram = lower("@startuml\ntitle Demo\nA B\nactivate A\n@enduml\n");
        assert_eq!(diagram.statements.len(), 2);
        assert!(matches!(&diagram.statements[0], Statement::Title(t) if t.text == "Demo"));
        assert!(matches!(
            &diagram.statements[1],
            Statement::Activation(Activation { active: true, .. })
        ));
    }

    #[test]
    fn message_text_keeps_punctuation() {
        let diagram = lower("A -> B: it's 3 - 4 <ok>?\n");
        let Statement::Message(message) = &diagram.statements[0] else {
            panic!("expected message");
        };
        assert_eq!(message.text, "it's 3 - 4 <ok>?");
    }
}
