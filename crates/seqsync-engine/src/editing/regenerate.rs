//! Model → canonical text.
//!
//! Regeneration is a pure function of the model: one statement per line,
//! block bodies indented, names quoted only when they would not lex back
//! as a single identifier. Along with the text it records where each
//! action landed, so a caret can be carried across the rewrite.

use std::borrow::Cow;

use seqsync_syntax::is_plain_ident;

use crate::models::{ActionContent, Identity, ModelTree, NotePlacement, ParentRef, SourceMap};

/// Identifiers the parser reads as keywords in some positions.
const CONTEXTUAL_WORDS: &[&str] = &["as", "of", "left", "right", "over"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Wrap the diagram in `@startuml` / `@enduml`.
    pub envelope: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            envelope: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regenerated {
    pub text: String,
    /// Each action's range in `text`, from its first non-blank byte through
    /// the newline ending its last line.
    pub spans: SourceMap,
}

pub fn regenerate(model: &ModelTree, options: &FormatOptions) -> Regenerated {
    let mut writer = Writer {
        model,
        options,
        out: String::new(),
        spans: SourceMap::new(),
    };

    if options.envelope {
        writer.out.push_str("@startuml\n");
    }
    writer.slot(ParentRef::Root, 0);
    if options.envelope {
        writer.out.push_str("@enduml\n");
    }

    Regenerated {
        text: writer.out,
        spans: writer.spans,
    }
}

struct Writer<'a> {
    model: &'a ModelTree,
    options: &'a FormatOptions,
    out: String,
    spans: SourceMap,
}

impl Writer<'_> {
    fn slot(&mut self, parent: ParentRef, depth: usize) {
        let model = self.model;
        for id in model.children(parent).unwrap_or_default() {
            self.action(*id, depth);
        }
    }

    fn action(&mut self, id: Identity, depth: usize) {
        let model = self.model;
        let Some(content) = model.get(id) else {
            return;
        };
        let start = self.out.len() + depth * self.options.indent;

        match content {
            ActionContent::Title { text } => self.line(depth, &with_text("title", text, " ")),
            ActionContent::Participant { kind, name, alias } => {
                let mut line = format!("{} {}", kind.keyword(), quoted(name));
                if let Some(alias) = alias {
                    line.push_str(" as ");
                    line.push_str(&quoted(alias));
                }
                self.line(depth, &line);
            }
            ActionContent::Message {
                from,
                to,
                arrow,
                text,
            } => {
                let head = format!("{} {arrow} {}", quoted(from), quoted(to));
                self.line(depth, &with_text(&head, text, ": "));
            }
            ActionContent::Note {
                placement,
                targets,
                text,
            } => self.note(*placement, targets, text, depth),
            ActionContent::Activation { target, active } => {
                let word = if *active { "activate" } else { "deactivate" };
                self.line(depth, &format!("{word} {}", quoted(target)));
            }
            ActionContent::Block { kind, conditions } => {
                for (branch, condition) in conditions.iter().enumerate() {
                    let keyword = if branch == 0 { kind.keyword() } else { "else" };
                    self.line(depth, &with_text(keyword, condition, " "));
                    self.slot(ParentRef::Branch { block: id, branch }, depth + 1);
                }
                self.line(depth, "end");
            }
        }

        self.spans.insert(id, start..self.out.len());
    }

    fn note(&mut self, placement: NotePlacement, targets: &[String], text: &str, depth: usize) {
        let mut header = format!("note {}", placement.keyword());
        if !targets.is_empty() {
            let names: Vec<Cow<'_, str>> = targets.iter().map(|t| quoted(t)).collect();
            if placement != NotePlacement::Over {
                header.push_str(" of");
            }
            header.push(' ');
            header.push_str(&names.join(", "));
        }

        if !text.contains('\n') {
            header.push(':');
            self.line(depth, &with_text(&header, text, " "));
            return;
        }

        self.line(depth, &header);
        for body in text.lines() {
            if body.is_empty() {
                self.out.push('\n');
            } else {
                self.line(depth + 1, body);
            }
        }
        self.line(depth, "end note");
    }

    fn line(&mut self, depth: usize, text: &str) {
        self.out.extend(std::iter::repeat_n(' ', depth * self.options.indent));
        self.out.push_str(text);
        self.out.push('\n');
    }
}

/// `head`, followed by `separator` and `text` when there is any text.
fn with_text(head: &str, text: &str, separator: &str) -> String {
    if text.is_empty() {
        head.to_string()
    } else {
        format!("{head}{separator}{text}")
    }
}

fn quoted(name: &str) -> Cow<'_, str> {
    if is_plain_ident(name) && !CONTEXTUAL_WORDS.contains(&name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{name}\""))
    }
}
