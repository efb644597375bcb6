//! Sink for converting parser events into a Rowan green tree.

use rowan::GreenNodeBuilder;

use crate::lexer::Token;
use crate::parser::event::Event;
use crate::syntax_kind::{SyntaxKind, SyntaxNode};

/// Converts parser events and tokens into a Rowan syntax tree.
pub struct Sink<'t, 'input> {
    builder: GreenNodeBuilder<'static>,
    tokens: &'t [Token<'input>],
    cursor: usize,
    events: Vec<Event>,
}

impl<'t, 'input> Sink<'t, 'input> {
    pub fn new(tokens: &'t [Token<'input>], events: Vec<Event>) -> Self {
        Self {
            builder: GreenNodeBuilder::new(),
            tokens,
            cursor: 0,
            events,
        }
    }

    /// Consume the sink and build the syntax tree.
    pub fn finish(mut self) -> SyntaxNode {
        for event in std::mem::take(&mut self.events) {
            match event {
                Event::Start { kind } => self.builder.start_node(kind.into()),
                Event::Token { kind } => self.token(kind),
                Event::Finish => self.builder.finish_node(),
                Event::Placeholder => {}
            }
        }

        SyntaxNode::new_root(self.builder.finish())
    }

    fn token(&mut self, kind: SyntaxKind) {
        let text = self.tokens[self.cursor].text;
        self.cursor += 1;
        self.builder.token(kind.into(), text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    #[test]
    fn sink_builds_simple_tree() {
        let tokens = lex("activate A");

        let events = vec![
            Event::start(SyntaxKind::ROOT),
            Event::start(SyntaxKind::ACTIVATION),
            Event::token(SyntaxKind::ACTIVATE_KW),
            Event::token(SyntaxKind::WHITESPACE),
            Event::token(SyntaxKind::IDENT),
            Event::Finish,
            Event::Finish,
        ];

        let tree = Sink::new(&tokens, events).finish();

        assert_eq!(tree.kind(), SyntaxKind::ROOT);
        assert_eq!(tree.children().count(), 1);
        assert_eq!(tree.text().to_string(), "activate A");
    }

    #[test]
    fn sink_skips_placeholders() {
        let tokens = lex("x");
        let events = vec![
            Event::start(SyntaxKind::ROOT),
            Event::Placeholder,
            Event::token(SyntaxKind::IDENT),
            Event::Finish,
        ];

        let tree = Sink::new(&tokens, events).finish();
        assert_eq!(tree.children().count(), 0);
        assert_eq!(tree.text().to_string(), "x");
    }
}
