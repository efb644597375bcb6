//! # Parser - Event-Based Tree Construction
//!
//! This module implements the core parsing logic, transforming a token stream
//! into a syntax tree using the **event-based** architecture from rust-analyzer.
//!
//! ## Why Event-Based Parsing?
//!
//! Grammar functions never build tree nodes directly. They emit a flat list of
//! **events** ([`Event`]) and the [`Sink`] builds the Rowan tree afterwards.
//! This keeps error recovery simple: a half-parsed statement is just a run of
//! events that gets wrapped in an `ERROR` node instead of a `MESSAGE` node.
//!
//! ## The Event Model
//!
//! Parsing `A -> B: hi\n` produces:
//! ```text
//! Start(MESSAGE)
//! Token(IDENT) Token(WHITESPACE) Token(ARROW) Token(WHITESPACE) Token(IDENT)
//! Token(COLON)
//! Start(TEXT) Token(WHITESPACE) Token(IDENT) Finish
//! Token(NEWLINE)
//! Finish
//! ```
//!
//! ## The Marker System
//!
//! `parser.start()` returns a [`Marker`] which **must** be either completed
//! with `marker.complete(parser, KIND)` or abandoned with
//! `marker.abandon(parser)`. Dropping it otherwise panics, which catches
//! grammar bugs before they produce corrupt trees.
//!
//! ## Diagnostics
//!
//! The parser never fails. Problems are collected as [`Diagnostic`]s next to
//! the tree and the grammar keeps going: malformed lines become `ERROR`
//! nodes, unclosed blocks are closed at end of input. `UNKNOWN` tokens are
//! reported as lex errors when they show up where a statement or operand is
//! expected; inside free text (message text, conditions, note bodies) they
//! are ordinary characters.
//!
//! ## Public API
//!
//! ```
//! use seqsync_syntax::{parse, SyntaxKind};
//!
//! let parse = parse("A -> B: hi\n");
//! assert!(parse.diagnostics().is_empty());
//! assert_eq!(parse.syntax().kind(), SyntaxKind::ROOT);
//! ```

pub mod event;
pub mod sink;

mod grammar;

use crate::diagnostic::Diagnostic;
use crate::lexer::{Token, lex};
use crate::span::Span;
use crate::syntax_kind::{SyntaxKind, SyntaxNode};
use event::Event;
use sink::Sink;

/// Result of parsing: a lossless tree plus everything that went wrong.
#[derive(Debug, Clone)]
pub struct Parse {
    tree: SyntaxNode,
    diagnostics: Vec<Diagnostic>,
}

impl Parse {
    /// Root `ROOT` node of the tree.
    pub fn syntax(&self) -> SyntaxNode {
        self.tree.clone()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (SyntaxNode, Vec<Diagnostic>) {
        (self.tree, self.diagnostics)
    }
}

/// The parser state machine.
///
/// Holds the token stream, current position, accumulated events and
/// diagnostics. Grammar functions receive `&mut Parser` and use its methods to:
///
/// - Inspect tokens: `current()`, `nth()`, `at()`, `at_end()`, `nth_significant()`
/// - Consume tokens: `bump()`, `bump_text()`, `eat()`, `skip_trivia()`
/// - Build structure: `start()` → `Marker` → `complete()`/`abandon()`
/// - Report problems: `error()`, `error_at()`
pub struct Parser<'t, 'input> {
    tokens: &'t [Token<'input>],
    pos: usize,
    events: Vec<Event>,
    diagnostics: Vec<Diagnostic>,
}

impl<'t, 'input> Parser<'t, 'input> {
    /// Create a new parser from a slice of tokens.
    pub fn new(tokens: &'t [Token<'input>]) -> Self {
        Self {
            tokens,
            pos: 0,
            events: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Parse the tokens and return a syntax tree with its diagnostics.
    pub fn parse(mut self) -> Parse {
        grammar::root(&mut self);
        let sink = Sink::new(self.tokens, self.events);
        Parse {
            tree: sink.finish(),
            diagnostics: self.diagnostics,
        }
    }

    /// Start a new node and return a marker.
    pub fn start(&mut self) -> Marker {
        let pos = self.events.len();
        self.events.push(Event::Placeholder);
        Marker {
            pos,
            completed: false,
        }
    }

    /// Current token kind, or EOF if past end.
    pub fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    /// Look ahead n tokens.
    pub fn nth(&self, n: usize) -> SyntaxKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(SyntaxKind::EOF)
    }

    /// Kind of the n-th token from here that is not trivia.
    pub fn nth_significant(&self, n: usize) -> SyntaxKind {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .nth(n)
            .map(|t| t.kind)
            .unwrap_or(SyntaxKind::EOF)
    }

    /// Check if at end of input.
    pub fn at_end(&self) -> bool {
        self.current() == SyntaxKind::EOF
    }

    /// Check if current token is of given kind.
    pub fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    /// Check if the current token is the contextual word `word`.
    pub fn at_word(&self, word: &str) -> bool {
        self.at(SyntaxKind::IDENT) && self.current_text() == word
    }

    /// Check if at a newline or end of input. Call `skip_trivia` first to
    /// look past trailing whitespace and comments.
    pub fn at_line_end(&self) -> bool {
        matches!(self.current(), SyntaxKind::NEWLINE | SyntaxKind::EOF)
    }

    /// Consume the current token if it matches.
    pub fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume the current token unconditionally.
    ///
    /// Consuming an `UNKNOWN` token records a lex error.
    pub fn bump(&mut self) {
        if self.at(SyntaxKind::UNKNOWN) {
            let message = format!("unrecognized input `{}`", self.current_text());
            self.diagnostics
                .push(Diagnostic::lex(message, self.current_span()));
        }
        self.bump_text();
    }

    /// Consume the current token as free text, where any token is valid.
    pub fn bump_text(&mut self) {
        if !self.at_end() {
            let kind = self.current();
            self.events.push(Event::token(kind));
            self.pos += 1;
        }
    }

    /// Consume whitespace and comments.
    pub fn skip_trivia(&mut self) {
        while self.current().is_trivia() {
            self.bump_text();
        }
    }

    /// Consume everything up to (not including) the next newline.
    pub fn bump_to_line_end(&mut self) {
        while !self.at_line_end() {
            self.bump();
        }
    }

    /// Get the text of the current token.
    pub fn current_text(&self) -> &'input str {
        self.tokens.get(self.pos).map(|t| t.text).unwrap_or("")
    }

    /// Span of the current token (the EOF token's span past the end).
    pub fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    /// Record a parse error at the current token.
    pub fn error(&mut self, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(span, message);
    }

    /// Record a parse error at an earlier position.
    pub fn error_at(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::parse(message, span));
    }
}

/// A marker for a node being constructed.
///
/// When you call `parser.start()`, a `Placeholder` event is pushed and you get
/// a `Marker` pointing to it. Every marker is either:
///
/// - **Completed** via `marker.complete(parser, KIND)` - converts the
///   placeholder to a `Start` event and pushes a `Finish` event
/// - **Abandoned** via `marker.abandon(parser)` - removes the placeholder
///   (only works if nothing was pushed after it)
///
/// If you drop a marker without doing either, **the program panics**.
#[must_use = "Markers must be completed or abandoned, dropping them is a bug"]
pub struct Marker {
    /// Position in the events vector where our Placeholder lives
    pos: usize,
    /// Tracks whether complete() or abandon() was called
    completed: bool,
}

impl Marker {
    /// Complete this marker, creating a node of the given kind.
    pub fn complete(mut self, p: &mut Parser<'_, '_>, kind: SyntaxKind) {
        self.completed = true;
        let event_at_pos = &mut p.events[self.pos];
        assert!(matches!(event_at_pos, Event::Placeholder));
        *event_at_pos = Event::start(kind);
        p.events.push(Event::Finish);
    }

    /// Abandon this marker without creating a node.
    ///
    /// **Note**: This only removes the placeholder if it's the last event.
    /// If other events were pushed after `start()`, the placeholder becomes
    /// inert and is ignored by the Sink.
    pub fn abandon(mut self, p: &mut Parser<'_, '_>) {
        self.completed = true;
        if self.pos == p.events.len() - 1 {
            match p.events.pop() {
                Some(Event::Placeholder) => {}
                _ => unreachable!(),
            }
        }
    }
}

impl Drop for Marker {
    fn drop(&mut self) {
        if !self.completed && !std::thread::panicking() {
            panic!("Marker must be either completed or abandoned");
        }
    }
}


/// Parse diagram source into a syntax tree plus diagnostics.
pub fn parse(source: &str) -> Parse {
    let tokens = lex(source);
    parse_tokens(&tokens)
}

/// Parse an already lexed token stream (see [`crate::lexer::relex`]).
pub fn parse_tokens(tokens: &[Token<'_>]) -> Parse {
    Parser::new(tokens).parse()
}
