//! # Parser Events
//!
//! Events are the intermediate representation between parsing and tree building.
//! Instead of building the tree directly, the parser emits a **flat sequence**
//! of events that describe the tree structure.
//!
//! ```text
//! Start(ACTIVATION)  ← Begin an ACTIVATION node
//!   Token(ACTIVATE_KW)
//!   Token(WHITESPACE)
//!   Token(IDENT)
//!   Token(NEWLINE)
//! Finish             ← End the ACTIVATION node
//! ```
//!
//! The Sink processes these in order, maintaining a stack of open nodes.
//! Start pushes, Finish pops.

use crate::syntax_kind::SyntaxKind;

/// An event emitted by the parser during tree construction.
///
/// Events form a flat representation of the tree that the [`Sink`](super::sink::Sink)
/// converts into an actual Rowan tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin a new composite node of the given kind.
    Start { kind: SyntaxKind },

    /// Add the next lexer token to the current node.
    Token { kind: SyntaxKind },

    /// Finish the current node.
    ///
    /// Must be paired with a preceding `Start`.
    Finish,

    /// A placeholder that will be replaced.
    ///
    /// When `parser.start()` is called, a `Placeholder` is pushed. Later,
    /// `marker.complete()` replaces it with a real `Start`, or
    /// `marker.abandon()` leaves it (the Sink ignores placeholders).
    Placeholder,
}

impl Event {
    pub fn start(kind: SyntaxKind) -> Self {
        Event::Start { kind }
    }

    pub fn token(kind: SyntaxKind) -> Self {
        Event::Token { kind }
    }
}
