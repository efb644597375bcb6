//! # seqsync-syntax
//!
//! A lossless syntax tree for PlantUML-style sequence diagrams using
//! [Rowan] + [Logos], following the [rust-analyzer] architecture model.
//!
//! [Rowan]: https://docs.rs/rowan
//! [Logos]: https://docs.rs/logos
//! [rust-analyzer]: https://rust-analyzer.github.io/book/contributing/syntax.html
//!
//! ## Why Lossless?
//!
//! The tree keeps every byte of the source: whitespace, comments, even lines
//! that failed to parse. Concatenating the leaves gives back the input
//! exactly. Positions in the tree therefore map straight onto the editor
//! buffer, which is what cursor tracking and source maps rely on.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source Text → Lexer → Tokens → Parser → Events → Sink → Rowan Tree → AST
//!               (Logos)          (Grammar)        (GreenNodeBuilder)  (lowering)
//! ```
//!
//! ### 1. Lexer ([`lexer`] module)
//!
//! Tokenizes into a flat sequence: identifiers, quoted strings, arrows,
//! keywords, punctuation, trivia. Anything unrecognized becomes an `UNKNOWN`
//! token instead of stopping the lexer. [`lexer::relex`] re-lexes only the
//! tail of an edited document.
//!
//! ```text
//! "A -> B: hi\n" → [IDENT, WHITESPACE, ARROW, WHITESPACE, IDENT, COLON,
//!                   WHITESPACE, IDENT, NEWLINE, EOF]
//! ```
//!
//! ### 2. Parser ([`parser`] module)
//!
//! Line-oriented grammar over the tokens. Emits events, never fails, and
//! collects [`Diagnostic`]s. Malformed lines become `ERROR` nodes; unclosed
//! blocks are closed at end of input.
//!
//! ### 3. AST ([`ast`] module)
//!
//! [`ast::Diagram::lower`] turns the CST into owned, typed statements with
//! spans. This is what the engine projects into its model.
//!
//! ## Module Structure
//!
//! ```text
//! seqsync-syntax/
//! ├── lib.rs           # This file - public API
//! ├── syntax_kind.rs   # SyntaxKind enum (tokens + nodes) and Rowan integration
//! ├── lexer.rs         # Logos-based tokenizer, incremental relex
//! ├── arrow.rs         # Arrow glyph classification
//! ├── span.rs          # Byte spans and line/column mapping
//! ├── diagnostic.rs    # Lex, parse and semantic diagnostics
//! ├── ast.rs           # Typed lowering of the CST
//! └── parser/
//!     ├── mod.rs       # Parser struct, Marker system, public parse() function
//!     ├── event.rs     # Event enum (Start, Token, Finish, Placeholder)
//!     ├── sink.rs      # Converts events to Rowan GreenNode
//!     └── grammar/
//!         ├── mod.rs       # Statement lists, envelope, recovery helpers
//!         ├── statement.rs # Participants, messages, notes, activations
//!         └── block.rs     # Control blocks and branches
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use seqsync_syntax::{parse, SyntaxKind};
//!
//! let parse = parse("A -> B: hi\n");
//! let tree = parse.syntax();
//!
//! assert_eq!(tree.text().to_string(), "A -> B: hi\n");
//! assert_eq!(tree.kind(), SyntaxKind::ROOT);
//! let message = tree.children().next().unwrap();
//! assert_eq!(message.kind(), SyntaxKind::MESSAGE);
//! ```

pub mod arrow;
pub mod ast;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod syntax_kind;

pub use arrow::{Arrow, Direction, LineStyle, Synchronicity};
pub use ast::{BlockKind, Diagram, NotePlacement, ParticipantKind, Statement};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use lexer::{Token, TokenRecord, is_plain_ident};
pub use parser::{Parse, parse, parse_tokens};
pub use span::{LineIndex, Span};
pub use syntax_kind::{SequenceLang, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken};
