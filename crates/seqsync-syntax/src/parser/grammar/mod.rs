//! # Grammar Rules
//!
//! This module contains the grammar rules that drive parsing. Each function
//! takes a `&mut Parser` and uses its methods to:
//!
//! 1. Inspect the current token (`p.current()`, `p.at()`, `p.nth_significant()`)
//! 2. Consume tokens (`p.bump()`, `p.eat()`, `p.skip_trivia()`)
//! 3. Build tree structure (`p.start()` → marker → `complete()`/`abandon()`)
//!
//! ## Module Structure
//!
//! - [`statement`] - Single-line statements (participants, messages, notes,
//!   activations, titles)
//! - [`block`] - Control blocks (`alt`, `loop`, `par`, ...) and their branches
//!
//! ## Line Orientation
//!
//! Every statement owns the newline that ends it. Blank lines, whitespace and
//! comments between statements are attached to the enclosing list node
//! (`ROOT`, `DIAGRAM` or `BRANCH`).
//!
//! ## Error Recovery
//!
//! Grammar functions are lenient and always produce a tree:
//!
//! - A line that cannot be parsed becomes an `ERROR` node up to its newline
//! - Junk after a complete statement is wrapped in an `ERROR` node inside it
//! - A control block still open at `@enduml` or end of input is closed there,
//!   with one diagnostic pointing at the keyword that opened it

mod block;
mod statement;

use crate::parser::Parser;
use crate::syntax_kind::SyntaxKind;

/// Parse the root document.
///
/// This is the entry point for parsing. It creates a ROOT node containing
/// all top-level statements and any `@startuml` envelopes.
pub fn root(p: &mut Parser<'_, '_>) {
    let m = p.start();
    statements(p, Scope::Root);
    m.complete(p, SyntaxKind::ROOT);
}

/// Where a statement list lives, which decides what ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Diagram,
    Branch,
}

/// Parse statements until the end of the enclosing scope.
///
/// Returns with the terminator (`@enduml`, `else`, `end` or EOF) unconsumed.
fn statements(p: &mut Parser<'_, '_>, scope: Scope) {
    loop {
        p.skip_trivia();
        match p.current() {
            SyntaxKind::EOF => break,
            SyntaxKind::NEWLINE => p.bump(),
            SyntaxKind::END_UML if scope != Scope::Root => break,
            SyntaxKind::ELSE_KW if scope == Scope::Branch => break,
            SyntaxKind::END_KW if scope == Scope::Branch && !at_end_note(p) => break,
            SyntaxKind::START_UML if scope == Scope::Root => diagram(p),
            _ => statement::statement(p),
        }
    }
}

/// `@startuml` ... `@enduml`
fn diagram(p: &mut Parser<'_, '_>) {
    let m = p.start();
    let open = p.current_span();
    p.bump();
    // `@startuml name` is allowed; the name has no meaning here.
    p.bump_to_line_end();
    p.eat(SyntaxKind::NEWLINE);

    statements(p, Scope::Diagram);

    if p.at(SyntaxKind::END_UML) {
        p.bump();
        p.bump_to_line_end();
        p.eat(SyntaxKind::NEWLINE);
    } else {
        p.error_at(open, "`@startuml` is missing its `@enduml`");
    }
    m.complete(p, SyntaxKind::DIAGRAM);
}

/// True at an `end note` line.
fn at_end_note(p: &Parser<'_, '_>) -> bool {
    p.nth_significant(0) == SyntaxKind::END_KW && p.nth_significant(1) == SyntaxKind::NOTE_KW
}

/// Free text up to the end of the line, as a TEXT node.
fn text(p: &mut Parser<'_, '_>) {
    let m = p.start();
    while !p.at_line_end() {
        p.bump_text();
    }
    m.complete(p, SyntaxKind::TEXT);
}

/// Close a statement: anything left on the line is an error.
fn finish_line(p: &mut Parser<'_, '_>) {
    p.skip_trivia();
    if !p.at_line_end() {
        let m = p.start();
        p.error(format!("unexpected `{}` at end of statement", p.current_text()));
        p.bump_to_line_end();
        m.complete(p, SyntaxKind::ERROR);
    }
    p.eat(SyntaxKind::NEWLINE);
}

/// Skip the rest of a malformed line, newline included.
fn recover_line(p: &mut Parser<'_, '_>) {
    p.bump_to_line_end();
    p.eat(SyntaxKind::NEWLINE);
}
