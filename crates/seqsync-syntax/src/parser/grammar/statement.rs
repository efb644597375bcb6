//! Single-line statements.

use super::{block, finish_line, recover_line, text};
use crate::parser::Parser;
use crate::syntax_kind::SyntaxKind;

/// Parse one statement starting at the current (non-trivia) token.
pub(super) fn statement(p: &mut Parser<'_, '_>) {
    match p.current() {
        kind if kind.is_participant_kw() => participant(p),
        kind if kind.is_block_kw() => block::block(p),
        SyntaxKind::IDENT | SyntaxKind::STRING => message(p),
        SyntaxKind::TITLE_KW => title(p),
        SyntaxKind::NOTE_KW => note(p),
        SyntaxKind::ACTIVATE_KW | SyntaxKind::DEACTIVATE_KW => activation(p),
        SyntaxKind::ELSE_KW => error_line(p, "`else` outside of a control block"),
        SyntaxKind::END_KW if p.nth_significant(1) == SyntaxKind::NOTE_KW => {
            error_line(p, "`end note` without an open note")
        }
        SyntaxKind::END_KW => error_line(p, "`end` without an open control block"),
        SyntaxKind::START_UML => error_line(p, "`@startuml` inside a diagram"),
        SyntaxKind::END_UML => error_line(p, "`@enduml` without `@startuml`"),
        SyntaxKind::UNKNOWN => {
            // Bumping the unknown token reports it; no parse error on top.
            let m = p.start();
            recover_line(p);
            m.complete(p, SyntaxKind::ERROR);
        }
        _ => {
            let message = format!("unexpected `{}`", p.current_text());
            error_line(p, &message)
        }
    }
}

/// Report `message` at the current token and swallow the line.
fn error_line(p: &mut Parser<'_, '_>, message: &str) {
    let m = p.start();
    p.error(message);
    recover_line(p);
    m.complete(p, SyntaxKind::ERROR);
}

/// `participant A`, `actor "Long Name" as L`, ...
fn participant(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump();
    p.skip_trivia();

    if !p.current().is_name() {
        p.error("expected a participant name");
        recover_line(p);
        m.complete(p, SyntaxKind::ERROR);
        return;
    }
    p.bump();
    p.skip_trivia();

    if p.at_word("as") {
        p.bump();
        p.skip_trivia();
        if p.current().is_name() {
            p.bump();
        } else {
            p.error("expected an alias after `as`");
        }
    }

    finish_line(p);
    m.complete(p, SyntaxKind::PARTICIPANT_DECL);
}

/// `A -> B` or `A -> B: text`
fn message(p: &mut Parser<'_, '_>) {
    let m = p.start();
    let sender = p.current_text();
    p.bump();
    p.skip_trivia();

    if !p.at(SyntaxKind::ARROW) {
        p.error(format!("expected an arrow after `{sender}`"));
        recover_line(p);
        m.complete(p, SyntaxKind::ERROR);
        return;
    }
    p.bump();
    p.skip_trivia();

    if !p.current().is_name() {
        p.error("expected a receiver after the arrow");
        recover_line(p);
        m.complete(p, SyntaxKind::ERROR);
        return;
    }
    p.bump();
    p.skip_trivia();

    if p.eat(SyntaxKind::COLON) {
        text(p);
    }

    finish_line(p);
    m.complete(p, SyntaxKind::MESSAGE);
}

/// `title text`
fn title(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump();
    text(p);
    p.eat(SyntaxKind::NEWLINE);
    m.complete(p, SyntaxKind::TITLE);
}

/// `activate A` / `deactivate A`
fn activation(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump();
    p.skip_trivia();

    if !p.current().is_name() {
        p.error("expected a participant to activate");
        recover_line(p);
        m.complete(p, SyntaxKind::ERROR);
        return;
    }
    p.bump();

    finish_line(p);
    m.complete(p, SyntaxKind::ACTIVATION);
}

/// `note [left|right|over] [of] [A[, B]] : text`, or the same header on its
/// own line followed by body lines and `end note`.
fn note(p: &mut Parser<'_, '_>) {
    let m = p.start();
    let open = p.current_span();
    p.bump();
    p.skip_trivia();

    if p.at_word("left") || p.at_word("right") || p.at_word("over") {
        p.bump();
        p.skip_trivia();
        if p.at_word("of") {
            p.bump();
            p.skip_trivia();
        }
    }

    if p.current().is_name() {
        p.bump();
        p.skip_trivia();
        while p.eat(SyntaxKind::COMMA) {
            p.skip_trivia();
            if !p.current().is_name() {
                p.error("expected a participant after `,`");
                break;
            }
            p.bump();
            p.skip_trivia();
        }
    }

    if p.eat(SyntaxKind::COLON) {
        text(p);
        p.eat(SyntaxKind::NEWLINE);
    } else if p.at_line_end() {
        p.eat(SyntaxKind::NEWLINE);
        if !note_body(p) {
            p.error_at(open, "unclosed note: expected `end note`");
        }
    } else {
        p.error("expected `:` or a line break in note");
        recover_line(p);
        m.complete(p, SyntaxKind::ERROR);
        return;
    }

    m.complete(p, SyntaxKind::NOTE);
}

/// Body lines of a multi-line note. Returns false if input ended before
/// `end note`.
fn note_body(p: &mut Parser<'_, '_>) -> bool {
    let body = p.start();
    while !super::at_end_note(p) {
        if p.at_end() {
            body.complete(p, SyntaxKind::NOTE_BODY);
            return false;
        }
        while !p.at_line_end() {
            p.bump_text();
        }
        p.eat(SyntaxKind::NEWLINE);
    }
    body.complete(p, SyntaxKind::NOTE_BODY);

    p.skip_trivia();
    p.bump();
    p.skip_trivia();
    p.bump();
    finish_line(p);
    true
}
