//! # Lexer - Tokenizing Sequence Diagram Source
//!
//! This module provides the first stage of parsing: breaking source text into
//! tokens using the [Logos] lexer generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## The Lossless Guarantee
//!
//! **Every byte in the input appears in exactly one token**. We never skip or
//! discard characters, and malformed input never aborts lexing: bytes Logos
//! cannot classify come out as `UNKNOWN` tokens and the parser decides what
//! to do with them.
//!
//! ```
//! use seqsync_syntax::lexer::lex;
//!
//! let input = "A -> B: hi\n";
//! let tokens = lex(input);
//!
//! // Concatenating all token texts gives back the original
//! let reconstructed: String = tokens.iter().map(|t| t.text).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! ## Resumable Lexing
//!
//! [`Lexer`] is a lazy iterator that can start at any byte offset
//! ([`Lexer::resume`]) and always ends with a single `EOF` token. [`relex`]
//! uses this to re-tokenize only the tail of a document after an edit,
//! reusing the cached tokens of every untouched line before it.
//!
//! ## Token Design
//!
//! Keywords are matched case-sensitively against a fixed table. Words with a
//! meaning only in one position (`left`, `right`, `over`, `of`, `as`) stay
//! plain `IDENT`s and the parser interprets them. Identifiers are anything
//! that is not whitespace or one of `: , " ' < > - / @`, so participant names
//! in any script lex as a single token.
//!
//! [`SyntaxKind`]: crate::syntax_kind::SyntaxKind

use logos::Logos;

use crate::span::Span;
use crate::syntax_kind::SyntaxKind;

/// Token kinds produced by the Logos lexer.
///
/// This enum exists separately from [`SyntaxKind`] because Logos needs to
/// derive on it. Each variant maps to a corresponding `SyntaxKind` token.
///
/// [`SyntaxKind`]: crate::syntax_kind::SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Horizontal whitespace (spaces, tabs)
    #[regex(r"[ \t]+")]
    Whitespace,

    /// Line ending (LF or CRLF)
    #[regex(r"\r?\n")]
    Newline,

    /// `'` comment running to the end of the line
    #[regex(r"'[^\r\n]*", allow_greedy = true)]
    LineComment,

    /// `/' ... '/` comment, may span lines
    #[regex(r"/'([^']|'+[^'/])*'+/", allow_greedy = true)]
    BlockComment,

    #[regex(r#""[^"\r\n]*""#, allow_greedy = true)]
    String,

    #[token("->")]
    #[token("-->")]
    #[token("->>")]
    #[token("-->>")]
    #[token("<-")]
    #[token("<--")]
    #[token("<<-")]
    #[token("<<--")]
    Arrow,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("@startuml")]
    StartUml,

    #[token("@enduml")]
    EndUml,

    #[token("title")]
    Title,
    #[token("participant")]
    Participant,
    #[token("actor")]
    Actor,
    #[token("boundary")]
    Boundary,
    #[token("control")]
    Control,
    #[token("entity")]
    Entity,
    #[token("database")]
    Database,
    #[token("collections")]
    Collections,
    #[token("queue")]
    Queue,
    #[token("note")]
    Note,
    #[token("alt")]
    Alt,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("loop")]
    Loop,
    #[token("par")]
    Par,
    #[token("opt")]
    Opt,
    #[token("break")]
    Break,
    #[token("critical")]
    Critical,
    #[token("group")]
    Group,
    #[token("activate")]
    Activate,
    #[token("deactivate")]
    Deactivate,

    /// Names and free-text words in any script
    #[regex(r#"[^\s:,"'<>/@-]+"#)]
    Ident,
}

impl TokenKind {
    /// Convert to SyntaxKind.
    pub fn to_syntax_kind(self) -> SyntaxKind {
        match self {
            TokenKind::Whitespace => SyntaxKind::WHITESPACE,
            TokenKind::Newline => SyntaxKind::NEWLINE,
            TokenKind::LineComment | TokenKind::BlockComment => SyntaxKind::COMMENT,
            TokenKind::String => SyntaxKind::STRING,
            TokenKind::Arrow => SyntaxKind::ARROW,
            TokenKind::Colon => SyntaxKind::COLON,
            TokenKind::Comma => SyntaxKind::COMMA,
            TokenKind::StartUml => SyntaxKind::START_UML,
            TokenKind::EndUml => SyntaxKind::END_UML,
            TokenKind::Title => SyntaxKind::TITLE_KW,
            TokenKind::Participant => SyntaxKind::PARTICIPANT_KW,
            TokenKind::Actor => SyntaxKind::ACTOR_KW,
            TokenKind::Boundary => SyntaxKind::BOUNDARY_KW,
            TokenKind::Control => SyntaxKind::CONTROL_KW,
            TokenKind::Entity => SyntaxKind::ENTITY_KW,
            TokenKind::Database => SyntaxKind::DATABASE_KW,
            TokenKind::Collections => SyntaxKind::COLLECTIONS_KW,
            TokenKind::Queue => SyntaxKind::QUEUE_KW,
            TokenKind::Note => SyntaxKind::NOTE_KW,
            TokenKind::Alt => SyntaxKind::ALT_KW,
            TokenKind::Else => SyntaxKind::ELSE_KW,
            TokenKind::End => SyntaxKind::END_KW,
            TokenKind::Loop => SyntaxKind::LOOP_KW,
            TokenKind::Par => SyntaxKind::PAR_KW,
            TokenKind::Opt => SyntaxKind::OPT_KW,
            TokenKind::Break => SyntaxKind::BREAK_KW,
            TokenKind::Critical => SyntaxKind::CRITICAL_KW,
            TokenKind::Group => SyntaxKind::GROUP_KW,
            TokenKind::Activate => SyntaxKind::ACTIVATE_KW,
            TokenKind::Deactivate => SyntaxKind::DEACTIVATE_KW,
            TokenKind::Ident => SyntaxKind::IDENT,
        }
    }
}

/// True if `text` would lex as a single `IDENT` token.
///
/// Used when printing names back out: anything else needs quoting.
pub fn is_plain_ident(text: &str) -> bool {
    let mut lexer = TokenKind::lexer(text);
    matches!(lexer.next(), Some(Ok(TokenKind::Ident))) && lexer.next().is_none()
}

/// A lexed token with its kind, text slice and source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub span: Span,
}

impl Token<'_> {
    /// Detach the token from its source text.
    pub fn record(&self) -> TokenRecord {
        TokenRecord {
            kind: self.kind,
            span: self.span,
        }
    }
}

/// A token without its borrowed text, suitable for caching between edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRecord {
    pub kind: SyntaxKind,
    pub span: Span,
}

impl TokenRecord {
    /// Re-attach the record to a source that still contains its bytes.
    pub fn attach<'a>(&self, source: &'a str) -> Token<'a> {
        Token {
            kind: self.kind,
            text: &source[self.span.range()],
            span: self.span,
        }
    }
}

/// Lazy, resumable token stream.
///
/// Yields every token of the input followed by exactly one `EOF` token.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    base: usize,
    line: u32,
    column: u32,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Lex `source` from the beginning.
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            base: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    /// Lex `source` starting at byte `offset`.
    ///
    /// The offset is moved back to the nearest char boundary. Spans stay
    /// relative to the whole source, so tokens from a resumed lexer can be
    /// appended to tokens from an earlier run.
    pub fn resume(source: &'a str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }

        let prefix = &source[..offset];
        let line = prefix.bytes().filter(|b| *b == b'\n').count() as u32 + 1;
        let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
        let column = prefix[line_start..].chars().count() as u32 + 1;

        Self {
            inner: TokenKind::lexer(&source[offset..]),
            base: offset,
            line,
            column,
            finished: false,
        }
    }

    fn advance_position(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(result) => {
                let range = self.inner.span();
                let text = self.inner.slice();
                let kind = match result {
                    Ok(token_kind) => token_kind.to_syntax_kind(),
                    Err(()) => SyntaxKind::UNKNOWN,
                };
                let span = Span {
                    line: self.line,
                    column: self.column,
                    offset: self.base + range.start,
                    len: text.len(),
                };
                self.advance_position(text);
                Some(Token { kind, text, span })
            }
            None => {
                self.finished = true;
                Some(Token {
                    kind: SyntaxKind::EOF,
                    text: "",
                    span: Span {
                        line: self.line,
                        column: self.column,
                        offset: self.base + self.inner.source().len(),
                        len: 0,
                    },
                })
            }
        }
    }
}

/// Lex the input into a sequence of tokens ending with `EOF`.
///
/// Guarantees that all bytes from the input appear in the output tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Re-lex `source` after an edit, reusing tokens from the previous run.
///
/// `previous` must be the records of a full token stream over a text that
/// agrees with `source` on every byte before `changed_from`. Cached tokens
/// are kept up to and including the last newline that ends at or before
/// `changed_from`; lexing resumes right after it. Because a newline token can
/// never be extended by the text that follows it, the result is identical to
/// `lex(source)`.
pub fn relex<'a>(source: &'a str, previous: &[TokenRecord], changed_from: usize) -> Vec<Token<'a>> {
    let changed_from = changed_from.min(source.len());
    let keep = previous
        .iter()
        .take_while(|t| t.kind != SyntaxKind::EOF && t.span.end() <= changed_from)
        .enumerate()
        .filter(|(_, t)| t.kind == SyntaxKind::NEWLINE)
        .map(|(i, _)| i + 1)
        .last()
        .unwrap_or(0);

    let resume_at = keep
        .checked_sub(1)
        .map_or(0, |last| previous[last].span.end());

    let mut tokens: Vec<Token<'a>> = previous[..keep].iter().map(|t| t.attach(source)).collect();
    tokens.extend(Lexer::resume(source, resume_at));
    tokens
}

/// Length of the common byte prefix of two texts, backed off to a char
/// boundary.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    while !a.is_char_boundary(len) {
        len -= 1;
    }
    len
}
