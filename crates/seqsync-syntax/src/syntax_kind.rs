//! SyntaxKind enum for all tokens and nodes in the sequence-diagram CST.
//!
//! Following the rust-analyzer model, all tokens and nodes share a single enum.
//! Every byte in the source must appear as a token in the tree.

/// All syntax kinds for the sequence-diagram CST.
///
/// This enum represents both tokens (lexer output) and composite nodes (parser output).
/// The `repr(u16)` ensures efficient storage in rowan's green tree.
///
/// We use SCREAMING_CASE following the rust-analyzer convention for SyntaxKind.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // === Tokens (lexer output) ===
    /// Horizontal whitespace (spaces, tabs)
    WHITESPACE,
    /// Line ending
    NEWLINE,
    /// `'` line comment or `/' ... '/` block comment
    COMMENT,
    /// Double-quoted string
    STRING,
    /// Participant names, contextual words (`left`, `of`, `as`) and free text
    IDENT,
    /// Message arrow (`->`, `-->>`, `<-`, ...)
    ARROW,
    /// `:` separating a message or note from its text
    COLON,
    /// `,` in multi-target notes
    COMMA,
    /// `@startuml`
    START_UML,
    /// `@enduml`
    END_UML,
    TITLE_KW,
    PARTICIPANT_KW,
    ACTOR_KW,
    BOUNDARY_KW,
    CONTROL_KW,
    ENTITY_KW,
    DATABASE_KW,
    COLLECTIONS_KW,
    QUEUE_KW,
    NOTE_KW,
    ALT_KW,
    ELSE_KW,
    END_KW,
    LOOP_KW,
    PAR_KW,
    OPT_KW,
    BREAK_KW,
    CRITICAL_KW,
    GROUP_KW,
    ACTIVATE_KW,
    DEACTIVATE_KW,
    /// Bytes the lexer could not classify
    UNKNOWN,
    /// End of file marker
    EOF,

    // === Composite Nodes (parser output) ===
    /// Root document node
    ROOT,
    /// `@startuml` ... `@enduml` envelope
    DIAGRAM,
    /// `title ...`
    TITLE,
    /// `participant A as B` and the other participant kinds
    PARTICIPANT_DECL,
    /// `A -> B: text`
    MESSAGE,
    /// Single-line or multi-line note
    NOTE,
    /// Lines of a multi-line note, up to `end note`
    NOTE_BODY,
    /// `activate A` / `deactivate A`
    ACTIVATION,
    /// Control block (`alt`, `loop`, `par`, ...) up to its `end`
    BLOCK,
    /// One branch of a control block
    BRANCH,
    /// Free text to the end of a line (message text, conditions, titles)
    TEXT,

    /// Error recovery node
    ERROR,
}

impl SyntaxKind {
    /// Returns true if this kind represents a token (lexer output).
    pub fn is_token(self) -> bool {
        (self as u16) <= (Self::EOF as u16)
    }

    /// Returns true if this kind represents a composite node.
    pub fn is_node(self) -> bool {
        !self.is_token()
    }

    /// Returns true if this kind is trivia (whitespace/comments).
    ///
    /// Newlines are significant in this grammar and are not trivia.
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::WHITESPACE | Self::COMMENT)
    }

    /// Returns true for the keywords that declare a participant.
    pub fn is_participant_kw(self) -> bool {
        matches!(
            self,
            Self::PARTICIPANT_KW
                | Self::ACTOR_KW
                | Self::BOUNDARY_KW
                | Self::CONTROL_KW
                | Self::ENTITY_KW
                | Self::DATABASE_KW
                | Self::COLLECTIONS_KW
                | Self::QUEUE_KW
        )
    }

    /// Returns true for the keywords that open a control block.
    pub fn is_block_kw(self) -> bool {
        matches!(
            self,
            Self::ALT_KW
                | Self::LOOP_KW
                | Self::PAR_KW
                | Self::OPT_KW
                | Self::BREAK_KW
                | Self::CRITICAL_KW
                | Self::GROUP_KW
        )
    }

    /// Returns true for tokens that may name a participant.
    pub fn is_name(self) -> bool {
        matches!(self, Self::IDENT | Self::STRING)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language definition for rowan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SequenceLang {}

impl rowan::Language for SequenceLang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 <= SyntaxKind::ERROR as u16);
        // SAFETY: We check bounds above and SyntaxKind is repr(u16)
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type alias for our syntax nodes.
pub type SyntaxNode = rowan::SyntaxNode<SequenceLang>;
/// Type alias for our syntax tokens.
pub type SyntaxToken = rowan::SyntaxToken<SequenceLang>;
/// Type alias for syntax elements (node or token).
pub type SyntaxElement = rowan::SyntaxElement<SequenceLang>;
