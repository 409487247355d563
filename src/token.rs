/// Half-open range of character offsets into the scanned source.
///
/// Offsets count `char`s, not bytes, because the scanner walks the input as a
/// character vector. The parser uses spans both for error positions and to
/// recover raw action-body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Literal,
    Whitespace,

    // Keywords
    If,
    Else,
    While,
    For,
    In,
    Rule,
    Actions,
    Return,
    Switch,
    Case,
    Local,
    On,
    Break,
    Continue,
    Include,

    // Operators
    Assignment,        // =
    AppendOperator,    // +=
    SubtractOperator,  // -=
    AssignmentIfEmpty, // ?=
    Not,               // !
    And,               // &&
    Or,                // ||
    NotEqual,          // !=
    LessThan,          // < (whitespace-delimited only)
    GreaterThan,       // > (whitespace-delimited only)

    // Delimiters
    Terminator,    // ; (whitespace-delimited only)
    Colon,         // :
    AccoladeOpen,  // { (whitespace-delimited only)
    AccoladeClose, // } (whitespace-delimited only)
    BracketOpen,   // [
    BracketClose,  // ]

    // Expansions
    VariableDereferencerOpen,  // $(
    LiteralExpansionOpen,      // @(
    ParenthesisClose,          // )
    VariableExpansionModifier, // single letter inside a modifier span

    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Text after unescaping and unquoting; empty for EOF.
    pub literal: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            literal: literal.into(),
            span,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
