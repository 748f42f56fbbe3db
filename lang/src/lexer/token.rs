use std::fmt;
use std::sync::Arc;

/// A named piece of source text, shared read-only by every position into it.
#[derive(Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            text: text.into(),
        })
    }

    /// The text of a 0-based line, without its terminating newline.
    pub fn line(&self, line: usize) -> &str {
        self.text.split('\n').nth(line).unwrap_or("")
    }
}

// The text is left out so that spans stay readable in test output.
impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Cursor into a source (index, line and column are all 0-based).
///
/// Positions are plain values: a token or diagnostic holds its own clone, so
/// moving the lexer's cursor afterwards never changes an emitted span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub index: usize,
    pub line: usize,
    pub column: usize,
    pub source: Arc<Source>,
}

impl Position {
    pub fn start_of(source: Arc<Source>) -> Self {
        Self {
            index: 0,
            line: 0,
            column: 0,
            source,
        }
    }

    /// Moves past `consumed`; a newline starts the next line at column 0.
    pub fn advance(&mut self, consumed: char) {
        self.index += 1;
        self.column += 1;

        if consumed == '\n' {
            self.line += 1;
            self.column = 0;
        }
    }

    /// One column to the right on the same line, even past a line break.
    pub fn next_column(&self) -> Self {
        Self {
            index: self.index + 1,
            column: self.column + 1,
            ..self.clone()
        }
    }

    pub fn filename(&self) -> &str {
        &self.source.name
    }
}

/// Span representing a range in source code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `at`.
    pub fn point(at: Position) -> Self {
        Self {
            start: at.clone(),
            end: at,
        }
    }

    /// From the start of `first` to the end of `last`.
    pub fn cover(first: &Span, last: &Span) -> Self {
        Self {
            start: first.start.clone(),
            end: last.end.clone(),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line + 1,
            self.start.column,
            self.end.line + 1,
            self.end.column
        )
    }
}

/// Reserved words; matched case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Var,
    And,
    Or,
    Not,
    If,
    Elif,
    Else,
    For,
    To,
    Step,
    While,
    Fun,
    Then,
    End,
    Return,
    Continue,
    Break,
}

impl Keyword {
    pub const ALL: [Keyword; 17] = [
        Keyword::Var,
        Keyword::And,
        Keyword::Or,
        Keyword::Not,
        Keyword::If,
        Keyword::Elif,
        Keyword::Else,
        Keyword::For,
        Keyword::To,
        Keyword::Step,
        Keyword::While,
        Keyword::Fun,
        Keyword::Then,
        Keyword::End,
        Keyword::Return,
        Keyword::Continue,
        Keyword::Break,
    ];

    pub fn from_word(word: &str) -> Option<Keyword> {
        Self::ALL.into_iter().find(|keyword| keyword.as_str() == word)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Var => "VAR",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::If => "IF",
            Keyword::Elif => "ELIF",
            Keyword::Else => "ELSE",
            Keyword::For => "FOR",
            Keyword::To => "TO",
            Keyword::Step => "STEP",
            Keyword::While => "WHILE",
            Keyword::Fun => "FUN",
            Keyword::Then => "THEN",
            Keyword::End => "END",
            Keyword::Return => "RETURN",
            Keyword::Continue => "CONTINUE",
            Keyword::Break => "BREAK",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    String(String),

    Identifier(String),
    Keyword(Keyword),

    // Operators
    Plus,  // +
    Minus, // -
    Mul,   // *
    Div,   // /
    Pow,   // ^
    Eq,    // =
    Ee,    // ==
    Ne,    // !=
    Lt,    // <
    Gt,    // >
    Lte,   // <=
    Gte,   // >=
    Arrow, // ->

    // Delimiters
    LParen,  // (
    RParen,  // )
    LSquare, // [
    RSquare, // ]
    Comma,   // ,

    // Statement separator, from `;` or a line break
    Newline,

    Eof,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Int(_) => "INT",
            TokenKind::Float(_) => "FLOAT",
            TokenKind::String(_) => "STRING",
            TokenKind::Identifier(_) => "IDENTIFIER",
            TokenKind::Keyword(_) => "KEYWORD",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Mul => "MUL",
            TokenKind::Div => "DIV",
            TokenKind::Pow => "POW",
            TokenKind::Eq => "EQ",
            TokenKind::Ee => "EE",
            TokenKind::Ne => "NE",
            TokenKind::Lt => "LT",
            TokenKind::Gt => "GT",
            TokenKind::Lte => "LTE",
            TokenKind::Gte => "GTE",
            TokenKind::Arrow => "ARROW",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LSquare => "LSQUARE",
            TokenKind::RSquare => "RSQUARE",
            TokenKind::Comma => "COMMA",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Eof => "EOF",
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == keyword)
    }
}

/// Literal payload of a token, for the kinds that carry one.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue<'a> {
    Int(i64),
    Float(f64),
    Str(&'a str),
}

impl fmt::Display for TokenValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::Int(n) => write!(f, "{}", n),
            TokenValue::Float(x) => write!(f, "{:?}", x),
            TokenValue::Str(s) => f.write_str(s),
        }
    }
}

/// Token with position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn value(&self) -> Option<TokenValue<'_>> {
        match &self.kind {
            TokenKind::Int(n) => Some(TokenValue::Int(*n)),
            TokenKind::Float(x) => Some(TokenValue::Float(*x)),
            TokenKind::String(s) | TokenKind::Identifier(s) => Some(TokenValue::Str(s)),
            TokenKind::Keyword(k) => Some(TokenValue::Str(k.as_str())),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind.is_keyword(keyword)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{}:{}", self.kind.name(), value),
            None => f.write_str(self.kind.name()),
        }
    }
}
