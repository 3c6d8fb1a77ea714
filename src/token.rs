use std::fmt;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Dotted option name on the left of `=`.
    Key,
    /// Contents of a `"..."` literal, escapes resolved.
    String,
    /// Bare digit run.
    Integer,
    /// `=` after a key.
    Assign,
    /// `=>` inside an array.
    ArrayAssign,
    /// `,` inside an array.
    Comma,
    LParen,
    RParen,
    /// `$`, opens a condition header.
    Dollar,
    /// Name of the condition variable (`HTTPhost`, ...).
    VarName,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `=~`
    Match,
    /// `!~`
    NotMatch,
    LCurly,
    RCurly,
    Eol,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Key => "key",
            TokenKind::String => "string",
            TokenKind::Integer => "integer",
            TokenKind::Assign => "'='",
            TokenKind::ArrayAssign => "'=>'",
            TokenKind::Comma => "','",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Dollar => "'$'",
            TokenKind::VarName => "variable name",
            TokenKind::Equal => "'=='",
            TokenKind::NotEqual => "'!='",
            TokenKind::Match => "'=~'",
            TokenKind::NotMatch => "'!~'",
            TokenKind::LCurly => "'{'",
            TokenKind::RCurly => "'}'",
            TokenKind::Eol => "end of line",
            TokenKind::Eof => "end of file",
        };
        f.write_str(s)
    }
}

/// A token with its literal text and 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}
