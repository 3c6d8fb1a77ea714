//! Stateful scanner for the configuration language.
//!
//! The lexer walks an in-memory byte buffer once and tracks three modes that
//! change how the same byte is read:
//!
//! - **expecting-key**: at the start of a logical line and right after `{`.
//!   Runs of `[A-Za-z0-9.-]` become [`TokenKind::Key`] and a bare `=` is the
//!   assignment operator (which leaves this mode).
//! - **inside-array**: between `(` and the matching `)`. Line breaks are
//!   insignificant, `,` is a separator and `=` must be followed by `>`.
//! - **inside-condition**: between `$` and `{`. Letters form the variable
//!   name and `=`/`!` must start one of `==`, `=~`, `!=`, `!~`.
//!
//! Errors are returned, never panicked, and always carry the 1-based line and
//! column of the offending byte. A lexer cannot be rewound; build a new one to
//! start over.

use crate::error::ConfigError;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a [u8],
    offset: usize,
    line: usize,
    column: usize,
    in_key: bool,
    array_depth: usize,
    in_cond: bool,
    cond_operator_seen: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
            column: 1,
            in_key: true,
            array_depth: 0,
            in_cond: false,
            cond_operator_seen: false,
        }
    }

    /// Current 1-based (line, column).
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.offset + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek(0)?;
        self.offset += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(line: usize, column: usize, reason: impl Into<String>) -> ConfigError {
        ConfigError::Lex {
            line,
            column,
            reason: reason.into(),
        }
    }

    /// Produce the next token. After the input is exhausted every call
    /// returns [`TokenKind::Eof`].
    pub fn next_token(&mut self) -> Result<Token, ConfigError> {
        while let Some(c) = self.peek(0) {
            let (line, column) = self.position();
            match c {
                b' ' | b'\t' => {
                    self.bump();
                }
                b'\n' => {
                    self.bump();
                    if self.array_depth == 0 {
                        self.in_key = true;
                        return Ok(Token::new(TokenKind::Eol, "(EOL)", line, column));
                    }
                }
                b'\r' => {
                    if self.array_depth > 0 {
                        self.bump();
                    } else if self.peek(1) == Some(b'\n') {
                        self.bump();
                        self.bump();
                        self.in_key = true;
                        return Ok(Token::new(TokenKind::Eol, "(EOL)", line, column));
                    } else {
                        return Err(Self::error(line, column, "CR without LF"));
                    }
                }
                b'#' => {
                    while let Some(c) = self.peek(0) {
                        if c == b'\n' || c == b'\r' {
                            break;
                        }
                        self.bump();
                    }
                }
                b',' => {
                    self.bump();
                    // Outside arrays commas carry no meaning and are dropped.
                    if self.array_depth > 0 {
                        return Ok(Token::new(TokenKind::Comma, ",", line, column));
                    }
                }
                b'=' => return self.equal_sign(line, column),
                b'!' => return self.exclamation_mark(line, column),
                b'"' => return self.string(line, column),
                b'(' => {
                    self.bump();
                    self.array_depth += 1;
                    return Ok(Token::new(TokenKind::LParen, "(", line, column));
                }
                b')' => {
                    if self.array_depth == 0 {
                        return Err(Self::error(line, column, "unbalanced ')'"));
                    }
                    self.bump();
                    self.array_depth -= 1;
                    return Ok(Token::new(TokenKind::RParen, ")", line, column));
                }
                b'$' => {
                    self.bump();
                    self.in_cond = true;
                    self.cond_operator_seen = false;
                    self.in_key = false;
                    return Ok(Token::new(TokenKind::Dollar, "$", line, column));
                }
                b'{' => {
                    self.bump();
                    self.in_key = true;
                    self.in_cond = false;
                    return Ok(Token::new(TokenKind::LCurly, "{", line, column));
                }
                b'}' => {
                    self.bump();
                    self.in_key = true;
                    return Ok(Token::new(TokenKind::RCurly, "}", line, column));
                }
                _ => return self.word(c, line, column),
            }
        }
        Ok(Token::new(TokenKind::Eof, "", self.line, self.column))
    }

    fn equal_sign(&mut self, line: usize, column: usize) -> Result<Token, ConfigError> {
        if self.array_depth > 0 {
            if self.peek(1) == Some(b'>') {
                self.bump();
                self.bump();
                return Ok(Token::new(TokenKind::ArrayAssign, "=>", line, column));
            }
            return Err(Self::error(line, column, "use => for assignments in arrays"));
        }
        if self.in_cond {
            let kind = match self.peek(1) {
                Some(b'=') => TokenKind::Equal,
                Some(b'~') => TokenKind::Match,
                _ => {
                    return Err(Self::error(
                        line,
                        column,
                        "only =~ and == are allowed in the condition",
                    ));
                }
            };
            return Ok(self.operator(kind, line, column));
        }
        if self.in_key {
            self.bump();
            self.in_key = false;
            return Ok(Token::new(TokenKind::Assign, "=", line, column));
        }
        Err(Self::error(line, column, "unexpected equal-sign: ="))
    }

    fn exclamation_mark(&mut self, line: usize, column: usize) -> Result<Token, ConfigError> {
        if !self.in_cond {
            return Err(Self::error(line, column, "unexpected exclamation-mark: !"));
        }
        let kind = match self.peek(1) {
            Some(b'=') => TokenKind::NotEqual,
            Some(b'~') => TokenKind::NotMatch,
            _ => {
                return Err(Self::error(
                    line,
                    column,
                    "only !~ and != are allowed in the condition",
                ));
            }
        };
        Ok(self.operator(kind, line, column))
    }

    fn operator(&mut self, kind: TokenKind, line: usize, column: usize) -> Token {
        let start = self.offset;
        self.bump();
        self.bump();
        self.cond_operator_seen = true;
        let text = String::from_utf8_lossy(&self.input[start..self.offset]).into_owned();
        Token::new(kind, text, line, column)
    }

    fn string(&mut self, line: usize, column: usize) -> Result<Token, ConfigError> {
        self.bump();
        let mut buf = Vec::new();
        loop {
            match self.peek(0) {
                None => return Err(Self::error(line, column, "missing closing quote")),
                Some(b'\\') if self.peek(1) == Some(b'"') => {
                    self.bump();
                    self.bump();
                    buf.push(b'"');
                }
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    self.bump();
                    buf.push(c);
                }
            }
        }
        let text = String::from_utf8(buf)
            .map_err(|_| Self::error(line, column, "string literal is not valid UTF-8"))?;
        Ok(Token::new(TokenKind::String, text, line, column))
    }

    fn take_while(&mut self, accept: impl Fn(u8) -> bool) -> String {
        let start = self.offset;
        while let Some(c) = self.peek(0) {
            if !accept(c) {
                break;
            }
            self.bump();
        }
        // Every accepted byte is ASCII.
        String::from_utf8_lossy(&self.input[start..self.offset]).into_owned()
    }

    fn word(&mut self, c: u8, line: usize, column: usize) -> Result<Token, ConfigError> {
        if self.in_key {
            let key = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'.' || c == b'-');
            if key.is_empty() {
                return Err(Self::error(line, column, "invalid character in lvalue"));
            }
            return Ok(Token::new(TokenKind::Key, key, line, column));
        }
        if self.in_cond {
            if self.cond_operator_seen {
                return Err(Self::error(
                    line,
                    column,
                    "the condition value has to be a quoted string",
                ));
            }
            let name = self.take_while(|c| c.is_ascii_alphabetic());
            if name.is_empty() {
                return Err(Self::error(line, column, "invalid character in condition"));
            }
            return Ok(Token::new(TokenKind::VarName, name, line, column));
        }
        if c.is_ascii_digit() {
            let digits = self.take_while(|c| c.is_ascii_digit());
            return Ok(Token::new(TokenKind::Integer, digits, line, column));
        }
        Err(Self::error(line, column, "invalid value field"))
    }
}

/// Scan the whole input. The returned list always ends with one
/// [`TokenKind::Eof`].
pub fn tokenize(input: &[u8]) -> Result<Vec<Token>, ConfigError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input.as_bytes())
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn lex_err(input: &str) -> (usize, usize, std::string::String) {
        match tokenize(input.as_bytes()).unwrap_err() {
            ConfigError::Lex {
                line,
                column,
                reason,
            } => (line, column, reason),
            other => panic!("Expected Lex, got: {other:?}"),
        }
    }

    #[test]
    fn simple_assignment() {
        let tokens = tokenize(b"key = \"value\"\n").unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], Token::new(Key, "key", 1, 1));
        assert_eq!(tokens[1].kind, Assign);
        assert_eq!(tokens[2], Token::new(String, "value", 1, 7));
        assert_eq!(tokens[3].kind, Eol);
        assert_eq!(tokens[4].kind, Eof);
    }

    #[test]
    fn crlf_ends_line() {
        assert_eq!(
            kinds("a = 1\r\nb = 2\r\n"),
            vec![Key, Assign, Integer, Eol, Key, Assign, Integer, Eol, Eof]
        );
    }

    #[test]
    fn bare_cr_is_error_with_line() {
        let (line, column, reason) = lex_err("a = 1\nb = 2\r c = 3\n");
        assert_eq!(line, 2);
        assert_eq!(column, 6);
        assert!(reason.contains("CR without LF"));
    }

    #[test]
    fn unterminated_string_reports_opening_quote() {
        let (line, column, reason) = lex_err("a = \"ok\"\nb = \"never closed\n\n");
        assert_eq!(line, 2);
        assert_eq!(column, 5);
        assert!(reason.contains("missing closing quote"));
    }

    #[test]
    fn escaped_quote_in_string() {
        let tokens = tokenize(br#"tag = "say \"hi\"""#).unwrap();
        assert_eq!(tokens[2].text, "say \"hi\"");
    }

    #[test]
    fn backslash_without_quote_is_literal() {
        let tokens = tokenize(br#"p = "C:\dir""#).unwrap();
        assert_eq!(tokens[2].text, "C:\\dir");
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("# leading comment\na = \"x\" # trailing\n"),
            vec![Eol, Key, Assign, String, Eol, Eof]
        );
    }

    #[test]
    fn hash_inside_string_is_not_comment() {
        let tokens = tokenize(b"a = \"#not-a-comment\"\n").unwrap();
        assert_eq!(tokens[2].text, "#not-a-comment");
    }

    #[test]
    fn array_tokens_and_insignificant_newlines() {
        assert_eq!(
            kinds("m = (\n  \".html\" => \"text/html\",\n  \".txt\" => \"text/plain\"\n)\n"),
            vec![
                Key, Assign, LParen, String, ArrayAssign, String, Comma, String, ArrayAssign,
                String, RParen, Eol, Eof
            ]
        );
    }

    #[test]
    fn comma_outside_array_is_dropped() {
        assert_eq!(kinds("a = \"x\",\n"), vec![Key, Assign, String, Eol, Eof]);
    }

    #[test]
    fn condition_header() {
        let tokens = tokenize(b"$HTTPhost == \"example.com\" {\n}\n").unwrap();
        let k: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            k,
            vec![Dollar, VarName, Equal, String, LCurly, Eol, RCurly, Eol, Eof]
        );
        assert_eq!(tokens[1].text, "HTTPhost");
    }

    #[test]
    fn all_condition_operators() {
        for (op, kind) in [("==", Equal), ("!=", NotEqual), ("=~", Match), ("!~", NotMatch)] {
            let input = format!("$HTTPurl {op} \"/x\" {{\n}}\n");
            let tokens = tokenize(input.as_bytes()).unwrap();
            assert_eq!(tokens[2].kind, kind);
            assert_eq!(tokens[2].text, op);
        }
    }

    #[test]
    fn key_mode_resumes_inside_block() {
        assert_eq!(
            kinds("$HTTPhost == \"a\" { server.name = \"a\" }\n"),
            vec![Dollar, VarName, Equal, String, LCurly, Key, Assign, String, RCurly, Eol, Eof]
        );
    }

    #[test]
    fn second_equal_sign_is_error() {
        let (line, column, reason) = lex_err("a = = \"b\"\n");
        assert_eq!((line, column), (1, 5));
        assert!(reason.contains("unexpected equal-sign"));
    }

    #[test]
    fn equal_sign_in_array_needs_arrow() {
        let (_, _, reason) = lex_err("a = (\"x\" = \"y\")\n");
        assert!(reason.contains("=>"));
    }

    #[test]
    fn single_equal_in_condition_is_error() {
        let (_, _, reason) = lex_err("$HTTPhost = \"x\" {\n");
        assert!(reason.contains("=~ and =="));
    }

    #[test]
    fn exclamation_outside_condition_is_error() {
        let (line, column, _) = lex_err("a = 1\nb != 2\n");
        assert_eq!((line, column), (2, 3));
    }

    #[test]
    fn condition_value_must_be_quoted() {
        let (_, _, reason) = lex_err("$HTTPhost == example {\n");
        assert!(reason.contains("quoted string"));
    }

    #[test]
    fn digits_in_variable_name_rejected() {
        let (_, column, _) = lex_err("$1host == \"x\" {\n");
        assert_eq!(column, 2);
    }

    #[test]
    fn invalid_character_reports_column() {
        let (line, column, reason) = lex_err("a = @\n");
        assert_eq!((line, column), (1, 5));
        assert!(reason.contains("invalid value field"));
    }

    #[test]
    fn unbalanced_closing_paren() {
        let (_, _, reason) = lex_err("a = )\n");
        assert!(reason.contains("unbalanced"));
    }

    #[test]
    fn integers_outside_key_mode() {
        let tokens = tokenize(b"server.port = 8080\n").unwrap();
        assert_eq!(tokens[0].text, "server.port");
        assert_eq!(tokens[2], Token::new(Integer, "8080", 1, 15));
    }

    #[test]
    fn eof_is_sticky() {
        let mut lexer = Lexer::new(b"");
        assert_eq!(lexer.next_token().unwrap().kind, Eof);
        assert_eq!(lexer.next_token().unwrap().kind, Eof);
    }

    #[test]
    fn multiline_string_advances_line_count() {
        let tokens = tokenize(b"a = \"one\ntwo\"\nb = 1\n").unwrap();
        let b = tokens.iter().find(|t| t.text == "b").unwrap();
        assert_eq!(b.line, 3);
    }
}
