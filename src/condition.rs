//! Condition selectors and their evaluation against a live connection.
//!
//! A conditional block such as
//!
//! ```text
//! $HTTPhost == "example.com" { ... }
//! ```
//!
//! carries a [`Selector`]: the variable it inspects, an operator and the
//! literal (or pattern) on the right. [`evaluate`] is a pure function of the
//! selector and a [`Connection`]; it never logs on the hot path except when a
//! pattern condition has to fail closed.

use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::token::TokenKind;

/// Request attribute a condition can inspect.
///
/// The server exposes these attributes one after another while it processes
/// a request, so each variable also names the lifecycle stage at which the
/// blocks testing it are applied. [`Variable::ALL`] lists them in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Variable {
    ServerSocket,
    Host,
    Url,
    Referer,
    Cookie,
    UserAgent,
}

/// Lifecycle stage of a connection, named after the variable that becomes
/// known at that point.
pub type Stage = Variable;

impl Variable {
    pub const ALL: [Variable; 6] = [
        Variable::ServerSocket,
        Variable::Host,
        Variable::Url,
        Variable::Referer,
        Variable::Cookie,
        Variable::UserAgent,
    ];

    /// Map a name as written after `$` to a variable.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Variable::ServerSocket => "SERVERsocket",
            Variable::Host => "HTTPhost",
            Variable::Url => "HTTPurl",
            Variable::Referer => "HTTPreferer",
            Variable::Cookie => "HTTPcookie",
            Variable::UserAgent => "HTTPuseragent",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Match,
    NotMatch,
}

impl Operator {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Equal => Some(Operator::Equal),
            TokenKind::NotEqual => Some(Operator::NotEqual),
            TokenKind::Match => Some(Operator::Match),
            TokenKind::NotMatch => Some(Operator::NotMatch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Match => "=~",
            Operator::NotMatch => "!~",
        }
    }

    /// Whether the operator needs the pattern-matching capability.
    pub fn is_pattern(self) -> bool {
        matches!(self, Operator::Match | Operator::NotMatch)
    }
}

/// The `VARNAME OP "literal"` part of a block header.
#[derive(Debug, Clone)]
pub struct Selector {
    /// Name as written in the file, kept even when it is not a known variable.
    pub variable_name: String,
    pub variable: Option<Variable>,
    pub operator: Operator,
    pub pattern: String,
    regex: Option<Regex>,
}

impl Selector {
    pub fn new(variable_name: impl Into<String>, operator: Operator, pattern: impl Into<String>) -> Self {
        let variable_name = variable_name.into();
        Self {
            variable: Variable::from_name(&variable_name),
            variable_name,
            operator,
            pattern: pattern.into(),
            regex: None,
        }
    }

    /// Compile the pattern of a `=~`/`!~` selector. Equality selectors are
    /// left alone.
    pub fn compile(&mut self) -> Result<(), regex::Error> {
        if self.operator.is_pattern() && self.regex.is_none() {
            self.regex = Some(Regex::new(&self.pattern)?);
        }
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.regex.is_some()
    }
}

/// Renders the selector as it would appear in a block header.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${} {} \"{}\"",
            self.variable_name,
            self.operator.as_str(),
            self.pattern.replace('"', "\\\"")
        )
    }
}

/// Read access to the request attributes a condition can test.
pub trait Connection {
    /// Host/authority of the request.
    fn authority(&self) -> &str;
    /// Request path.
    fn path(&self) -> &str;
    /// Value of a request header; `None` when it was not sent.
    fn header(&self, name: &str) -> Option<&str>;
    /// Identity of the listening socket the connection arrived on.
    fn server_socket(&self) -> &str;
}

/// Plain request description. Header names are matched ASCII
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub authority: String,
    pub path: String,
    pub server_socket: String,
    pub headers: Vec<(String, String)>,
}

impl RequestInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_server_socket(mut self, socket: impl Into<String>) -> Self {
        self.server_socket = socket.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl Connection for RequestInfo {
    fn authority(&self) -> &str {
        &self.authority
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn server_socket(&self) -> &str {
        &self.server_socket
    }
}

fn attribute<C: Connection + ?Sized>(variable: Variable, conn: &C) -> &str {
    match variable {
        Variable::Host => conn.authority(),
        Variable::Url => conn.path(),
        Variable::ServerSocket => conn.server_socket(),
        Variable::Referer => conn.header("Referer").unwrap_or(""),
        Variable::Cookie => conn.header("Cookie").unwrap_or(""),
        Variable::UserAgent => conn.header("User-Agent").unwrap_or(""),
    }
}

/// Decide whether `selector` holds for `conn`.
///
/// Unknown variables never match. A pattern selector whose pattern was not
/// compiled evaluates to `false`.
pub fn evaluate<C: Connection + ?Sized>(selector: &Selector, conn: &C) -> bool {
    let Some(variable) = selector.variable else {
        return false;
    };
    let value = attribute(variable, conn);
    match selector.operator {
        Operator::Equal => value == selector.pattern,
        Operator::NotEqual => value != selector.pattern,
        Operator::Match | Operator::NotMatch => {
            let Some(regex) = &selector.regex else {
                tracing::warn!(
                    context = %selector,
                    "pattern condition has no compiled pattern, treating as false"
                );
                return false;
            };
            regex.is_match(value) == (selector.operator == Operator::Match)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(name: &str, op: Operator, pattern: &str) -> Selector {
        let mut s = Selector::new(name, op, pattern);
        s.compile().unwrap();
        s
    }

    #[test]
    fn variable_names_round_trip() {
        for v in Variable::ALL {
            assert_eq!(Variable::from_name(v.name()), Some(v));
        }
        assert_eq!(Variable::from_name("HTTPHOST"), None);
        assert_eq!(Variable::from_name("PHYSICALpath"), None);
    }

    #[test]
    fn equality_is_exact() {
        let conn = RequestInfo::new().with_authority("example.com");
        assert!(evaluate(&Selector::new("HTTPhost", Operator::Equal, "example.com"), &conn));
        assert!(!evaluate(&Selector::new("HTTPhost", Operator::Equal, "Example.com"), &conn));
        assert!(!evaluate(&Selector::new("HTTPhost", Operator::Equal, "example.co"), &conn));
    }

    #[test]
    fn inequality_negates_equality() {
        let conn = RequestInfo::new().with_path("/index.html");
        for pattern in ["/index.html", "/other"] {
            let eq = Selector::new("HTTPurl", Operator::Equal, pattern);
            let ne = Selector::new("HTTPurl", Operator::NotEqual, pattern);
            assert_ne!(evaluate(&eq, &conn), evaluate(&ne, &conn));
        }
    }

    #[test]
    fn missing_header_compares_as_empty() {
        let conn = RequestInfo::new();
        assert!(evaluate(&Selector::new("HTTPreferer", Operator::Equal, ""), &conn));
        assert!(!evaluate(&Selector::new("HTTPcookie", Operator::NotEqual, ""), &conn));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let conn = RequestInfo::new().with_header("user-agent", "curl/8.0");
        assert!(evaluate(
            &Selector::new("HTTPuseragent", Operator::Equal, "curl/8.0"),
            &conn
        ));
    }

    #[test]
    fn socket_variable() {
        let conn = RequestInfo::new().with_server_socket(":443");
        assert!(evaluate(&Selector::new("SERVERsocket", Operator::Equal, ":443"), &conn));
    }

    #[test]
    fn unknown_variable_never_matches() {
        let conn = RequestInfo::new();
        assert!(!evaluate(&Selector::new("HTTPmethod", Operator::Equal, ""), &conn));
        assert!(!evaluate(&Selector::new("HTTPmethod", Operator::NotEqual, "x"), &conn));
    }

    #[test]
    fn pattern_is_unanchored_search() {
        let conn = RequestInfo::new().with_path("/cgi-bin/run.pl");
        assert!(evaluate(&compiled("HTTPurl", Operator::Match, r"\.pl$"), &conn));
        assert!(evaluate(&compiled("HTTPurl", Operator::Match, "cgi"), &conn));
        assert!(!evaluate(&compiled("HTTPurl", Operator::NotMatch, "cgi"), &conn));
        assert!(evaluate(&compiled("HTTPurl", Operator::NotMatch, r"^/static/"), &conn));
    }

    #[test]
    fn uncompiled_pattern_fails_closed() {
        let conn = RequestInfo::new().with_path("/anything");
        let match_any = Selector::new("HTTPurl", Operator::Match, ".*");
        let no_match = Selector::new("HTTPurl", Operator::NotMatch, "^$");
        assert!(!match_any.is_compiled());
        assert!(!evaluate(&match_any, &conn));
        assert!(!evaluate(&no_match, &conn));
    }

    #[test]
    fn compile_leaves_equality_selectors_alone() {
        let mut s = Selector::new("HTTPhost", Operator::Equal, "(unbalanced");
        s.compile().unwrap();
        assert!(!s.is_compiled());
    }

    #[test]
    fn compile_rejects_bad_pattern() {
        let mut s = Selector::new("HTTPhost", Operator::Match, "(unbalanced");
        assert!(s.compile().is_err());
    }

    #[test]
    fn display_renders_header() {
        let s = Selector::new("HTTPhost", Operator::NotMatch, "^www\\.");
        assert_eq!(s.to_string(), r#"$HTTPhost !~ "^www\.""#);
    }
}
