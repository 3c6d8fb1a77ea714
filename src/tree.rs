//! Push parser that turns the token stream into an ordered list of
//! [`Context`]s.
//!
//! The builder is fed one token at a time through [`TreeBuilder::push`] and
//! stops at the first token that does not fit the grammar:
//!
//! ```text
//! statement   := assignment | conditional | EOL
//! assignment  := KEY '=' value (EOL | '}' | EOF)
//! value       := STRING | INTEGER | array
//! array       := '(' [ element (',' element)* [','] ] ')'
//! element     := ((STRING | INTEGER) '=>')? value
//! conditional := '$' VARNAME OP STRING '{' statement* '}'
//! ```
//!
//! Context 0 is always the unconditional `global` block. Every conditional
//! block appends a new Context in the order its header appears, so nested
//! blocks come after their parent.

use crate::condition::{Operator, Selector, Stage};
use crate::error::ConfigError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use crate::value::{ArrayItem, Entry, Value};

pub const GLOBAL_CONTEXT: &str = "global";

/// Deepest array nesting accepted in a value.
pub const MAX_ARRAY_DEPTH: usize = 64;

/// A block of the configuration file and the assignments written directly in
/// it.
#[derive(Debug, Clone)]
pub struct Context {
    /// `global`, or the rendered block header.
    pub name: String,
    pub entries: Vec<Entry>,
    pub selector: Option<Selector>,
    /// Stage at which the block is applied. `None` for the global block and
    /// for blocks testing an unknown variable, which are never applied.
    pub stage: Option<Stage>,
    /// Index of the enclosing conditional block.
    pub parent: Option<usize>,
    /// Line of the block header (1 for the global block).
    pub line: usize,
}

impl Context {
    pub fn global() -> Self {
        Self {
            name: GLOBAL_CONTEXT.to_string(),
            entries: Vec::new(),
            selector: None,
            stage: None,
            parent: None,
            line: 1,
        }
    }

    fn conditional(selector: Selector, parent: Option<usize>, line: usize) -> Self {
        Self {
            name: selector.to_string(),
            stage: selector.variable,
            entries: Vec::new(),
            selector: Some(selector),
            parent,
            line,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn is_conditional(&self) -> bool {
        self.selector.is_some()
    }
}

#[derive(Debug)]
enum ArrayState {
    /// After `(` or `,`: an element or `)`.
    Element,
    /// A scalar was read; it becomes a key if `=>` follows.
    Scalar(Value),
    /// After `key =>`: the element's value.
    KeyedValue(String),
    /// After a complete element: `,` or `)`.
    AfterElement,
}

#[derive(Debug)]
struct ArrayFrame {
    items: Vec<ArrayItem>,
    state: ArrayState,
    /// Key under which the finished array is stored in the enclosing array.
    slot_key: Option<String>,
}

impl ArrayFrame {
    fn new(slot_key: Option<String>) -> Self {
        Self {
            items: Vec::new(),
            state: ArrayState::Element,
            slot_key,
        }
    }
}

#[derive(Debug)]
enum State {
    Statement,
    AfterKey {
        key: String,
        line: usize,
        column: usize,
    },
    Value {
        key: String,
        line: usize,
        column: usize,
    },
    InArray {
        key: String,
        line: usize,
        column: usize,
    },
    AfterValue,
    CondVar {
        line: usize,
    },
    CondOperator {
        name: String,
        line: usize,
    },
    CondPattern {
        name: String,
        operator: Operator,
        line: usize,
    },
    CondOpen {
        selector: Selector,
        line: usize,
    },
    Done,
}

#[derive(Debug)]
pub struct TreeBuilder {
    contexts: Vec<Context>,
    /// Indices of the currently open conditional blocks, innermost last.
    open: Vec<usize>,
    arrays: Vec<ArrayFrame>,
    state: State,
    last: (usize, usize),
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected(token: &Token, expected: &str) -> ConfigError {
    let found = match token.kind {
        TokenKind::Key | TokenKind::Integer | TokenKind::VarName => {
            format!("{} '{}'", token.kind, token.text)
        }
        TokenKind::String => format!("string \"{}\"", token.text),
        _ => token.kind.to_string(),
    };
    ConfigError::Parse {
        line: token.line,
        column: token.column,
        reason: format!("unexpected {found}, expected {expected}"),
    }
}

fn scalar(token: &Token) -> Option<Value> {
    match token.kind {
        TokenKind::String => Some(Value::String(token.text.clone())),
        TokenKind::Integer => Some(Value::Integer(token.text.clone())),
        _ => None,
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            contexts: vec![Context::global()],
            open: Vec::new(),
            arrays: Vec::new(),
            state: State::Statement,
            last: (1, 1),
        }
    }

    fn current(&self) -> usize {
        self.open.last().copied().unwrap_or(0)
    }

    /// Feed the next token. After an error the builder must be discarded.
    pub fn push(&mut self, token: Token) -> Result<(), ConfigError> {
        self.last = (token.line, token.column);
        let state = std::mem::replace(&mut self.state, State::Done);
        self.state = self.step(state, token)?;
        Ok(())
    }

    fn step(&mut self, state: State, token: Token) -> Result<State, ConfigError> {
        use TokenKind as K;

        match state {
            State::Statement => match token.kind {
                K::Eol => Ok(State::Statement),
                K::Key => Ok(State::AfterKey {
                    key: token.text,
                    line: token.line,
                    column: token.column,
                }),
                K::Dollar => Ok(State::CondVar { line: token.line }),
                K::RCurly => self.close_block(&token),
                K::Eof => self.end_of_input(&token),
                _ => Err(unexpected(&token, "a key, '$' or '}'")),
            },
            State::AfterKey { key, line, column } => match token.kind {
                K::Assign => Ok(State::Value { key, line, column }),
                _ => Err(unexpected(&token, "'='")),
            },
            State::Value { key, line, column } => {
                if let Some(value) = scalar(&token) {
                    return self.complete(key, value, line, column);
                }
                match token.kind {
                    K::LParen => {
                        self.arrays.push(ArrayFrame::new(None));
                        Ok(State::InArray { key, line, column })
                    }
                    _ => Err(unexpected(&token, "a string, an integer or '('")),
                }
            }
            State::InArray { key, line, column } => match self.array_step(token)? {
                Some(value) => self.complete(key, value, line, column),
                None => Ok(State::InArray { key, line, column }),
            },
            State::AfterValue => match token.kind {
                K::Eol => Ok(State::Statement),
                K::RCurly => self.close_block(&token),
                K::Eof => self.end_of_input(&token),
                _ => Err(unexpected(&token, "end of line")),
            },
            State::CondVar { line } => match token.kind {
                K::VarName => Ok(State::CondOperator {
                    name: token.text,
                    line,
                }),
                _ => Err(unexpected(&token, "a variable name")),
            },
            State::CondOperator { name, line } => match Operator::from_token(token.kind) {
                Some(operator) => Ok(State::CondPattern {
                    name,
                    operator,
                    line,
                }),
                None => Err(unexpected(&token, "'==', '!=', '=~' or '!~'")),
            },
            State::CondPattern {
                name,
                operator,
                line,
            } => match token.kind {
                K::String => Ok(State::CondOpen {
                    selector: Selector::new(name, operator, token.text),
                    line,
                }),
                _ => Err(unexpected(&token, "a quoted string")),
            },
            State::CondOpen { selector, line } => match token.kind {
                K::Eol => Ok(State::CondOpen { selector, line }),
                K::LCurly => {
                    let parent = self.open.last().copied();
                    self.contexts
                        .push(Context::conditional(selector, parent, line));
                    self.open.push(self.contexts.len() - 1);
                    Ok(State::Statement)
                }
                _ => Err(unexpected(&token, "'{'")),
            },
            State::Done => Err(ConfigError::Parse {
                line: token.line,
                column: token.column,
                reason: "token after end of input".into(),
            }),
        }
    }

    /// Advance the innermost array. Returns the finished outermost array.
    fn array_step(&mut self, token: Token) -> Result<Option<Value>, ConfigError> {
        let Some(frame) = self.arrays.last_mut() else {
            return Err(unexpected(&token, "an array"));
        };
        let state = std::mem::replace(&mut frame.state, ArrayState::AfterElement);
        match (state, token.kind) {
            (ArrayState::Element, TokenKind::RParen) => return Ok(self.close_array()),
            (ArrayState::Element, TokenKind::LParen) => self.open_array(None, &token)?,
            (ArrayState::Element, _) => match scalar(&token) {
                Some(value) => frame.state = ArrayState::Scalar(value),
                None => return Err(unexpected(&token, "an array element or ')'")),
            },
            (ArrayState::Scalar(value), TokenKind::ArrayAssign) => {
                let key = match value {
                    Value::String(s) | Value::Integer(s) => s,
                    Value::Array(_) => return Err(unexpected(&token, "',' or ')'")),
                };
                frame.state = ArrayState::KeyedValue(key);
            }
            (ArrayState::Scalar(value), TokenKind::Comma) => {
                frame.items.push(ArrayItem::plain(value));
                frame.state = ArrayState::Element;
            }
            (ArrayState::Scalar(value), TokenKind::RParen) => {
                frame.items.push(ArrayItem::plain(value));
                return Ok(self.close_array());
            }
            (ArrayState::Scalar(_), _) => return Err(unexpected(&token, "'=>', ',' or ')'")),
            (ArrayState::KeyedValue(key), TokenKind::LParen) => {
                self.open_array(Some(key), &token)?
            }
            (ArrayState::KeyedValue(key), _) => match scalar(&token) {
                Some(value) => frame.items.push(ArrayItem::keyed(key, value)),
                None => return Err(unexpected(&token, "a value after '=>'")),
            },
            (ArrayState::AfterElement, TokenKind::Comma) => frame.state = ArrayState::Element,
            (ArrayState::AfterElement, TokenKind::RParen) => return Ok(self.close_array()),
            (ArrayState::AfterElement, _) => return Err(unexpected(&token, "',' or ')'")),
        }
        Ok(None)
    }

    fn open_array(&mut self, slot_key: Option<String>, token: &Token) -> Result<(), ConfigError> {
        if self.arrays.len() >= MAX_ARRAY_DEPTH {
            return Err(ConfigError::Parse {
                line: token.line,
                column: token.column,
                reason: format!("arrays nested deeper than {MAX_ARRAY_DEPTH} levels"),
            });
        }
        self.arrays.push(ArrayFrame::new(slot_key));
        Ok(())
    }

    fn close_array(&mut self) -> Option<Value> {
        let frame = self.arrays.pop()?;
        let value = Value::Array(frame.items);
        match self.arrays.last_mut() {
            Some(parent) => {
                parent.items.push(ArrayItem {
                    key: frame.slot_key,
                    value,
                });
                parent.state = ArrayState::AfterElement;
                None
            }
            None => Some(value),
        }
    }

    fn complete(
        &mut self,
        key: String,
        value: Value,
        line: usize,
        column: usize,
    ) -> Result<State, ConfigError> {
        let index = self.current();
        let context = &mut self.contexts[index];
        if context.get(&key).is_some() {
            return Err(ConfigError::Parse {
                line,
                column,
                reason: format!("duplicate key '{key}' in {}", context.name),
            });
        }
        context.entries.push(Entry { key, value, line });
        Ok(State::AfterValue)
    }

    fn close_block(&mut self, token: &Token) -> Result<State, ConfigError> {
        match self.open.pop() {
            Some(_) => Ok(State::Statement),
            None => Err(unexpected(token, "a key or '$'")),
        }
    }

    fn end_of_input(&mut self, token: &Token) -> Result<State, ConfigError> {
        if let Some(&index) = self.open.last() {
            return Err(ConfigError::Parse {
                line: token.line,
                column: token.column,
                reason: format!(
                    "missing '}}' for block '{}' opened on line {}",
                    self.contexts[index].name, self.contexts[index].line
                ),
            });
        }
        Ok(State::Done)
    }

    /// Hand out the Context list. Fails if the end-of-input token was never
    /// accepted.
    pub fn finish(self) -> Result<Vec<Context>, ConfigError> {
        match self.state {
            State::Done => Ok(self.contexts),
            _ => Err(ConfigError::Parse {
                line: self.last.0,
                column: self.last.1,
                reason: "unexpected end of input".into(),
            }),
        }
    }
}

/// Lex and parse a whole buffer.
pub fn parse(input: &[u8]) -> Result<Vec<Context>, ConfigError> {
    let mut lexer = Lexer::new(input);
    let mut builder = TreeBuilder::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        builder.push(token)?;
        if done {
            return builder.finish();
        }
    }
}
