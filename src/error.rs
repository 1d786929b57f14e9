use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurlyError {
    #[error("Lexer Error: {0}")]
    Lex(#[from] LexError),
    #[error("Parser Error: {0}")]
    Parse(#[from] ParseError),
    #[error("Evaluate Error: {0}")]
    Evaluate(#[from] EvaluateError),
    #[error("Serialization Error: {0}")]
    Serialization(String),
}

/// Errors raised while splitting text into tokens.
///
/// The tokenizer currently never fails: malformed tags fall back to literal
/// text. The type is kept so a stricter lexer can report through the same
/// taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("String {text:?} is not valid for pattern {pattern:?}")]
    StringDoesNotMatch { text: String, pattern: String },
}

/// Errors raised while reducing tokens into a tree. Every variant carries the
/// raw source text of the offending tag.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unknown block tag {function} for token {tag:?}")]
    UnknownStartFunction { function: String, tag: String },
    #[error("Unknown block tag {function} for token {tag:?}")]
    UnknownEndFunction { function: String, tag: String },
    #[error("Cannot find matching start statement for {tag:?}")]
    UnmatchedStart { tag: String },
    #[error("Cannot find enclosement statement for {tag:?}")]
    UnmatchedEnd { tag: String },
    #[error("Expected to find matching {expected} statement, got {found} instead at {tag:?}")]
    MismatchedTag {
        expected: &'static str,
        found: &'static str,
        tag: String,
    },
    #[error("More than one else branch in conditional at {tag:?}")]
    MultipleElse { tag: String },
    #[error("Else branch must be the last branch of a conditional at {tag:?}")]
    ElseNotLast { tag: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluateError {
    #[error("Context {context} has no key {key:?}")]
    NoSuchKey { key: String, context: String },
    #[error("Value of {path:?} is not iterable: {value}")]
    NotIterable { path: String, value: String },
}

pub type Result<T, E = CurlyError> = std::result::Result<T, E>;

impl serde::ser::Error for CurlyError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        CurlyError::Serialization(msg.to_string())
    }
}
