//! Core types for the debugger library
//!
//! This module defines the machine word, watchpoint identifiers and the
//! error type shared by the tokenizer, the evaluator and the watchpoint pool.

use std::fmt;

/// Native machine word of the simulated CPU (RISC-V 32)
///
/// Used uniformly for addresses and values. All arithmetic wraps at this width.
pub type Word = u32;

/// Width of a machine word in bytes
pub const WORD_BYTES: usize = std::mem::size_of::<Word>();

/// Stable watchpoint identifier (the index of its pool slot)
pub type WatchpointId = usize;

/// Result type for debugger operations
pub type Result<T> = std::result::Result<T, SdbError>;

/// Errors that can occur while evaluating expressions or managing watchpoints
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdbError {
    #[error("no match at position {position}\n{input}\n{}", caret_line(.input, .position))]
    Lex { position: usize, input: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid register name: ${0}")]
    UnknownRegister(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("No free watchpoints available (capacity {capacity})")]
    ResourceExhausted { capacity: usize },

    #[error("No watchpoint with number {0}")]
    NotFound(WatchpointId),

    #[error("Watchpoint {0} not found in active list")]
    NotActive(WatchpointId),

    #[error("{what} too long: {len} (max {max})")]
    InputTooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid token pattern: {0}")]
    Regex(String),
}

/// Caret under byte offset `position`, padded in characters
fn caret_line(input: &str, position: &usize) -> String {
    let column = input
        .get(..*position)
        .map_or(*position, |prefix| prefix.chars().count());
    format!("{}^", " ".repeat(column))
}

impl From<regex::Error> for SdbError {
    fn from(err: regex::Error) -> Self {
        SdbError::Regex(err.to_string())
    }
}

/// Coarse error taxonomy, one class per recovery situation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No lexical rule matched
    LexError,
    /// Malformed token range or literal
    ParseError,
    /// Well-formed expression that cannot be computed
    EvalError,
    /// No free watchpoint slot
    ResourceExhausted,
    /// Unknown watchpoint id
    NotFound,
    /// Text or token count over a fixed bound
    InputTooLong,
    /// Broken invariant or setup failure
    Internal,
}

impl SdbError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SdbError::Lex { .. } => ErrorKind::LexError,
            SdbError::Parse(_) => ErrorKind::ParseError,
            SdbError::UnknownRegister(_) | SdbError::DivisionByZero => ErrorKind::EvalError,
            SdbError::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            SdbError::NotFound(_) => ErrorKind::NotFound,
            SdbError::InputTooLong { .. } => ErrorKind::InputTooLong,
            SdbError::NotActive(_) | SdbError::InvalidConfig(_) | SdbError::Regex(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::LexError => write!(f, "LexError"),
            ErrorKind::ParseError => write!(f, "ParseError"),
            ErrorKind::EvalError => write!(f, "EvalError"),
            ErrorKind::ResourceExhausted => write!(f, "ResourceExhausted"),
            ErrorKind::NotFound => write!(f, "NotFound"),
            ErrorKind::InputTooLong => write!(f, "InputTooLong"),
            ErrorKind::Internal => write!(f, "Internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_points_at_offset() {
        let err = SdbError::Lex {
            position: 2,
            input: "1 @ 2".to_string(),
        };
        assert_eq!(err.to_string(), "no match at position 2\n1 @ 2\n  ^");
    }

    #[test]
    fn test_lex_error_caret_after_multibyte_char() {
        // `é` is two bytes but one column
        let err = SdbError::Lex {
            position: 3,
            input: "é @".to_string(),
        };
        assert_eq!(err.to_string(), "no match at position 3\né @\n  ^");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(SdbError::DivisionByZero.kind(), ErrorKind::EvalError);
        assert_eq!(SdbError::UnknownRegister("foo".into()).kind(), ErrorKind::EvalError);
        assert_eq!(SdbError::NotFound(3).kind(), ErrorKind::NotFound);
        assert_eq!(SdbError::NotActive(3).kind(), ErrorKind::Internal);
        assert_eq!(
            SdbError::ResourceExhausted { capacity: 32 }.kind(),
            ErrorKind::ResourceExhausted
        );
    }

    #[test]
    fn test_word_width() {
        assert_eq!(WORD_BYTES, 4);
    }
}
