//! Error types for parsing and checking schema documents.

use crate::ast::Position;
use thiserror::Error;

/// A source file that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Path of the offending file.
    pub file: String,
    /// Location of the error, when it points into the source.
    pub position: Option<Position>,
    /// Human-readable error message.
    pub message: String,
}

impl ParseError {
    /// Creates a parse error pointing at a source location.
    pub fn at(file: impl Into<String>, position: Position, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            position: Some(position),
            message: message.into(),
        }
    }

    /// Creates a parse error for the file as a whole.
    pub fn file(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            position: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{}:{}: {}", self.file, pos, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

impl std::error::Error for ParseError {}

/// A semantic problem found by the type checker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{document}:{position}: {message}")]
pub struct Diagnostic {
    /// Name of the document the problem was found in.
    pub document: String,
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(document: impl Into<String>, position: Position, message: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            position,
            message: message.into(),
        }
    }
}

/// Errors from encoding or decoding wire protocol frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame could not be read or written.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload is not valid message JSON.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// The length prefix exceeds the frame size limit.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u64, max: u64 },

    /// Fewer payload bytes were present than the prefix announced.
    #[error("truncated frame: expected {expected} payload bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Data followed the single frame.
    #[error("{0} unexpected trailing bytes after frame")]
    TrailingBytes(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::at("schema.gql", Position::new(3, 7), "expected ':'");
        assert_eq!(err.to_string(), "schema.gql:3:7: expected ':'");

        let err = ParseError::file("schema.gql", "not valid UTF-8");
        assert_eq!(err.to_string(), "schema.gql: not valid UTF-8");
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new("schema", Position::new(1, 14), "unknown type 'Strin'");
        assert_eq!(diag.to_string(), "schema:1:14: unknown type 'Strin'");
    }
}
