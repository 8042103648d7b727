//! Error types for generation and compiler runs.
//!
//! [`GenerateError`] is what a generator can go wrong with. Before it leaves a
//! generator it is wrapped into a [`GeneratorError`] that names the generator
//! and document, so the pipeline never has to work out attribution itself.
//! [`CompileError`] is the single error a compiler run returns.

use std::fmt;
use std::path::PathBuf;

use sdlc_schema::{Diagnostic, ParseError};
use thiserror::Error;

use crate::backends::RegistryError;
use crate::output::OutputError;

/// Failure of one generator invocation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The plugin executable could not be located or started.
    #[error("plugin not found: {reason}")]
    PluginNotFound { reason: String },

    /// The plugin exited non-zero or answered with a malformed response.
    #[error("plugin protocol error: {0}")]
    PluginProtocol(String),

    /// The generator reported a failure through the normal channel.
    #[error("{0}")]
    Reported(String),

    /// An output file could not be created or written.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// The run was cancelled or the generator timed out.
    #[error("cancelled")]
    Cancelled,

    /// The generator's options could not be decoded.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl GenerateError {
    /// Attributes this error to a generator and document.
    pub fn attribute(self, generator: &str, document: &str) -> GeneratorError {
        GeneratorError {
            generator: generator.to_string(),
            document: document.to_string(),
            source: self,
        }
    }
}

/// A [`GenerateError`] tagged with where it happened.
#[derive(Debug, Error)]
#[error("{generator}: {document}: {source}")]
pub struct GeneratorError {
    pub generator: String,
    pub document: String,
    #[source]
    pub source: GenerateError,
}

/// The error kinds a compiler run can end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    DuplicateGenerator,
    DanglingOptions,
    ParseError,
    TypeCheckError,
    PluginNotFound,
    PluginProtocolError,
    GeneratorReported,
    InvalidPath,
    IoError,
    Cancelled,
    InternalFault,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::DuplicateGenerator => "DuplicateGenerator",
            ErrorKind::DanglingOptions => "DanglingOptions",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::TypeCheckError => "TypeCheckError",
            ErrorKind::PluginNotFound => "PluginNotFound",
            ErrorKind::PluginProtocolError => "PluginProtocolError",
            ErrorKind::GeneratorReported => "GeneratorReported",
            ErrorKind::InvalidPath => "InvalidPath",
            ErrorKind::IoError => "IOError",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::InternalFault => "InternalFault",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-check diagnostics composed into one error, one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type check failed with {} error(s)", self.0.len())?;
        for diag in &self.0 {
            write!(f, "\n  {}", diag)?;
        }
        Ok(())
    }
}

/// The error a compiler run ends with.
#[derive(Debug, Error)]
pub enum CompileError {
    /// An input file or argument combination was rejected before any work.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Generator switches were misconfigured.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A source file could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The documents failed type checking.
    #[error("{0}")]
    TypeCheck(Diagnostics),

    /// A generator failed.
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// The run was cancelled before generation finished.
    #[error("cancelled")]
    Cancelled,

    /// An unexpected fault was caught at the top of the run.
    #[error("internal fault: {message}\n{stack}")]
    InternalFault { message: String, stack: String },

    /// An input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Command-line usage error, rendered by clap.
    #[error("{0}")]
    Usage(#[from] clap::Error),
}

impl CompileError {
    /// Maps this error onto its reported kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::InvalidInput(_) | CompileError::Usage(_) => ErrorKind::InvalidInput,
            CompileError::Registry(e) => match e {
                RegistryError::DuplicateGenerator(_) => ErrorKind::DuplicateGenerator,
                RegistryError::DanglingOptions { .. } => ErrorKind::DanglingOptions,
                RegistryError::InvalidOptions { .. } => ErrorKind::InvalidInput,
            },
            CompileError::Parse(_) => ErrorKind::ParseError,
            CompileError::TypeCheck(_) => ErrorKind::TypeCheckError,
            CompileError::Generator(e) => match &e.source {
                GenerateError::PluginNotFound { .. } => ErrorKind::PluginNotFound,
                GenerateError::PluginProtocol(_) => ErrorKind::PluginProtocolError,
                GenerateError::Reported(_) | GenerateError::InvalidOptions(_) => {
                    ErrorKind::GeneratorReported
                }
                GenerateError::Output(OutputError::InvalidPath { .. }) => ErrorKind::InvalidPath,
                GenerateError::Output(_) => ErrorKind::IoError,
                GenerateError::Cancelled => ErrorKind::Cancelled,
            },
            CompileError::Cancelled => ErrorKind::Cancelled,
            CompileError::InternalFault { .. } => ErrorKind::InternalFault,
            CompileError::Io { .. } => ErrorKind::IoError,
        }
    }

    /// True for errors clap renders itself (including `--help`).
    pub fn is_usage(&self) -> bool {
        matches!(self, CompileError::Usage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdlc_schema::Position;

    #[test]
    fn test_generator_error_attribution() {
        let err = GenerateError::Reported("boom".to_string()).attribute("sdlc-gen-go", "users");
        assert_eq!(err.to_string(), "sdlc-gen-go: users: boom");

        let err = CompileError::from(err);
        assert_eq!(err.kind(), ErrorKind::GeneratorReported);
        assert_eq!(err.to_string(), "sdlc-gen-go: users: boom");
    }

    #[test]
    fn test_type_check_lists_every_diagnostic() {
        let err = CompileError::TypeCheck(Diagnostics(vec![
            Diagnostic::new("a", Position::new(1, 2), "unknown type 'X'"),
            Diagnostic::new("b", Position::new(3, 4), "unknown type 'Y'"),
        ]));
        assert_eq!(err.kind(), ErrorKind::TypeCheckError);
        assert_eq!(
            err.to_string(),
            "type check failed with 2 error(s)\n  a:1:2: unknown type 'X'\n  b:3:4: unknown type 'Y'"
        );
    }

    #[test]
    fn test_output_error_kinds() {
        let invalid = GenerateError::Output(OutputError::InvalidPath {
            name: "../x".to_string(),
            reason: "no".to_string(),
        })
        .attribute("doc", "api");
        assert_eq!(CompileError::from(invalid).kind(), ErrorKind::InvalidPath);

        let io = GenerateError::Output(OutputError::Io {
            path: PathBuf::from("out"),
            source: std::io::Error::other("disk full"),
        })
        .attribute("doc", "api");
        assert_eq!(CompileError::from(io).kind(), ErrorKind::IoError);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::IoError.to_string(), "IOError");
        assert_eq!(ErrorKind::InternalFault.as_str(), "InternalFault");
    }
}
