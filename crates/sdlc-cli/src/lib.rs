//! sdlc compiler library.
//!
//! This crate provides the compiler driver for GraphQL schema documents:
//! switch-based generator registration, the compile pipeline, scoped output
//! directories and the plugin subprocess protocol.

pub mod backends;
pub mod cancel;
pub mod compiler;
pub mod error;
pub mod fault;
pub mod generator;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod vfs;

pub use cancel::CancelContext;
pub use compiler::{Cli, Compiler};
pub use error::{CompileError, ErrorKind, GenerateError, GeneratorError};
pub use generator::{GenContext, Generator, GeneratorOptions};
pub use logging::Logger;
pub use output::{OutputContext, OutputError, OutputFile};
pub use pipeline::{CompilerConfig, Pipeline};
