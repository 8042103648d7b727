//! The generator capability.

use sdlc_schema::Document;
use serde_json::{Map, Value};

use crate::cancel::CancelContext;
use crate::error::GeneratorError;
use crate::logging::Logger;
use crate::output::OutputContext;

/// Decoded `--<name>_opt` value. Empty when no options switch was given.
pub type GeneratorOptions = Map<String, Value>;

/// Everything a generator is handed for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct GenContext<'a> {
    /// File creation scoped to this generator's output directory.
    pub output: &'a OutputContext,
    pub cancel: &'a CancelContext,
    pub logger: &'a Logger,
}

/// Something that turns a document into output files.
///
/// Built-in generators and subprocess plugins both implement this; callers
/// never need to know which one they hold. Errors must already carry the
/// generator and document identity.
pub trait Generator: Send + Sync + std::fmt::Debug {
    fn generate(
        &self,
        ctx: &GenContext<'_>,
        doc: &Document,
        options: &GeneratorOptions,
    ) -> Result<(), GeneratorError>;
}
