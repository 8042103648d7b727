//! Generator backends and the registry that binds them to switches.
//!
//! # Overview
//!
//! Every backend implements [`Generator`](crate::generator::Generator):
//!
//! - [`DocGenerator`]: built in, renders Markdown reference pages
//! - [`PluginGenerator`]: runs an external `<prefix><name>` executable
//!
//! # Plugin Protocol
//!
//! For each `(plugin, document)` pair:
//!
//! 1. The compiler spawns the plugin with piped stdin, stdout and stderr
//! 2. It writes one framed `Request` holding the document and the JSON
//!    encoded options to the plugin's stdin
//! 3. The plugin writes one framed `Response` to stdout and exits 0
//! 4. A non-empty `error` in the response is a reported failure; a non-zero
//!    exit or an undecodable response is a protocol failure
//! 5. Returned files are written, in order, below the plugin's output
//!    directory
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sdlc_cli::backends::{DocGenerator, GeneratorRegistry};
//!
//! let mut registry = GeneratorRegistry::new();
//! registry
//!     .register(Arc::new(DocGenerator), "doc_out", Some("doc_opt"), "Generate Markdown docs")
//!     .unwrap();
//! registry.allow_plugins("sdlc-gen-");
//!
//! let schema = registry.switch_schema(&["sdlc", "--doc_out=docs", "--go_out=gen", "api.gql"]);
//! assert_eq!(schema.bindings().len(), 2);
//! ```

mod doc;
mod registry;
mod subprocess;

pub use doc::DocGenerator;
pub use registry::{
    GeneratorRegistry, RegistryEntry, RegistryError, SwitchBinding, SwitchSchema,
    GENERATOR_HEADING,
};
pub use subprocess::{PluginGenerator, SubprocessConfig, DEFAULT_TIMEOUT_SECS};
