//! sdlc - command-line compiler for GraphQL schema documents
//!
//! Parses and checks the given schema files, then runs every generator
//! activated with a `--<name>_out=<dir>` switch.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use sdlc_cli::backends::{DocGenerator, GeneratorRegistry};
use sdlc_cli::{CancelContext, CompileError, Compiler};

/// Executable prefix for generator plugins found on `PATH`.
const PLUGIN_PREFIX: &str = "sdlc-gen-";

fn build_registry() -> anyhow::Result<GeneratorRegistry> {
    let mut registry = GeneratorRegistry::new();
    registry
        .register(
            Arc::new(DocGenerator),
            "doc_out",
            Some("doc_opt"),
            "Generate Markdown documentation",
        )
        .context("failed to register the doc generator")?;
    registry.allow_plugins(PLUGIN_PREFIX);
    Ok(registry)
}

fn main() -> ExitCode {
    let registry = match build_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            return ExitCode::from(1);
        }
    };

    let cancel = CancelContext::new();
    let handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.cancel()) {
        eprintln!(
            "{}: failed to install Ctrl-C handler: {}",
            colored::Colorize::yellow("warning"),
            e
        );
    }

    let args: Vec<String> = std::env::args().collect();
    match Compiler::new(registry).run(&args, &cancel) {
        Ok(_) => ExitCode::SUCCESS,
        Err(CompileError::Usage(e)) => {
            let _ = e.print();
            ExitCode::from(e.exit_code().clamp(0, 255) as u8)
        }
        Err(e) => {
            eprintln!("{}: {}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
