//! Command-line front end: turns an argument list into a compiler run.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches, Parser};
use sdlc_schema::Document;

use crate::backends::GeneratorRegistry;
use crate::cancel::CancelContext;
use crate::error::CompileError;
use crate::fault;
use crate::logging::Logger;
use crate::pipeline::{CompilerConfig, Pipeline};
use crate::vfs::{FileSystem, OsFs};

/// sdlc - GraphQL schema compiler
#[derive(Parser, Debug)]
#[command(name = "sdlc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories searched for input files, comma separated or repeated
    #[arg(
        short = 'I',
        long = "import_path",
        value_name = "DIR",
        value_delimiter = ',',
        default_value = "."
    )]
    pub import_path: Vec<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Generator invocations to run in parallel
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// Schema files to compile (.gql or .graphql)
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<String>,
}

/// A configured compiler: a generator registry plus the filesystem it
/// reads and writes through.
pub struct Compiler {
    registry: GeneratorRegistry,
    fs: Arc<dyn FileSystem>,
    logger: Option<Logger>,
}

impl Compiler {
    /// Creates a compiler using the real filesystem.
    pub fn new(registry: GeneratorRegistry) -> Self {
        Self::with_fs(registry, Arc::new(OsFs))
    }

    pub fn with_fs(registry: GeneratorRegistry, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            registry,
            fs,
            logger: None,
        }
    }

    /// Uses `logger` instead of the stderr logger selected by `--verbose`.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    /// Runs the compiler over `args`, program name first.
    ///
    /// Any panic raised during the run is returned as
    /// [`CompileError::InternalFault`].
    pub fn run<S: AsRef<str>>(
        &self,
        args: &[S],
        cancel: &CancelContext,
    ) -> Result<Vec<Document>, CompileError> {
        fault::guard(|| self.run_unguarded(args, cancel))
    }

    fn run_unguarded<S: AsRef<str>>(
        &self,
        args: &[S],
        cancel: &CancelContext,
    ) -> Result<Vec<Document>, CompileError> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();

        let schema = self.registry.switch_schema(&args);
        let matches = schema.augment(Cli::command()).try_get_matches_from(&args)?;
        let cli = Cli::from_arg_matches(&matches)?;
        let entries = schema.resolve(&matches)?;

        let logger = match &self.logger {
            Some(logger) => logger.clone(),
            None => Logger::stderr(cli.verbose),
        };
        let config = CompilerConfig {
            import_paths: cli.import_path,
            jobs: cli.jobs.max(1),
        };
        logger.in_scope(|| {
            let active: Vec<&str> = entries
                .iter()
                .filter(|e| e.activated)
                .map(|e| e.name.as_str())
                .collect();
            tracing::debug!(
                files = cli.files.len(),
                generators = ?active,
                jobs = config.jobs,
                "starting compile"
            );
        });

        Pipeline::new(Arc::clone(&self.fs), config, logger).run(cancel, &entries, &cli.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::DocGenerator;
    use crate::error::{ErrorKind, GeneratorError};
    use crate::generator::{GenContext, Generator, GeneratorOptions};
    use crate::vfs::MemFs;

    #[derive(Debug)]
    struct Panicking;

    impl Generator for Panicking {
        fn generate(
            &self,
            _ctx: &GenContext<'_>,
            doc: &Document,
            _options: &GeneratorOptions,
        ) -> Result<(), GeneratorError> {
            panic!("generator bug on {}", doc.name);
        }
    }

    fn compiler(fs: &MemFs) -> Compiler {
        let mut registry = GeneratorRegistry::new();
        registry
            .register(Arc::new(DocGenerator), "doc_out", Some("doc_opt"), "Generate docs")
            .unwrap();
        registry
            .register(Arc::new(Panicking), "panic_out", None, "Always panics")
            .unwrap();
        Compiler::with_fs(registry, Arc::new(fs.clone())).with_logger(Logger::disabled())
    }

    fn fixture() -> MemFs {
        let fs = MemFs::new();
        fs.add_file("api.gql", "type Query { hello: String }");
        fs
    }

    #[test]
    fn test_compile_with_doc_generator() {
        let fs = fixture();
        let docs = compiler(&fs)
            .run(&["sdlc", "--doc_out=out", "api.gql"], &CancelContext::new())
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(fs.paths(), vec![PathBuf::from("api.gql"), PathBuf::from("out/api.md")]);
    }

    #[test]
    fn test_compile_without_generators_only_checks() {
        let fs = fixture();
        compiler(&fs)
            .run(&["sdlc", "api.gql"], &CancelContext::new())
            .unwrap();
        assert_eq!(fs.paths().len(), 1);
    }

    #[test]
    fn test_import_path_switch() {
        let fs = MemFs::new();
        fs.add_file("schemas/api.gql", "type Query { hello: String }");

        let docs = compiler(&fs)
            .run(&["sdlc", "-I", "other,schemas", "api.gql"], &CancelContext::new())
            .unwrap();
        assert_eq!(docs[0].name, "api");
    }

    #[test]
    fn test_usage_errors() {
        let fs = fixture();
        let compiler = compiler(&fs);

        let err = compiler.run(&["sdlc"], &CancelContext::new()).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = compiler
            .run(&["sdlc", "--java_out=x", "api.gql"], &CancelContext::new())
            .unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_dangling_options() {
        let fs = fixture();
        let err = compiler(&fs)
            .run(&["sdlc", "--doc_opt={}", "api.gql"], &CancelContext::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingOptions);
        assert_eq!(fs.paths().len(), 1);
    }

    #[test]
    fn test_panicking_generator_is_contained() {
        let fs = fixture();
        let err = compiler(&fs)
            .run(&["sdlc", "--panic_out=out", "api.gql"], &CancelContext::new())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InternalFault);
        match err {
            CompileError::InternalFault { message, stack } => {
                assert!(message.contains("generator bug on api"), "{}", message);
                assert!(!stack.is_empty());
            }
            other => panic!("expected internal fault, got {:?}", other),
        }
    }

    #[test]
    fn test_panics_contained_in_parallel_runs() {
        let fs = fixture();
        fs.add_file("more.gql", "type More { x: Int }");
        let err = compiler(&fs)
            .run(
                &["sdlc", "-j", "2", "--panic_out=out", "api.gql", "more.gql"],
                &CancelContext::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalFault);
    }
}
