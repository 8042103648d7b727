//! Compile pipeline: validate, parse, check, generate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use sdlc_schema::{check_documents, has_source_extension, DocSet, Document, ParseError, SOURCE_EXTENSIONS};

use crate::backends::RegistryEntry;
use crate::cancel::CancelContext;
use crate::error::{CompileError, Diagnostics};
use crate::fault;
use crate::generator::GenContext;
use crate::logging::Logger;
use crate::output::OutputContext;
use crate::vfs::FileSystem;

/// Settings from the global command-line switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Directories searched, in order, for inputs not found as given.
    pub import_paths: Vec<PathBuf>,
    /// Worker threads for generation. 1 runs everything in order on the
    /// calling thread.
    pub jobs: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            import_paths: vec![PathBuf::from(".")],
            jobs: 1,
        }
    }
}

/// Drives one compiler run over a set of input files.
pub struct Pipeline {
    fs: Arc<dyn FileSystem>,
    config: CompilerConfig,
    logger: Logger,
}

impl Pipeline {
    pub fn new(fs: Arc<dyn FileSystem>, config: CompilerConfig, logger: Logger) -> Self {
        Self { fs, config, logger }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Runs every step. Stops at the first failure; files written before it
    /// are left in place.
    pub fn run(
        &self,
        cancel: &CancelContext,
        entries: &[RegistryEntry],
        inputs: &[String],
    ) -> Result<Vec<Document>, CompileError> {
        let docs = self.load(inputs)?;
        self.generate(cancel, entries, &docs)?;
        Ok(docs)
    }

    /// Validates, reads, parses and checks `inputs`.
    pub fn load(&self, inputs: &[String]) -> Result<Vec<Document>, CompileError> {
        if inputs.is_empty() {
            return Err(CompileError::InvalidInput("no input files".to_string()));
        }
        for input in inputs {
            if !has_source_extension(input) {
                return Err(CompileError::InvalidInput(format!(
                    "{}: unrecognised file extension, expected one of: .{}",
                    input,
                    SOURCE_EXTENSIONS.join(", .")
                )));
            }
        }

        self.logger.in_scope(|| -> Result<Vec<Document>, CompileError> {
            let mut doc_set = DocSet::new();
            let mut docs = Vec::with_capacity(inputs.len());
            for input in inputs {
                let path = self.resolve_input(input);
                tracing::debug!(input = %input, path = %path.display(), "parsing");
                let bytes = self.fs.read(&path).map_err(|source| CompileError::Io {
                    path: path.clone(),
                    source,
                })?;
                let source = String::from_utf8(bytes)
                    .map_err(|_| ParseError::file(input.as_str(), "source is not valid UTF-8"))?;
                docs.push(doc_set.parse(input, &source)?);
            }

            check_documents(&docs).map_err(|diags| {
                tracing::debug!(count = diags.len(), "type check failed");
                CompileError::TypeCheck(Diagnostics(diags))
            })?;
            Ok(docs)
        })
    }

    /// Finds an input as given, then below each import path in order.
    fn resolve_input(&self, input: &str) -> PathBuf {
        let given = Path::new(input);
        if given.is_absolute() || self.fs.exists(given) {
            return given.to_path_buf();
        }
        self.config
            .import_paths
            .iter()
            .map(|dir| dir.join(input))
            .find(|candidate| self.fs.exists(candidate))
            .unwrap_or_else(|| given.to_path_buf())
    }

    /// Invokes every activated entry against every document.
    ///
    /// Pairs are ordered by entry, then by document. With `jobs > 1` they run
    /// on a bounded pool and the first failure in that order is returned.
    pub fn generate(
        &self,
        cancel: &CancelContext,
        entries: &[RegistryEntry],
        docs: &[Document],
    ) -> Result<(), CompileError> {
        let active: Vec<(&RegistryEntry, OutputContext)> = entries
            .iter()
            .filter(|entry| entry.activated)
            .map(|entry| (entry, OutputContext::new(Arc::clone(&self.fs), &entry.out_dir)))
            .collect();

        if self.config.jobs > 1 {
            match ThreadPoolBuilder::new().num_threads(self.config.jobs).build() {
                Ok(pool) => {
                    let pairs: Vec<(usize, usize)> = (0..active.len())
                        .flat_map(|e| (0..docs.len()).map(move |d| (e, d)))
                        .collect();
                    let results: Vec<Result<(), CompileError>> = pool.install(|| {
                        pairs
                            .par_iter()
                            .map(|&(e, d)| {
                                let (entry, output) = &active[e];
                                // Panics do not carry their backtrace across threads.
                                fault::guard(|| self.invoke(cancel, entry, output, &docs[d]))
                            })
                            .collect()
                    });
                    return results.into_iter().collect();
                }
                Err(e) => {
                    self.logger.in_scope(|| {
                        tracing::warn!(error = %e, "worker pool unavailable, generating sequentially");
                    });
                }
            }
        }

        for (entry, output) in &active {
            for doc in docs {
                self.invoke(cancel, entry, output, doc)?;
            }
        }
        Ok(())
    }

    fn invoke(
        &self,
        cancel: &CancelContext,
        entry: &RegistryEntry,
        output: &OutputContext,
        doc: &Document,
    ) -> Result<(), CompileError> {
        if cancel.is_done() {
            return Err(CompileError::Cancelled);
        }
        self.logger.in_scope(|| {
            tracing::debug!(generator = %entry.name, document = %doc.name, out_dir = %entry.out_dir.display(), "generating");
        });

        let ctx = GenContext {
            output,
            cancel,
            logger: &self.logger,
        };
        entry.generator.generate(&ctx, doc, &entry.options)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::{ErrorKind, GenerateError, GeneratorError};
    use crate::generator::{Generator, GeneratorOptions};
    use crate::vfs::MemFs;

    type Calls = Arc<Mutex<Vec<(String, String)>>>;

    /// Records each invocation and writes `<doc>.txt`.
    #[derive(Debug)]
    struct Recorder {
        name: &'static str,
        calls: Calls,
        fail_on: Option<&'static str>,
    }

    impl Generator for Recorder {
        fn generate(
            &self,
            ctx: &GenContext<'_>,
            doc: &Document,
            _options: &GeneratorOptions,
        ) -> Result<(), GeneratorError> {
            self.calls
                .lock()
                .unwrap()
                .push((self.name.to_string(), doc.name.clone()));
            if self.fail_on == Some(doc.name.as_str()) {
                return Err(GenerateError::Reported("failed".to_string()).attribute(self.name, &doc.name));
            }
            ctx.output
                .write_file(&format!("{}.txt", doc.name), self.name.as_bytes())
                .map_err(|e| GenerateError::from(e).attribute(self.name, &doc.name))
        }
    }

    fn entry(name: &'static str, calls: &Calls, fail_on: Option<&'static str>) -> RegistryEntry {
        RegistryEntry {
            generator: Arc::new(Recorder {
                name,
                calls: Arc::clone(calls),
                fail_on,
            }),
            name: name.to_string(),
            out_dir: PathBuf::from(format!("out/{}", name)),
            options: GeneratorOptions::new(),
            activated: true,
        }
    }

    fn fixture() -> MemFs {
        let fs = MemFs::new();
        fs.add_file("a.gql", "type Query { a: B }");
        fs.add_file("b.graphql", "type B { name: String }");
        fs
    }

    fn pipeline(fs: &MemFs, jobs: usize) -> Pipeline {
        let config = CompilerConfig {
            jobs,
            ..CompilerConfig::default()
        };
        Pipeline::new(Arc::new(fs.clone()), config, Logger::disabled())
    }

    fn inputs(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_rejects_empty_and_unknown_inputs() {
        let p = pipeline(&fixture(), 1);

        let err = p.load(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = p.load(&inputs(&["a.gql", "notes.txt"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("notes.txt"), "{}", err);
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let err = pipeline(&fixture(), 1)
            .load(&inputs(&["missing.gql"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoError);
    }

    #[test]
    fn test_loads_in_input_order() {
        let docs = pipeline(&fixture(), 1)
            .load(&inputs(&["b.graphql", "a.gql"]))
            .unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_import_paths_are_searched() {
        let fs = MemFs::new();
        fs.add_file("schemas/api.gql", "type Query { ok: Boolean }");
        let config = CompilerConfig {
            import_paths: vec![PathBuf::from("."), PathBuf::from("schemas")],
            jobs: 1,
        };
        let p = Pipeline::new(Arc::new(fs), config, Logger::disabled());

        let docs = p.load(&inputs(&["api.gql"])).unwrap();
        assert_eq!(docs[0].name, "api");
        assert_eq!(docs[0].path, "api.gql");
    }

    #[test]
    fn test_parse_errors_stop_the_run() {
        let fs = fixture();
        fs.add_file("broken.gql", "type {");
        let err = pipeline(&fs, 1)
            .load(&inputs(&["a.gql", "broken.gql"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_duplicate_document_names() {
        let fs = fixture();
        fs.add_file("other/a.graphql", "type Other { x: Int }");
        let err = pipeline(&fs, 1)
            .load(&inputs(&["a.gql", "other/a.graphql"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_type_check_reports_every_diagnostic() {
        let fs = MemFs::new();
        fs.add_file("x.gql", "type Query { a: Missing }");
        fs.add_file("y.gql", "type Other { b: AlsoMissing }");

        let err = pipeline(&fs, 1)
            .load(&inputs(&["x.gql", "y.gql"]))
            .unwrap_err();
        match err {
            CompileError::TypeCheck(Diagnostics(diags)) => {
                assert_eq!(diags.len(), 2);
                assert_eq!(diags[0].document, "x");
                assert_eq!(diags[1].document, "y");
            }
            other => panic!("expected type check error, got {:?}", other),
        }
    }

    #[test]
    fn test_generation_order_skips_inactive() {
        let fs = fixture();
        let calls = Calls::default();
        let mut idle = entry("idle", &calls, None);
        idle.activated = false;
        let entries = vec![entry("one", &calls, None), idle, entry("two", &calls, None)];

        pipeline(&fs, 1)
            .run(&CancelContext::new(), &entries, &inputs(&["a.gql", "b.graphql"]))
            .unwrap();

        let calls = calls.lock().unwrap().clone();
        let expected: Vec<(String, String)> = [("one", "a"), ("one", "b"), ("two", "a"), ("two", "b")]
            .iter()
            .map(|(g, d)| (g.to_string(), d.to_string()))
            .collect();
        assert_eq!(calls, expected);
        assert_eq!(fs.get("out/two/b.txt"), Some(b"two".to_vec()));
        assert!(fs.get("out/idle/a.txt").is_none());
    }

    #[test]
    fn test_first_failure_stops_sequential_run() {
        let fs = fixture();
        let calls = Calls::default();
        let entries = vec![entry("one", &calls, Some("a")), entry("two", &calls, None)];

        let err = pipeline(&fs, 1)
            .run(&CancelContext::new(), &entries, &inputs(&["a.gql", "b.graphql"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeneratorReported);
        assert_eq!(err.to_string(), "one: a: failed");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_parallel_generation() {
        let fs = fixture();
        let calls = Calls::default();
        let entries = vec![entry("one", &calls, None), entry("two", &calls, None)];

        pipeline(&fs, 4)
            .run(&CancelContext::new(), &entries, &inputs(&["a.gql", "b.graphql"]))
            .unwrap();

        let mut calls = calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls.len(), 4);
        for (generator, doc) in &calls {
            let path = format!("out/{}/{}.txt", generator, doc);
            assert_eq!(fs.get(&path), Some(generator.as_bytes().to_vec()), "{}", path);
        }
    }

    #[test]
    fn test_parallel_reports_first_failure_in_order() {
        let fs = fixture();
        let calls = Calls::default();
        let entries = vec![entry("one", &calls, Some("b")), entry("two", &calls, Some("a"))];

        let err = pipeline(&fs, 4)
            .run(&CancelContext::new(), &entries, &inputs(&["a.gql", "b.graphql"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "one: b: failed");
    }

    #[test]
    fn test_cancelled_before_generation() {
        let fs = fixture();
        let calls = Calls::default();
        let cancel = CancelContext::new();
        cancel.cancel();

        let err = pipeline(&fs, 1)
            .run(&cancel, &[entry("one", &calls, None)], &inputs(&["a.gql", "b.graphql"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_output_directory_created_once() {
        let fs = fixture();
        let calls = Calls::default();

        pipeline(&fs, 1)
            .run(&CancelContext::new(), &[entry("one", &calls, None)], &inputs(&["a.gql", "b.graphql"]))
            .unwrap();
        assert_eq!(fs.mkdir_calls(), 1);
    }
}
