//! Subprocess-based generator plugins.
//!
//! A plugin is an executable named `<prefix><name>` found on the search path.
//! Each invocation spawns a fresh process, writes one request frame to its
//! stdin, reads one response frame from its stdout and waits for it to exit.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sdlc_schema::{decode_response, encode_request, validate_file_name, Document, Request};

use crate::cancel::CancelContext;
use crate::error::{GenerateError, GeneratorError};
use crate::generator::{GenContext, Generator, GeneratorOptions};
use crate::output::OutputError;

/// Default per-invocation plugin timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Configuration shared by plugin generators.
#[derive(Debug, Clone)]
pub struct SubprocessConfig {
    /// Maximum duration of one plugin run. `None` disables the limit.
    pub timeout: Option<Duration>,
    /// Directories to search instead of `PATH`, in `PATH` syntax.
    pub search_path: Option<OsString>,
    /// Working directory for the plugin process.
    pub working_dir: Option<PathBuf>,
}

impl Default for SubprocessConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            search_path: None,
            working_dir: None,
        }
    }
}

/// A generator backed by an external executable.
///
/// The executable is located on first use and the outcome, success or
/// failure, is reused by every later call. Calls never share a process, so
/// one instance may serve concurrent invocations.
#[derive(Debug)]
pub struct PluginGenerator {
    prefix: String,
    name: String,
    config: SubprocessConfig,
    resolved: OnceLock<Result<PathBuf, String>>,
}

impl PluginGenerator {
    /// Creates a plugin generator with default configuration.
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_config(prefix, name, SubprocessConfig::default())
    }

    pub fn with_config(
        prefix: impl Into<String>,
        name: impl Into<String>,
        config: SubprocessConfig,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
            config,
            resolved: OnceLock::new(),
        }
    }

    /// Registered generator name, without the prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executable name: prefix followed by name.
    pub fn executable_name(&self) -> String {
        format!("{}{}", self.prefix, self.name)
    }

    pub fn config(&self) -> &SubprocessConfig {
        &self.config
    }

    /// Returns the executable path, locating it on first call.
    pub fn resolve(&self) -> Result<&Path, GenerateError> {
        match self.resolved.get_or_init(|| self.locate()) {
            Ok(path) => Ok(path),
            Err(reason) => Err(GenerateError::PluginNotFound {
                reason: reason.clone(),
            }),
        }
    }

    fn locate(&self) -> Result<PathBuf, String> {
        let exe = self.executable_name();
        let found = match &self.config.search_path {
            Some(paths) => {
                let cwd = match &self.config.working_dir {
                    Some(dir) => dir.clone(),
                    None => std::env::current_dir().map_err(|e| format!("{}: {}", exe, e))?,
                };
                which::which_in(&exe, Some(paths), cwd)
            }
            None => which::which(&exe),
        };
        found.map_err(|e| format!("{}: {}", exe, e))
    }

    fn run(
        &self,
        ctx: &GenContext<'_>,
        doc: &Document,
        options: &GeneratorOptions,
    ) -> Result<(), GenerateError> {
        let exe = self.resolve()?.to_path_buf();

        let parameter = serde_json::to_string(options)
            .map_err(|e| GenerateError::InvalidOptions(e.to_string()))?;
        let request = Request {
            files_to_generate: vec![doc.name.clone()],
            parameter,
            documents: vec![doc.clone()],
        };
        let input = encode_request(&request)
            .map_err(|e| GenerateError::PluginProtocol(format!("failed to encode request: {}", e)))?;

        let cancel = match self.config.timeout {
            Some(timeout) => ctx.cancel.with_timeout(timeout),
            None => ctx.cancel.clone(),
        };
        if cancel.is_done() {
            return Err(GenerateError::Cancelled);
        }

        let mut cmd = Command::new(&exe);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        if let Some(ref cwd) = self.config.working_dir {
            cmd.current_dir(cwd);
        }

        tracing::debug!(plugin = %exe.display(), document = %doc.name, "spawning plugin");
        let child = cmd.spawn().map_err(|e| {
            let message = format!("failed to start '{}': {}", exe.display(), e);
            match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    GenerateError::PluginNotFound { reason: message }
                }
                _ => GenerateError::PluginProtocol(message),
            }
        })?;
        let mut guard = ChildGuard(child);

        let writer = spawn_writer(guard.0.stdin.take(), input);
        let stdout = spawn_reader(guard.0.stdout.take());
        let stderr = spawn_reader(guard.0.stderr.take());

        let status = wait_with_cancel(&mut guard.0, &cancel)?;
        // A grandchild may still hold the pipes open after the plugin exits.
        wait_until(
            || stdout.is_finished() && stderr.is_finished() && writer.is_finished(),
            &cancel,
        )?;

        let stdout = join_reader(stdout, "stdout")?;
        let stderr = join_reader(stderr, "stderr")?;
        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(GenerateError::PluginProtocol(format!(
                    "failed to write request: {}",
                    e
                )));
            }
            Err(_) => {
                return Err(GenerateError::PluginProtocol(
                    "request writer thread panicked".to_string(),
                ));
            }
        }

        if !status.success() {
            let code = status
                .code()
                .map(|c| format!("exit code {}", c))
                .unwrap_or_else(|| "a signal".to_string());
            let mut message = format!("plugin exited with {}", code);
            if !stderr.is_empty() {
                message.push_str(": ");
                message.push_str(&stderr);
            }
            return Err(GenerateError::PluginProtocol(message));
        }
        if !stderr.is_empty() {
            tracing::debug!(plugin = %exe.display(), stderr = %stderr, "plugin wrote to stderr");
        }

        let response = decode_response(&stdout)
            .map_err(|e| GenerateError::PluginProtocol(format!("malformed response: {}", e)))?;
        if !response.error.is_empty() {
            return Err(GenerateError::Reported(response.error));
        }

        // Nothing is written unless every name is safe.
        for file in &response.files {
            validate_file_name(&file.name).map_err(|reason| OutputError::InvalidPath {
                name: file.name.clone(),
                reason,
            })?;
        }
        for file in &response.files {
            ctx.output.write_file(&file.name, &file.content)?;
        }

        tracing::debug!(
            plugin = %exe.display(),
            files = response.files.len(),
            "plugin finished"
        );
        Ok(())
    }
}

impl Generator for PluginGenerator {
    fn generate(
        &self,
        ctx: &GenContext<'_>,
        doc: &Document,
        options: &GeneratorOptions,
    ) -> Result<(), GeneratorError> {
        ctx.logger
            .in_scope(|| self.run(ctx, doc, options))
            .map_err(|e| e.attribute(&self.executable_name(), &doc.name))
    }
}

/// Kills and reaps the child on every exit path.
struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.0.try_wait() {
            let _ = self.0.kill();
        }
        let _ = self.0.wait();
    }
}

/// Polls the child until it exits or `cancel` is done.
fn wait_with_cancel(child: &mut Child, cancel: &CancelContext) -> Result<ExitStatus, GenerateError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if cancel.is_done() {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GenerateError::Cancelled);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(GenerateError::PluginProtocol(format!(
                    "failed to wait for plugin: {}",
                    e
                )));
            }
        }
    }
}

/// Polls `done` until it holds or `cancel` is done. Pipe threads still
/// blocked on cancellation are left detached.
fn wait_until(done: impl Fn() -> bool, cancel: &CancelContext) -> Result<(), GenerateError> {
    while !done() {
        if cancel.is_done() {
            return Err(GenerateError::Cancelled);
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}

fn spawn_writer(
    stdin: Option<ChildStdin>,
    input: Vec<u8>,
) -> JoinHandle<io::Result<()>> {
    thread::spawn(move || {
        let Some(mut stdin) = stdin else {
            return Ok(());
        };
        // A plugin may exit without reading its whole request.
        match stdin.write_all(&input).and_then(|()| stdin.flush()) {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    })
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_reader(
    handle: JoinHandle<io::Result<Vec<u8>>>,
    stream: &str,
) -> Result<Vec<u8>, GenerateError> {
    match handle.join() {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(GenerateError::PluginProtocol(format!(
            "failed to read plugin {}: {}",
            stream, e
        ))),
        Err(_) => Err(GenerateError::PluginProtocol(format!(
            "plugin {} reader panicked",
            stream
        ))),
    }
}
