//! Scoped output file creation for generators.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sdlc_schema::validate_file_name;
use thiserror::Error;

use crate::vfs::FileSystem;

/// Errors from opening or writing an output file.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The name would escape the output directory or is malformed.
    #[error("invalid output path '{name}': {reason}")]
    InvalidPath { name: String, reason: String },

    /// The filesystem refused an operation.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The same name was opened twice through one context.
    #[error("output file '{name}' was already written in this run")]
    DuplicateOutput { name: String },
}

impl OutputError {
    fn io(path: &Path, source: io::Error) -> Self {
        OutputError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File-creation capability scoped to one generator's output directory.
///
/// The directory is created lazily, once, before the first file is opened.
/// A context may be shared between threads.
pub struct OutputContext {
    fs: Arc<dyn FileSystem>,
    out_dir: PathBuf,
    dir_created: Mutex<bool>,
    opened: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for OutputContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputContext")
            .field("out_dir", &self.out_dir)
            .finish_non_exhaustive()
    }
}

impl OutputContext {
    pub fn new(fs: Arc<dyn FileSystem>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            out_dir: out_dir.into(),
            dir_created: Mutex::new(false),
            opened: Mutex::new(HashSet::new()),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Opens `name`, relative to the output directory, for writing.
    pub fn open(&self, name: &str) -> Result<OutputFile, OutputError> {
        validate_file_name(name).map_err(|reason| OutputError::InvalidPath {
            name: name.to_string(),
            reason,
        })?;

        self.ensure_out_dir()?;

        let path = name
            .split('/')
            .fold(self.out_dir.clone(), |path, segment| path.join(segment));
        if name.contains('/') {
            if let Some(parent) = path.parent() {
                self.fs
                    .create_dir_all(parent)
                    .map_err(|e| OutputError::io(parent, e))?;
            }
        }

        {
            let mut opened = self.opened.lock().unwrap_or_else(|p| p.into_inner());
            if !opened.insert(name.to_string()) {
                return Err(OutputError::DuplicateOutput {
                    name: name.to_string(),
                });
            }
        }

        let writer = self.fs.create(&path).map_err(|e| OutputError::io(&path, e))?;
        Ok(OutputFile {
            path,
            writer: Some(writer),
        })
    }

    /// Writes a whole file in one step.
    pub fn write_file(&self, name: &str, content: &[u8]) -> Result<(), OutputError> {
        let mut file = self.open(name)?;
        file.write_all(content)
            .map_err(|e| OutputError::io(file.path(), e))?;
        file.close()
    }

    fn ensure_out_dir(&self) -> Result<(), OutputError> {
        let mut created = self.dir_created.lock().unwrap_or_else(|p| p.into_inner());
        if !*created {
            self.fs
                .create_dir_all(&self.out_dir)
                .map_err(|e| OutputError::io(&self.out_dir, e))?;
            *created = true;
        }
        Ok(())
    }
}

/// An open output file. Closed by [`OutputFile::close`] or on drop.
pub struct OutputFile {
    path: PathBuf,
    writer: Option<Box<dyn Write + Send>>,
}

impl OutputFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and closes the file, reporting any failure.
    pub fn close(mut self) -> Result<(), OutputError> {
        match self.writer.take() {
            Some(mut writer) => writer.flush().map_err(|e| OutputError::io(&self.path, e)),
            None => Ok(()),
        }
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "file is closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemFs;

    fn context(fs: &MemFs) -> OutputContext {
        OutputContext::new(Arc::new(fs.clone()), "out")
    }

    #[test]
    fn test_write_file() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        ctx.write_file("a.md", b"# A").unwrap();
        assert_eq!(fs.get("out/a.md").unwrap(), b"# A");
    }

    #[test]
    fn test_out_dir_created_once() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        assert_eq!(fs.mkdir_calls(), 0);
        ctx.write_file("a.md", b"a").unwrap();
        ctx.write_file("b.md", b"b").unwrap();
        assert_eq!(fs.mkdir_calls(), 1);
    }

    #[test]
    fn test_nested_names() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        ctx.write_file("pkg/types.rs", b"x").unwrap();
        assert_eq!(fs.get(Path::new("out").join("pkg").join("types.rs")).unwrap(), b"x");
    }

    #[test]
    fn test_rejects_escaping_names() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        for name in ["../evil.txt", "/etc/passwd", "a/../../b", "a\\b"] {
            let err = ctx.open(name).err().unwrap();
            assert!(matches!(err, OutputError::InvalidPath { .. }), "{}: {}", name, err);
        }
        assert!(fs.paths().is_empty());
        assert_eq!(fs.mkdir_calls(), 0);
    }

    #[test]
    fn test_duplicate_output() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        ctx.write_file("a.md", b"1").unwrap();
        let err = ctx.write_file("a.md", b"2").unwrap_err();
        assert!(matches!(err, OutputError::DuplicateOutput { .. }));
        assert_eq!(fs.get("out/a.md").unwrap(), b"1");
    }

    #[test]
    fn test_dropped_handle_is_flushed() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        {
            let mut file = ctx.open("partial.txt").unwrap();
            file.write_all(b"half").unwrap();
        }
        assert_eq!(fs.get("out/partial.txt").unwrap(), b"half");
    }

    #[test]
    fn test_real_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gen").join("docs");
        let ctx = OutputContext::new(Arc::new(crate::vfs::OsFs), &out);
        ctx.write_file("a.md", b"a").unwrap();
        assert_eq!(std::fs::read(out.join("a.md")).unwrap(), b"a");
    }
}
