//! Filesystem abstraction used for reading inputs and writing outputs.
//!
//! [`OsFs`] talks to the real filesystem. [`MemFs`] keeps everything in
//! memory so whole compiler runs can be exercised without touching disk.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// The file operations the compiler needs.
pub trait FileSystem: Send + Sync {
    /// Reads a whole file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// True if `path` names an existing file.
    fn exists(&self, path: &Path) -> bool;

    /// Creates a directory and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Creates or truncates a file for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let file = std::fs::File::create(path)?;
        Ok(Box::new(io::BufWriter::new(file)))
    }
}

type FileMap = Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>;

/// An in-memory filesystem.
///
/// Directories are implicit; [`FileSystem::create_dir_all`] only counts calls
/// so tests can assert on how often output directories were created.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    files: FileMap,
    mkdirs: Arc<AtomicUsize>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        lock(&self.files).insert(path.into(), content.into());
    }

    /// Returns a copy of a file's content.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        lock(&self.files).get(path.as_ref()).cloned()
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        lock(&self.files).keys().cloned().collect()
    }

    /// Number of `create_dir_all` calls made so far.
    pub fn mkdir_calls(&self) -> usize {
        self.mkdirs.load(Ordering::SeqCst)
    }
}

fn lock(files: &FileMap) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
    // a poisoned map still holds consistent bytes; writers only insert whole buffers
    files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FileSystem for MemFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{}: no such file", path.display()))
        })
    }

    fn exists(&self, path: &Path) -> bool {
        lock(&self.files).contains_key(path)
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        self.mkdirs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        lock(&self.files).insert(path.to_path_buf(), Vec::new());
        Ok(Box::new(MemFile {
            path: path.to_path_buf(),
            buf: Vec::new(),
            files: Arc::clone(&self.files),
        }))
    }
}

/// A file being written to a [`MemFs`]. Content becomes visible on flush.
struct MemFile {
    path: PathBuf,
    buf: Vec<u8>,
    files: FileMap,
}

impl Write for MemFile {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.files).insert(self.path.clone(), self.buf.clone());
        Ok(())
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memfs_write_and_read() {
        let fs = MemFs::new();
        {
            let mut file = fs.create(Path::new("out/a.txt")).unwrap();
            file.write_all(b"hello").unwrap();
        }
        assert_eq!(fs.read(Path::new("out/a.txt")).unwrap(), b"hello");
        assert!(fs.exists(Path::new("out/a.txt")));
        assert!(!fs.exists(Path::new("out/b.txt")));
    }

    #[test]
    fn test_memfs_missing_file() {
        let fs = MemFs::new();
        let err = fs.read(Path::new("nope.gql")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_osfs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFs;
        let nested = dir.path().join("a/b");
        fs.create_dir_all(&nested).unwrap();
        {
            let mut file = fs.create(&nested.join("c.txt")).unwrap();
            file.write_all(b"data").unwrap();
            file.flush().unwrap();
        }
        assert!(fs.exists(&nested.join("c.txt")));
        assert_eq!(fs.read(&nested.join("c.txt")).unwrap(), b"data");
    }
}
