//! Directory backends for migration files.
//!
//! All backends satisfy the [`Dir`] contract: open a single entry, write an
//! entry, enumerate `.sql` files by ascending name, and compute the integrity
//! manifest over that enumeration. Backends that can tag files as checkpoints
//! additionally implement [`CheckpointDir`]; callers probe for the capability
//! through [`Dir::as_checkpoint`] rather than downcasting.
//!
//! Operations on a single directory are not internally synchronized; callers
//! serialize mutations. The one piece of process-wide state is the named
//! in-memory registry behind [`open_mem_dir`], guarded by a single mutex held
//! only for open/close bookkeeping.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;

use crate::checksum::{write_sum_file, HashFile};
use crate::directive::DIRECTIVE_CHECKPOINT;
use crate::error::{MigrateError, MigrateResult};
use crate::file::MigrationFile;

/// Write-through callback invoked for every [`MemDir`] write.
pub type SyncSink = Box<dyn Fn(&str, &[u8]) -> MigrateResult<()> + Send + Sync>;

/// Contract over a migration directory.
pub trait Dir {
    /// Open a raw reader over the named entry.
    ///
    /// Fails with [`MigrateError::NotFound`] when the entry does not exist.
    fn open(&self, name: &str) -> MigrateResult<Box<dyn Read>>;

    /// Create the named entry, replacing it if it exists.
    fn write_file(&self, name: &str, data: &[u8]) -> MigrateResult<()>;

    /// Every `.sql` entry, ordered by ascending name (byte-lexicographic).
    fn files(&self) -> MigrateResult<Vec<MigrationFile>>;

    /// The integrity manifest over `files()`.
    fn checksum(&self) -> MigrateResult<HashFile> {
        Ok(HashFile::from_files(&self.files()?))
    }

    /// Checkpoint capability probe. Backends that support checkpoints return
    /// themselves; everything else returns `None`.
    fn as_checkpoint(&self) -> Option<&dyn CheckpointDir> {
        None
    }
}

/// A migration directory that supports checkpoint files.
pub trait CheckpointDir: Dir {
    /// Like [`Dir::write_file`], but tags the content as a checkpoint first.
    fn write_checkpoint(&self, name: &str, tag: &str, data: &[u8]) -> MigrateResult<()> {
        let mut f = MigrationFile::new(name, data);
        if tag.is_empty() {
            f.add_directive(DIRECTIVE_CHECKPOINT, &[]);
        } else {
            f.add_directive(DIRECTIVE_CHECKPOINT, &[tag]);
        }
        self.write_file(name, f.bytes())
    }

    /// Checkpoint files stored in this directory, ordered by name.
    fn checkpoint_files(&self) -> MigrateResult<Vec<MigrationFile>> {
        crate::checkpoint::checkpoint_files(self)
    }

    /// The files to execute from the named checkpoint file, including it.
    ///
    /// Fails with [`MigrateError::CheckpointNotFound`] when the checkpoint is
    /// not in the directory.
    fn files_from_checkpoint(&self, name: &str) -> MigrateResult<Vec<MigrationFile>> {
        crate::checkpoint::files_from_checkpoint(self, name)
    }
}

/// Filesystem-backed migration directory.
#[derive(Debug, Clone)]
pub struct LocalDir {
    path: PathBuf,
}

impl LocalDir {
    /// Open an existing local migration directory.
    pub fn new(path: impl Into<PathBuf>) -> MigrateResult<Self> {
        let path = path.into();
        let meta = std::fs::metadata(&path)?;
        if !meta.is_dir() {
            return Err(MigrateError::NotDirectory(path));
        }
        Ok(Self { path })
    }

    /// The local path used for opening this dir.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Dir for LocalDir {
    fn open(&self, name: &str) -> MigrateResult<Box<dyn Read>> {
        match std::fs::File::open(self.path.join(name)) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MigrateError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_file(&self, name: &str, data: &[u8]) -> MigrateResult<()> {
        // 0644 under the default umask; a reader sees old or new bytes, never
        // an interleaving, at the single-write granularity promised here.
        std::fs::write(self.path.join(name), data)?;
        Ok(())
    }

    fn files(&self) -> MigrateResult<Vec<MigrationFile>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".sql") {
                names.push(name);
            }
        }
        names.sort();
        let mut files = Vec::with_capacity(names.len());
        for name in names {
            let data = std::fs::read(self.path.join(&name))?;
            files.push(MigrationFile::new(name, data));
        }
        Ok(files)
    }

    fn as_checkpoint(&self) -> Option<&dyn CheckpointDir> {
        Some(self)
    }
}

impl CheckpointDir for LocalDir {}

/// In-memory migration directory.
///
/// `MemDir` is a cheap handle: clones share the same underlying state, which
/// is how the named registry hands the same directory to every opener.
#[derive(Clone, Default)]
pub struct MemDir {
    inner: Arc<Mutex<MemInner>>,
}

#[derive(Default)]
struct MemInner {
    files: BTreeMap<String, MigrationFile>,
    sync_to: Vec<SyncSink>,
    path: String,
}

impl MemDir {
    /// Create an empty, unregistered in-memory directory.
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned guard still holds coherent state; recover it.
    fn locked(&self) -> MutexGuard<'_, MemInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the directory to its initial state, dropping files and sinks.
    pub fn reset(&self) {
        let mut inner = self.locked();
        inner.files.clear();
        inner.sync_to.clear();
    }

    /// Register a write-through sink invoked for every subsequent write.
    ///
    /// Sinks run synchronously, in registration order; the first failure
    /// fails the write. Sinks already invoked retain their effects.
    pub fn sync_writes(
        &self,
        sink: impl Fn(&str, &[u8]) -> MigrateResult<()> + Send + Sync + 'static,
    ) {
        self.locked().sync_to.push(Box::new(sink));
    }

    /// Copy the files into the directory, then recompute and write the sum
    /// file to cover the directory's contents.
    ///
    /// On failure, every file written before the failing write is persisted
    /// and the sum file is left untouched.
    pub fn copy_files(&self, files: &[MigrationFile]) -> MigrateResult<()> {
        for f in files {
            self.write_file(f.name(), f.bytes())?;
        }
        log::debug!("copied {} files into mem dir, rewriting sum file", files.len());
        let sum = self.checksum()?;
        write_sum_file(self, &sum)
    }

    /// Associate a display path with the directory. The label has no semantic
    /// effect; it only surfaces through [`MemDir::path`].
    pub fn set_path(&self, path: impl Into<String>) {
        self.locked().path = path.into();
    }

    /// The display path set by [`MemDir::set_path`].
    pub fn path(&self) -> String {
        self.locked().path.clone()
    }

    /// Release this directory's registration in the process namespace.
    ///
    /// The registry entry is removed when the last handle is closed. Closing
    /// an unregistered directory is a no-op. A directory registered under two
    /// distinct names refuses to close.
    pub fn close(&self) -> MigrateResult<()> {
        let mut dirs = MEM_DIRS.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = dirs
            .iter()
            .filter(|(_, m)| Arc::ptr_eq(&m.dir.inner, &self.inner))
            .map(|(name, _)| name.clone())
            .collect();
        if names.len() > 1 {
            names.sort();
            return Err(MigrateError::InvalidState(format!(
                "dir was opened with different names: {:?} and {:?}",
                names[0], names[1]
            )));
        }
        if let Some(name) = names.pop() {
            if let Some(m) = dirs.get_mut(&name) {
                m.num_use -= 1;
                if m.num_use == 0 {
                    dirs.remove(&name);
                    log::debug!("released mem dir {name:?}");
                }
            }
        }
        Ok(())
    }
}

impl Dir for MemDir {
    fn open(&self, name: &str) -> MigrateResult<Box<dyn Read>> {
        let inner = self.locked();
        let f = inner
            .files
            .get(name)
            .ok_or_else(|| MigrateError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(f.bytes().to_vec())))
    }

    fn write_file(&self, name: &str, data: &[u8]) -> MigrateResult<()> {
        let mut inner = self.locked();
        inner.files.insert(name.to_string(), MigrationFile::new(name, data));
        for sink in &inner.sync_to {
            sink(name, data)?;
        }
        Ok(())
    }

    fn files(&self) -> MigrateResult<Vec<MigrationFile>> {
        let inner = self.locked();
        Ok(inner
            .files
            .values()
            .filter(|f| f.name().ends_with(".sql"))
            .cloned()
            .collect())
    }

    fn as_checkpoint(&self) -> Option<&dyn CheckpointDir> {
        Some(self)
    }
}

impl CheckpointDir for MemDir {}

struct OpenedMem {
    dir: MemDir,
    num_use: usize,
}

// Process-wide registry of named in-memory directories.
static MEM_DIRS: Lazy<Mutex<HashMap<String, OpenedMem>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Open an in-memory directory registered under `name` in the process
/// namespace. Opening the same name again returns a handle to the same
/// directory; the directory is deleted when the last handle is
/// [closed](MemDir::close).
pub fn open_mem_dir(name: &str) -> MemDir {
    let mut dirs = MEM_DIRS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(m) = dirs.get_mut(name) {
        m.num_use += 1;
        log::debug!("reopened mem dir {name:?} ({} handles)", m.num_use);
        return m.dir.clone();
    }
    log::debug!("registered mem dir {name:?}");
    let dir = MemDir::new();
    dirs.insert(name.to_string(), OpenedMem { dir: dir.clone(), num_use: 1 });
    dir
}
