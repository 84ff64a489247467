//! # Database
//!
//! Transactions over the bucket tree, optionally backed by a file.
//!
//! ## Transaction Model
//!
//! - `view`: shared read transaction; any number run concurrently and each
//!   sees a consistent snapshot for its whole duration.
//! - `update`: exclusive write transaction. Mutations are applied in place
//!   and logged. Unless the transaction commits, the log is replayed
//!   backwards and the pre-state is restored. This covers a failing
//!   closure, a failed journal write and a closure that panics.
//!
//! ## Files
//!
//! ```text
//! <path>      MAGIC (8 bytes) | FORMAT_VERSION (u32 BE) | checkpoint (u64 BE) | bincode(root)
//! <path>.wal  redo frames committed since that checkpoint (see `journal`)
//! ```
//!
//! A commit appends one redo frame to the journal. When the journal grows
//! past `checkpoint_bytes`, the full tree is written to `<path>.tmp`, synced
//! and renamed over `<path>` under the next checkpoint number, and the
//! journal starts over. Opening loads the snapshot and replays the journal.

use super::bucket::{Bucket, BucketMut, BucketRef, Undo};
use super::journal::Journal;
use crate::adapters::lock::DatabaseLock;
use crate::domain::errors::SubstrateError;
use parking_lot::{Mutex, RwLock};
use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 8] = b"FORESTDB";
const FORMAT_VERSION: u32 = 2;
const HEADER_LEN: usize = MAGIC.len() + 4 + 8;

/// Durability settings of a file-backed database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Fsync the journal on every commit, and the snapshot and its
    /// directory on every checkpoint (default: true).
    pub sync_writes: bool,

    /// Journal size in bytes that triggers a snapshot (default: 4 MiB).
    pub checkpoint_bytes: u64,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            sync_writes: true,
            checkpoint_bytes: 4 * 1024 * 1024,
        }
    }
}

impl FileOptions {
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    pub fn with_checkpoint_bytes(mut self, bytes: u64) -> Self {
        self.checkpoint_bytes = bytes;
        self
    }
}

/// Journal plus the checkpoint of the snapshot on disk.
struct FileState {
    journal: Journal,
    checkpoint: u64,
}

/// Files that back a database, plus the lock that keeps them ours.
struct Backing {
    path: PathBuf,
    options: FileOptions,
    state: Mutex<FileState>,
    _lock: DatabaseLock,
}

/// A tree of buckets with single-writer, multi-reader transactions.
pub struct Database {
    root: RwLock<Bucket>,
    backing: Option<Backing>,
}

/// Mutations of an open write transaction. Rolled back on drop unless
/// committed.
struct PendingWrite<'a> {
    root: &'a mut Bucket,
    undo: Vec<Undo>,
    committed: bool,
}

impl Drop for PendingWrite<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let undo = std::mem::take(&mut self.undo);
            self.root.rollback(undo);
        }
    }
}

impl Database {
    /// Purely in-memory database. Nothing survives a drop.
    pub fn in_memory() -> Self {
        Self {
            root: RwLock::new(Bucket::default()),
            backing: None,
        }
    }

    /// Open the database file at `path`, creating an empty database if the
    /// file does not exist yet. `lock` must guard `path`.
    pub fn open(
        path: impl AsRef<Path>,
        lock: DatabaseLock,
        options: FileOptions,
    ) -> Result<Self, SubstrateError> {
        let path = path.as_ref().to_path_buf();
        let (mut root, checkpoint) = match std::fs::read(&path) {
            Ok(bytes) => Self::decode_snapshot(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => (Bucket::default(), 0),
            Err(err) => return Err(err.into()),
        };

        let journal_path = journal_path(&path);
        let (journal, frames) = Journal::open(&journal_path, checkpoint, options.sync_writes)?;
        if options.sync_writes {
            sync_parent_dir(&journal_path)?;
        }
        let replayed = frames.len();
        for redo in frames {
            root.apply(redo);
        }

        #[cfg(feature = "tracing-log")]
        tracing::info!(
            checkpoint,
            replayed,
            "[orchard] 💾 Opened database file {} ({} top-level buckets)",
            path.display(),
            root.entries.len()
        );
        #[cfg(not(feature = "tracing-log"))]
        let _ = replayed;

        Ok(Self {
            root: RwLock::new(root),
            backing: Some(Backing {
                path,
                options,
                state: Mutex::new(FileState {
                    journal,
                    checkpoint,
                }),
                _lock: lock,
            }),
        })
    }

    /// Copy of the whole bucket tree.
    #[cfg(test)]
    pub(crate) fn tree(&self) -> Bucket {
        self.root.read().clone()
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.backing.as_ref().map(|b| b.path.as_path())
    }

    /// Run `f` inside a read transaction.
    pub fn view<T, E>(&self, f: impl FnOnce(&ReadTx<'_>) -> Result<T, E>) -> Result<T, E> {
        let root = self.root.read();
        let tx = ReadTx {
            root: BucketRef::new(&root),
        };
        f(&tx)
    }

    /// Run `f` inside a write transaction, committing only if it succeeds.
    pub fn update<T, E>(&self, f: impl FnOnce(&mut WriteTx<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<SubstrateError>,
    {
        let mut root = self.root.write();
        let mut pending = PendingWrite {
            root: &mut *root,
            undo: Vec::new(),
            committed: false,
        };

        let value = {
            let mut tx = WriteTx {
                root: BucketMut::root(&mut *pending.root, &mut pending.undo),
            };
            f(&mut tx)?
        };
        if !pending.undo.is_empty() {
            self.persist(&*pending.root, &pending.undo)?;
        }
        pending.committed = true;
        Ok(value)
    }

    /// Write one committed transaction to the journal, checkpointing when the
    /// journal has grown past its threshold.
    fn persist(&self, root: &Bucket, undo: &[Undo]) -> Result<(), SubstrateError> {
        let Some(backing) = &self.backing else {
            return Ok(());
        };
        let sync = backing.options.sync_writes;
        let mut state = backing.state.lock();

        // A checkpoint whose journal reset failed left frames the snapshot
        // already holds.
        if state.journal.checkpoint() != state.checkpoint {
            let checkpoint = state.checkpoint;
            state.journal.reset(checkpoint, sync)?;
        }
        state.journal.append(&root.redo_log(undo), sync)?;

        if state.journal.len() >= backing.options.checkpoint_bytes {
            // The commit is durable in the journal; a failed checkpoint is
            // retried on a later commit.
            if let Err(_err) = Self::checkpoint(backing, &mut state, root) {
                #[cfg(feature = "tracing-log")]
                tracing::warn!(error = %_err, "[orchard] ⚠️ Checkpoint failed");
            }
        }
        Ok(())
    }

    fn checkpoint(
        backing: &Backing,
        state: &mut FileState,
        root: &Bucket,
    ) -> Result<(), SubstrateError> {
        let sync = backing.options.sync_writes;
        let next = state.checkpoint + 1;
        let body = bincode::serialize(root).map_err(|e| SubstrateError::Corrupted(e.to_string()))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        bytes.extend_from_slice(&next.to_be_bytes());
        bytes.extend_from_slice(&body);

        // Write atomically via temp file
        let mut temp_name = OsString::from(backing.path.as_os_str());
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        if sync {
            file.sync_all()?;
        }
        std::fs::rename(&temp_path, &backing.path)?;
        if sync {
            sync_parent_dir(&backing.path)?;
        }
        state.checkpoint = next;
        state.journal.reset(next, sync)?;

        #[cfg(feature = "tracing-log")]
        tracing::debug!(
            checkpoint = next,
            bytes = bytes.len(),
            "[orchard] 📸 Wrote snapshot"
        );
        Ok(())
    }

    fn decode_snapshot(bytes: &[u8]) -> Result<(Bucket, u64), SubstrateError> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(SubstrateError::Corrupted("missing file header".into()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[MAGIC.len()..MAGIC.len() + 4]);
        let version = u32::from_be_bytes(version);
        if version != FORMAT_VERSION {
            return Err(SubstrateError::Corrupted(format!(
                "unsupported format version {version}"
            )));
        }
        let mut checkpoint = [0u8; 8];
        checkpoint.copy_from_slice(&bytes[MAGIC.len() + 4..HEADER_LEN]);
        let root = bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| SubstrateError::Corrupted(e.to_string()))?;
        Ok((root, u64::from_be_bytes(checkpoint)))
    }
}

/// `<path>.wal`
pub(crate) fn journal_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".wal");
    PathBuf::from(name)
}

/// Make a rename or file creation in the directory of `path` durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Read transaction.
pub struct ReadTx<'a> {
    root: BucketRef<'a>,
}

impl<'a> ReadTx<'a> {
    /// Top-level bucket `name`.
    pub fn bucket(&self, name: &[u8]) -> Result<BucketRef<'a>, SubstrateError> {
        self.root
            .bucket(name)
            .ok_or_else(|| SubstrateError::bucket_not_found(name))
    }
}

/// Write transaction.
pub struct WriteTx<'a> {
    root: BucketMut<'a>,
}

impl<'a> WriteTx<'a> {
    /// Top-level bucket `name`.
    pub fn bucket(&mut self, name: &[u8]) -> Result<BucketMut<'_>, SubstrateError> {
        self.root
            .bucket(name)
            .ok_or_else(|| SubstrateError::bucket_not_found(name))
    }

    pub fn create_bucket_if_not_exists(
        &mut self,
        name: &[u8],
    ) -> Result<BucketMut<'_>, SubstrateError> {
        self.root.create_bucket_if_not_exists(name)
    }

    pub fn delete_bucket(&mut self, name: &[u8]) -> Result<(), SubstrateError> {
        self.root.delete_bucket(name)
    }

    /// Read-only view of a top-level bucket within this transaction.
    pub fn view(&self, name: &[u8]) -> Result<BucketRef<'_>, SubstrateError> {
        self.root
            .view()
            .bucket(name)
            .ok_or_else(|| SubstrateError::bucket_not_found(name))
    }
}
