//! # Write-Ahead Journal
//!
//! Committed transactions are appended to `<path>.wal` as redo frames, so a
//! commit writes what it changed rather than the whole tree. Once the
//! journal outgrows the checkpoint threshold the database writes a full
//! snapshot and the journal starts over.
//!
//! ## Layout
//!
//! ```text
//! header: MAGIC (8 bytes) | FORMAT_VERSION (u32 BE) | checkpoint (u64 BE)
//! frame:  body length (u32 BE) | crc32(body) (u32 BE) | bincode(Vec<Redo>)
//! ```
//!
//! The header names the snapshot checkpoint the frames continue from. A
//! journal written against an older checkpoint is already contained in the
//! snapshot and is discarded on open. Replay stops at the first torn or
//! corrupt frame, and the tail from there on is cut off.

use super::bucket::Redo;
use crate::domain::errors::SubstrateError;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

const MAGIC: &[u8; 8] = b"FORESTWL";
const FORMAT_VERSION: u32 = 1;
pub(crate) const HEADER_LEN: u64 = 8 + 4 + 8;
const FRAME_HEADER_LEN: usize = 8;

/// Append-only redo log next to a database file.
pub(crate) struct Journal {
    file: File,
    len: u64,
    checkpoint: u64,
}

impl Journal {
    /// Open the journal at `path` and return the frames committed after
    /// snapshot `checkpoint`.
    ///
    /// A missing, empty or stale journal is started over.
    pub(crate) fn open(
        path: &Path,
        checkpoint: u64,
        sync: bool,
    ) -> Result<(Self, Vec<Vec<Redo>>), SubstrateError> {
        let existing = match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let mut journal = Self {
            file,
            len: 0,
            checkpoint,
        };

        let Some(bytes) = existing.filter(|b| b.len() as u64 >= HEADER_LEN) else {
            journal.reset(checkpoint, sync)?;
            return Ok((journal, Vec::new()));
        };
        let written_at = decode_header(&bytes)?;
        if written_at != checkpoint {
            #[cfg(feature = "tracing-log")]
            tracing::info!(
                journal = written_at,
                snapshot = checkpoint,
                "[orchard] Discarding journal already covered by snapshot"
            );
            journal.reset(checkpoint, sync)?;
            return Ok((journal, Vec::new()));
        }

        let (frames, valid) = decode_frames(&bytes);
        if valid < bytes.len() {
            #[cfg(feature = "tracing-log")]
            tracing::warn!(
                kept = valid,
                dropped = bytes.len() - valid,
                "[orchard] ⚠️ Cutting off torn journal tail"
            );
            journal.file.set_len(valid as u64)?;
            if sync {
                journal.file.sync_data()?;
            }
        }
        journal.len = valid as u64;
        journal.file.seek(SeekFrom::Start(journal.len))?;
        Ok((journal, frames))
    }

    /// Snapshot checkpoint the frames continue from.
    pub(crate) fn checkpoint(&self) -> u64 {
        self.checkpoint
    }

    /// Bytes on disk, header included.
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// Drop every frame and continue from snapshot `checkpoint`.
    pub(crate) fn reset(&mut self, checkpoint: u64, sync: bool) -> Result<(), SubstrateError> {
        let mut header = Vec::with_capacity(HEADER_LEN as usize);
        header.extend_from_slice(MAGIC);
        header.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        header.extend_from_slice(&checkpoint.to_be_bytes());

        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header)?;
        if sync {
            self.file.sync_data()?;
        }
        self.len = HEADER_LEN;
        self.checkpoint = checkpoint;
        Ok(())
    }

    /// Append one committed transaction.
    ///
    /// On failure the file is cut back to its previous length so a partial
    /// frame never precedes later ones.
    pub(crate) fn append(&mut self, redo: &[Redo], sync: bool) -> Result<(), SubstrateError> {
        let body = bincode::serialize(redo).map_err(|e| SubstrateError::Corrupted(e.to_string()))?;
        let body_len = u32::try_from(body.len())
            .map_err(|_| SubstrateError::Corrupted("transaction too large".into()))?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
        frame.extend_from_slice(&body_len.to_be_bytes());
        frame.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
        frame.extend_from_slice(&body);

        let written = self.file.write_all(&frame).and_then(|()| {
            if sync {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });
        if let Err(err) = written {
            let _ = self.file.set_len(self.len);
            let _ = self.file.seek(SeekFrom::Start(self.len));
            return Err(err.into());
        }
        self.len += frame.len() as u64;
        Ok(())
    }
}

fn decode_header(bytes: &[u8]) -> Result<u64, SubstrateError> {
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(SubstrateError::Corrupted("missing journal header".into()));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[8..12]);
    let version = u32::from_be_bytes(version);
    if version != FORMAT_VERSION {
        return Err(SubstrateError::Corrupted(format!(
            "unsupported journal version {version}"
        )));
    }
    let mut checkpoint = [0u8; 8];
    checkpoint.copy_from_slice(&bytes[12..20]);
    Ok(u64::from_be_bytes(checkpoint))
}

/// Every intact frame after the header, and the offset just past the last.
fn decode_frames(bytes: &[u8]) -> (Vec<Vec<Redo>>, usize) {
    let mut frames = Vec::new();
    let mut offset = HEADER_LEN as usize;
    while let Some(header) = bytes.get(offset..offset + FRAME_HEADER_LEN) {
        let mut len = [0u8; 4];
        len.copy_from_slice(&header[..4]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&header[4..]);

        let start = offset + FRAME_HEADER_LEN;
        let Some(body) = bytes.get(start..start + u32::from_be_bytes(len) as usize) else {
            break;
        };
        if crc32fast::hash(body) != u32::from_be_bytes(crc) {
            break;
        }
        let Ok(redo) = bincode::deserialize::<Vec<Redo>>(body) else {
            break;
        };
        frames.push(redo);
        offset = start + body.len();
    }
    (frames, offset)
}
