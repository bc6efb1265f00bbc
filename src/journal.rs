//! Write-ahead journal of ingestion batches.
//!
//! The in-memory store loses everything on shutdown. When journaling is
//! enabled every accepted batch is appended here before it becomes visible,
//! and opening the journal replays the batches in their original order so
//! ordinals come back identical.
//!
//! # File format
//!
//! `batches.wal` is line oriented:
//! - line 1: JSON header `{"magic":"RTVJ","version":1,"dimension":N}`
//! - every other line: `<sha256 hex>\t<json batch>`, the hash covering the JSON bytes
//!
//! A damaged final line is treated as a torn write and cut off. Damage
//! followed by intact lines means the file was altered and is refused.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::Document;
use crate::vector::VectorDimension;

/// Magic value identifying journal files.
const MAGIC: &str = "RTVJ";

/// Current journal format version.
const JOURNAL_VERSION: u32 = 1;

/// Errors specific to journal operations.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Journal I/O error on '{path}': {source}\nSuggestion: Check disk space and file permissions")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "Journal is corrupted at line {line}: {reason}\nSuggestion: Restore the journal from backup or move it aside to start empty"
    )]
    Corrupted { line: usize, reason: String },

    #[error(
        "Journal was written for dimension {journal} but the store is configured for {configured}\nSuggestion: Use the original dimension or point journal.path at a new directory"
    )]
    DimensionConflict { journal: usize, configured: usize },

    #[error("Failed to serialize journal batch: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl JournalError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JournalHeader {
    magic: String,
    version: u32,
    dimension: usize,
}

/// One ingestion batch as read back from the journal.
#[derive(Debug, Clone, Deserialize)]
pub struct JournalBatch {
    pub recorded_at: DateTime<Utc>,
    pub documents: Vec<Document>,
}

#[derive(Serialize)]
struct JournalBatchRef<'a> {
    recorded_at: DateTime<Utc>,
    documents: &'a [Document],
}

/// Batches recovered while opening a journal.
#[derive(Debug, Default)]
pub struct Replay {
    /// Recovered batches with the journal line each came from.
    pub batches: Vec<(usize, JournalBatch)>,
    /// Bytes cut from a torn final line, zero for a clean journal.
    pub truncated_bytes: u64,
}

/// Append handle on a journal file.
#[derive(Debug)]
pub struct BatchJournal {
    path: PathBuf,
    file: File,
    /// Length of the valid prefix; appends that fail are rolled back to it.
    len: u64,
    sync: bool,
    /// Next append writes only this many bytes and then fails.
    #[cfg(test)]
    fail_after: Option<usize>,
}

impl BatchJournal {
    /// Name of the journal file inside the journal directory.
    pub const FILE_NAME: &'static str = "batches.wal";

    /// Opens (or creates) the journal in `dir` and recovers its batches.
    ///
    /// # Arguments
    /// * `dir` - Journal directory, created if missing
    /// * `dimension` - Dimension the store is configured for
    /// * `sync` - Whether every append is flushed to disk before returning
    pub fn open(
        dir: &Path,
        dimension: VectorDimension,
        sync: bool,
    ) -> Result<(Self, Replay), JournalError> {
        fs::create_dir_all(dir).map_err(|e| JournalError::io(dir, e))?;
        let path = dir.join(Self::FILE_NAME);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(JournalError::io(&path, e)),
        };

        if bytes.is_empty() {
            let journal = Self::create(path, dimension, sync)?;
            return Ok((journal, Replay::default()));
        }

        let (replay, valid_len) = Self::recover(&bytes, dimension)?;

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| JournalError::io(&path, e))?;

        if replay.truncated_bytes > 0 {
            warn!(
                path = %path.display(),
                truncated_bytes = replay.truncated_bytes,
                "Journal ended with a torn write; truncating"
            );
            file.set_len(valid_len)
                .map_err(|e| JournalError::io(&path, e))?;
        }

        debug!(
            path = %path.display(),
            batches = replay.batches.len(),
            "Journal opened"
        );

        Ok((
            Self {
                path,
                file,
                len: valid_len,
                sync,
                #[cfg(test)]
                fail_after: None,
            },
            replay,
        ))
    }

    fn create(path: PathBuf, dimension: VectorDimension, sync: bool) -> Result<Self, JournalError> {
        let header = JournalHeader {
            magic: MAGIC.to_string(),
            version: JOURNAL_VERSION,
            dimension: dimension.get(),
        };
        let mut line = serde_json::to_vec(&header)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&path)
            .map_err(|e| JournalError::io(&path, e))?;
        file.write_all(&line)
            .and_then(|()| file.sync_all())
            .map_err(|e| JournalError::io(&path, e))?;

        debug!(path = %path.display(), dimension = dimension.get(), "Created new journal");

        Ok(Self {
            path,
            file,
            len: line.len() as u64,
            sync,
            #[cfg(test)]
            fail_after: None,
        })
    }

    /// Parses the whole journal, returning the batches and the length of the valid prefix.
    fn recover(bytes: &[u8], dimension: VectorDimension) -> Result<(Replay, u64), JournalError> {
        let Some(header_len) = bytes.iter().position(|&b| b == b'\n') else {
            return Err(JournalError::Corrupted {
                line: 1,
                reason: "header line is incomplete".to_string(),
            });
        };
        let header: JournalHeader = serde_json::from_slice(&bytes[..header_len]).map_err(|e| {
            JournalError::Corrupted {
                line: 1,
                reason: format!("unreadable header: {e}"),
            }
        })?;
        if header.magic != MAGIC {
            return Err(JournalError::Corrupted {
                line: 1,
                reason: format!("unexpected magic '{}'", header.magic),
            });
        }
        if header.version > JOURNAL_VERSION {
            return Err(JournalError::Corrupted {
                line: 1,
                reason: format!(
                    "journal version {} is newer than supported version {JOURNAL_VERSION}",
                    header.version
                ),
            });
        }
        if header.dimension != dimension.get() {
            return Err(JournalError::DimensionConflict {
                journal: header.dimension,
                configured: dimension.get(),
            });
        }

        let mut replay = Replay::default();
        let mut offset = header_len + 1;
        let mut line_no = 1;

        while offset < bytes.len() {
            line_no += 1;
            let rest = &bytes[offset..];

            // Records are written with their newline in one call; no newline means torn
            let Some(line_len) = rest.iter().position(|&b| b == b'\n') else {
                break;
            };
            let next = offset + line_len + 1;

            match decode_record(&rest[..line_len]) {
                Ok(batch) => {
                    replay.batches.push((line_no, batch));
                    offset = next;
                }
                // Damage is only tolerated on the final line
                Err(_) if next >= bytes.len() => break,
                Err(reason) => {
                    return Err(JournalError::Corrupted {
                        line: line_no,
                        reason,
                    });
                }
            }
        }

        replay.truncated_bytes = (bytes.len() - offset) as u64;
        Ok((replay, offset as u64))
    }

    /// Appends one batch and returns the timestamp recorded with it.
    ///
    /// On failure the file is cut back to its previous length so a partial
    /// line never sits in front of later batches.
    pub fn append(&mut self, documents: &[Document]) -> Result<DateTime<Utc>, JournalError> {
        let recorded_at = Utc::now();
        let json = serde_json::to_vec(&JournalBatchRef {
            recorded_at,
            documents,
        })?;

        let mut line = Vec::with_capacity(json.len() + 66);
        line.extend_from_slice(checksum(&json).as_bytes());
        line.push(b'\t');
        line.extend_from_slice(&json);
        line.push(b'\n');

        if let Err(e) = self.write_record(&line) {
            // A fresh journal's handle is not in append mode, so the cursor moves back too
            let rollback = self
                .file
                .set_len(self.len)
                .and_then(|()| self.file.seek(SeekFrom::Start(self.len)));
            if let Err(rollback) = rollback {
                warn!(
                    path = %self.path.display(),
                    "Failed to roll back partial journal append: {rollback}"
                );
            }
            return Err(JournalError::io(&self.path, e));
        }

        self.len += line.len() as u64;
        Ok(recorded_at)
    }

    fn write_record(&mut self, line: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        if let Some(partial) = self.fail_after.take() {
            self.file.write_all(&line[..partial.min(line.len())])?;
            self.file.flush()?;
            return Err(io::Error::new(io::ErrorKind::StorageFull, "no space left on device"));
        }

        self.file.write_all(line)?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Makes the next append fail after writing `partial` bytes of its record.
    #[cfg(test)]
    pub(crate) fn fail_next_append_after(&mut self, partial: usize) {
        self.fail_after = Some(partial);
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the journal in bytes.
    pub fn len_bytes(&self) -> u64 {
        self.len
    }
}

fn decode_record(line: &[u8]) -> Result<JournalBatch, String> {
    let tab = line
        .iter()
        .position(|&b| b == b'\t')
        .ok_or_else(|| "record has no checksum separator".to_string())?;
    let (expected, json) = (&line[..tab], &line[tab + 1..]);

    if checksum(json).as_bytes() != expected {
        return Err("checksum mismatch".to_string());
    }

    serde_json::from_slice(json).map_err(|e| format!("unreadable batch: {e}"))
}

fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
