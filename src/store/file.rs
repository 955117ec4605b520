//! Durable row store backed by an append-only commit log
//!
//! Layout: `<data_dir>/data/tree.log`, a sequence of checksummed frames, one
//! per committed batch. The log is replayed into memory on open; reads are
//! served from memory. A batch becomes visible only after its frame is
//! fsynced.
//!
//! Any checksum failure, truncated frame or out-of-sequence revision during
//! replay aborts the open. The log is never silently repaired.
//!
//! One handle owns the log at a time: `open` takes an exclusive lock on the
//! log file and holds it until the store is dropped. A second handle, in this
//! process or another, fails with `NEST_STORE_LOCKED`.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::node::{NodeKey, TreeId, TreeNode};
use crate::observability::{log_event, Event, Logger};

use super::backend::RowStore;
use super::batch::{Revision, WriteBatch};
use super::errors::{StoreError, StoreResult};
use super::frame::CommitRecord;
use super::memory::MemoryRowStore;
use super::predicate::RangePredicate;

/// File name of the commit log inside `<data_dir>/data`
pub const LOG_FILE: &str = "tree.log";

/// Append handle with the length of the last durable frame boundary
#[derive(Debug)]
struct CommitLog {
    file: File,
    durable_len: u64,
    /// Set when a torn frame could not be cut off; no further appends
    poisoned: bool,
}

impl CommitLog {
    fn new(file: File, durable_len: u64) -> Self {
        Self {
            file,
            durable_len,
            poisoned: false,
        }
    }

    fn append(&mut self, frame: &[u8]) -> StoreResult<()> {
        if self.poisoned {
            return Err(StoreError::Poisoned(
                "commit log holds a torn frame".to_string(),
            ));
        }

        let written = self
            .file
            .write_all(frame)
            .and_then(|_| self.file.sync_all());

        if let Err(e) = written {
            let reason = e.to_string();
            Logger::error(Event::CommitFailed.as_str(), &[("reason", reason.as_str())]);

            // A torn frame left behind would make every later frame unreadable.
            if let Err(truncate) = self.file.set_len(self.durable_len) {
                self.poisoned = true;
                let truncate = truncate.to_string();
                Logger::fatal(
                    Event::CommitFailed.as_str(),
                    &[("reason", truncate.as_str()), ("state", "poisoned")],
                );
            }
            return Err(StoreError::io("Failed to append commit to log", e));
        }

        self.durable_len += frame.len() as u64;
        Ok(())
    }
}

/// Row store persisted to a commit log
#[derive(Debug)]
pub struct FileRowStore {
    log_path: PathBuf,
    memory: MemoryRowStore,
    log: Mutex<CommitLog>,
    replayed: u64,
}

impl FileRowStore {
    /// Opens or creates the store under `data_dir`, replaying the existing log.
    ///
    /// # Errors
    ///
    /// Returns `NEST_STORE_CORRUPTION` if the log fails verification,
    /// `NEST_STORE_LOCKED` if another handle owns it and `NEST_STORE_IO_ERROR`
    /// if it cannot be opened.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let data_subdir = data_dir.join("data");
        if !data_subdir.exists() {
            fs::create_dir_all(&data_subdir).map_err(|e| {
                StoreError::io(
                    format!("Failed to create data directory: {}", data_subdir.display()),
                    e,
                )
            })?;
        }

        let log_path = data_subdir.join(LOG_FILE);
        let path_str = log_path.display().to_string();
        log_event(Event::StoreOpenBegin, &[("path", path_str.as_str())]);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| {
                StoreError::io(
                    format!("Failed to open commit log: {}", log_path.display()),
                    e,
                )
            })?;
        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(StoreError::locked(path_str)),
            Err(TryLockError::Error(e)) => {
                return Err(StoreError::io(
                    format!("Failed to lock commit log: {}", log_path.display()),
                    e,
                ))
            }
        }

        let memory = MemoryRowStore::new();
        let (replayed, durable_len) = Self::replay(&log_path, &memory).map_err(|e| {
            if let StoreError::Corruption { offset, reason } = &e {
                let offset = offset.to_string();
                log_event(
                    Event::LogCorruption,
                    &[
                        ("byte_offset", offset.as_str()),
                        ("path", path_str.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
            }
            e
        })?;

        let commits = replayed.to_string();
        log_event(
            Event::StoreOpenComplete,
            &[("commits", commits.as_str()), ("path", path_str.as_str())],
        );

        Ok(Self {
            log_path,
            memory,
            log: Mutex::new(CommitLog::new(file, durable_len)),
            replayed,
        })
    }

    /// Replays every frame into `memory`.
    ///
    /// Returns the number of commits replayed and the log length.
    fn replay(log_path: &Path, memory: &MemoryRowStore) -> StoreResult<(u64, u64)> {
        let data = match fs::read(log_path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((0, 0)),
            Err(e) => {
                return Err(StoreError::io(
                    format!("Failed to read commit log: {}", log_path.display()),
                    e,
                ))
            }
        };

        let mut offset = 0usize;
        let mut replayed = 0u64;

        while offset < data.len() {
            let (record, consumed) = CommitRecord::decode(&data[offset..])
                .map_err(|e| StoreError::corruption_at_offset(offset as u64, e.to_string()))?;

            let revision = memory
                .commit_with(&record.to_batch(), |_| Ok(()))
                .map_err(|e| {
                    StoreError::corruption_at_offset(
                        offset as u64,
                        format!(
                            "commit {} of scope {} does not replay: {}",
                            record.revision, record.tree, e
                        ),
                    )
                })?;

            if revision != record.revision {
                return Err(StoreError::corruption_at_offset(
                    offset as u64,
                    format!(
                        "scope {} replayed to revision {} but frame records {}",
                        record.tree, revision, record.revision
                    ),
                ));
            }

            offset += consumed;
            replayed += 1;
        }

        Ok((replayed, data.len() as u64))
    }

    /// Path of the commit log
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Number of commits replayed when the store was opened
    pub fn replayed_commits(&self) -> u64 {
        self.replayed
    }

    /// Ids of every scope in the store, sorted
    pub fn trees(&self) -> StoreResult<Vec<TreeId>> {
        self.memory.trees()
    }
}

impl RowStore for FileRowStore {
    fn get(&self, key: &NodeKey) -> StoreResult<Option<TreeNode>> {
        self.memory.get(key)
    }

    fn find_many(&self, tree: &TreeId, predicate: &RangePredicate) -> StoreResult<Vec<TreeNode>> {
        self.memory.find_many(tree, predicate)
    }

    fn revision(&self, tree: &TreeId) -> StoreResult<Revision> {
        self.memory.revision(tree)
    }

    fn batch_update(&self, batch: &WriteBatch) -> StoreResult<Revision> {
        self.memory.commit_with(batch, |revision| {
            let frame = CommitRecord::from_batch(batch, revision).encode()?;
            let mut log = self
                .log
                .lock()
                .map_err(|_| StoreError::Poisoned("commit log".to_string()))?;
            log.append(&frame)?;

            let revision = revision.to_string();
            let bytes = frame.len().to_string();
            Logger::trace(
                Event::CommitAppended.as_str(),
                &[
                    ("bytes", bytes.as_str()),
                    ("revision", revision.as_str()),
                    ("tree", batch.tree().as_str()),
                ],
            );
            Ok(())
        })
    }
}
