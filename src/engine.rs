//! Engine Module
//!
//! The core storage engine that coordinates the append log and the index.
//!
//! ## Responsibilities
//! - Rebuild the index by replaying the log on startup
//! - Handle concurrent read/write access
//! - Append PUT/DELETE entries and keep the index in step
//! - Compact the log on demand (merge)

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::{Config, SyncStrategy};
use crate::error::{LogKvError, Result};
use crate::index::Index;
use crate::log::{sync_dir, AppendLog, Entry};

/// Statistics gathered while replaying the log at open time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Number of complete entries replayed
    pub entries_replayed: u64,

    /// Keys live in the index after replay
    pub live_keys: usize,

    /// Bytes cut from a torn trailing record (0 for a clean log)
    pub truncated_bytes: u64,
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub live_keys: usize,
    pub log_size: u64,
}

/// Everything guarded by the engine lock
///
/// The index and the active log are always mutated together.
struct EngineState {
    /// `None` once the engine has been closed
    log: Option<AppendLog>,
    index: Index,
}

/// The main storage engine
///
/// ## Concurrency Model: single reader/writer lock
///
/// - **Reads** (get): shared access, many at once
/// - **Writes** (put/delete/merge/sync/close): exclusive access
///
/// Merge holds exclusive access for its whole scan-and-rewrite, so liveness
/// is never judged against an index that is changing underneath it.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Canonical log file
    log_path: PathBuf,

    /// Temporary log written during merge
    merge_path: PathBuf,

    state: RwLock<EngineState>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const LOG_FILENAME: &'static str = "logkv.data";
    const MERGE_FILENAME: &'static str = "logkv.data.merge";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Remove a merge file left behind by a crash
    /// 3. Open/create the log
    /// 4. Replay the log into a fresh index, cutting off a torn tail
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let log_path = config.data_dir.join(Self::LOG_FILENAME);
        let merge_path = config.data_dir.join(Self::MERGE_FILENAME);

        // Leftover from a merge that never reached its rename
        if merge_path.exists() {
            tracing::warn!(
                "Removing stale merge file {} from an interrupted merge",
                merge_path.display()
            );
            fs::remove_file(&merge_path)?;
        }

        let mut log = AppendLog::open(&log_path, config.sync_strategy)?;
        let (index, stats) = Self::replay(&mut log)?;

        tracing::info!(
            "Opened {}: {} entries replayed, {} live keys, {} bytes",
            log_path.display(),
            stats.entries_replayed,
            stats.live_keys,
            log.offset()
        );

        Ok(Self {
            config,
            log_path,
            merge_path,
            state: RwLock::new(EngineState {
                log: Some(log),
                index,
            }),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Rebuild the index by scanning `log` from offset 0
    ///
    /// A record that reaches or runs past the end of the file is a torn
    /// write from a crash: the log is truncated back to the end of the last
    /// complete entry. A bad record with more log after it is real damage
    /// and fails with `Corruption`, leaving the file untouched.
    pub fn replay(log: &mut AppendLog) -> Result<(Index, ReplayStats)> {
        let mut index = Index::new();
        let mut stats = ReplayStats::default();
        let mut torn_at = None;

        for item in log.iter() {
            match item {
                Ok((offset, entry)) => {
                    tracing::trace!(
                        "Replay {:?} at offset {} ({} bytes)",
                        entry.mark,
                        offset,
                        entry.total_size()
                    );
                    index.apply(offset, &entry);
                    stats.entries_replayed += 1;
                }
                Err(LogKvError::TornEntry { offset, reason }) => {
                    tracing::warn!(
                        "Torn record in {} at offset {}: {}",
                        log.path().display(),
                        offset,
                        reason
                    );
                    torn_at = Some(offset);
                    break;
                }
                Err(e) => {
                    tracing::error!("Replay of {} failed: {}", log.path().display(), e);
                    return Err(e);
                }
            }
        }

        if let Some(valid_len) = torn_at {
            stats.truncated_bytes = log.offset() - valid_len;
            log.truncate(valid_len)?;
            tracing::warn!(
                "Truncated {} bytes of torn tail from {}",
                stats.truncated_bytes,
                log.path().display()
            );
        }

        stats.live_keys = index.len();
        Ok((index, stats))
    }

    /// Get a value by key
    ///
    /// Returns `Ok(None)` for an empty key or a key that is not live; the
    /// log is not touched in either case.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Ok(None);
        }

        let state = self.state.read();
        let log = state.log.as_ref().ok_or(LogKvError::InvalidLog)?;

        let offset = match state.index.locate(key) {
            Ok(offset) => offset,
            Err(LogKvError::KeyNotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let entry = match log.read_at(offset) {
            Ok(entry) => entry,
            Err(e) if e.is_end_of_log() => {
                tracing::warn!("Index points past end of log at offset {}", offset);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if entry.key != key {
            return Err(LogKvError::corruption(
                offset,
                "indexed entry holds a different key",
            ));
        }
        if !entry.is_put() {
            return Err(LogKvError::corruption(
                offset,
                "indexed entry is a tombstone",
            ));
        }

        Ok(Some(entry.value))
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Acquire exclusive access
    /// 2. Append a PUT entry
    /// 3. Only once the append succeeded, point the index at it
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }

        let mut guard = self.state.write();
        let state = &mut *guard;
        let log = state.log.as_mut().ok_or(LogKvError::InvalidLog)?;

        let offset = log.append(&Entry::put(key.to_vec(), value.to_vec()))?;
        state.index.insert(key.to_vec(), offset);

        tracing::debug!("Put {} byte key at offset {}", key.len(), offset);
        Ok(())
    }

    /// Delete a key
    ///
    /// Deleting a key that is not live is a no-op and writes nothing.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }

        let mut guard = self.state.write();
        let state = &mut *guard;
        let log = state.log.as_mut().ok_or(LogKvError::InvalidLog)?;

        match state.index.locate(key) {
            Ok(_) => {}
            Err(LogKvError::KeyNotFound) => return Ok(()),
            Err(e) => return Err(e),
        }

        let offset = log.append(&Entry::delete(key.to_vec()))?;
        state.index.remove(key);

        tracing::debug!("Delete {} byte key, tombstone at offset {}", key.len(), offset);
        Ok(())
    }

    /// Compact the log so it holds only live entries
    ///
    /// Steps (all under exclusive access):
    /// 1. Scan the log; an entry is live if the index points at its offset
    /// 2. Append live entries, in their original order, to a fresh merge file
    /// 3. Close the old log and rename the merge file over it
    /// 4. Install the merge file's handle as the active log and commit the
    ///    new offsets to the index
    ///
    /// On failure before the rename the merge file is removed and the old
    /// log and index stay active. Nothing after a successful rename can
    /// fail the merge.
    pub fn merge(&self) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let log = state.log.as_ref().ok_or(LogKvError::InvalidLog)?;

        if log.is_empty() {
            tracing::debug!("Merge skipped: log is empty");
            return Ok(());
        }
        let size_before = log.offset();

        // Steps 1 + 2
        let (mut merge_log, staged, discarded) =
            match self.rewrite_live_entries(log, &state.index) {
                Ok(result) => result,
                Err(e) => {
                    self.discard_merge_file();
                    return Err(e);
                }
            };

        // Step 3: no handle to the old file may stay open across the rename
        if let Some(old_log) = state.log.take() {
            drop(old_log);
        }

        if let Err(e) = fs::rename(&self.merge_path, &self.log_path) {
            tracing::warn!("Merge rename failed, keeping previous log: {}", e);
            drop(merge_log);
            self.discard_merge_file();
            state.log = Some(AppendLog::open(&self.log_path, self.config.sync_strategy)?);
            return Err(e.into());
        }

        // Step 4
        merge_log.relocate(&self.log_path, self.config.sync_strategy);
        let size_after = merge_log.offset();
        let kept = staged.len();
        for (key, offset) in staged {
            state.index.insert(key, offset);
        }
        state.log = Some(merge_log);

        if let Err(e) = sync_dir(&self.config.data_dir) {
            tracing::warn!(
                "Failed to sync {} after merge rename: {}",
                self.config.data_dir.display(),
                e
            );
        }

        tracing::info!(
            "Merge complete: {} entries kept, {} discarded, {} -> {} bytes",
            kept,
            discarded,
            size_before,
            size_after
        );
        Ok(())
    }

    /// Write the live entries of `log` to the merge file
    ///
    /// Returns the still-open merge log, the staged `(key, new_offset)`
    /// pairs and the number of stale entries skipped. The merge log is
    /// synced on success.
    fn rewrite_live_entries(
        &self,
        log: &AppendLog,
        index: &Index,
    ) -> Result<(AppendLog, Vec<(Vec<u8>, u64)>, u64)> {
        let mut merge_log = AppendLog::create(&self.merge_path, SyncStrategy::Never)?;
        let mut staged = Vec::with_capacity(index.len());
        let mut discarded = 0u64;

        for item in log.iter() {
            let (offset, entry) = item?;
            if index.is_live(&entry.key, offset) {
                let new_offset = merge_log.append(&entry)?;
                staged.push((entry.key, new_offset));
            } else {
                discarded += 1;
            }
        }

        merge_log.sync()?;
        Ok((merge_log, staged, discarded))
    }

    fn discard_merge_file(&self) {
        if let Err(e) = fs::remove_file(&self.merge_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    "Failed to remove merge file {}: {}",
                    self.merge_path.display(),
                    e
                );
            }
        }
    }

    /// Force the log to disk
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.write();
        state.log.as_mut().ok_or(LogKvError::InvalidLog)?.sync()
    }

    /// Close the engine
    ///
    /// Syncs and releases the log file. Any later operation, including a
    /// second close, fails with `InvalidLog`.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        let log = state.log.take().ok_or(LogKvError::InvalidLog)?;
        state.index.clear();
        log.close()?;

        tracing::info!("Closed {}", self.log_path.display());
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a key is live without reading the log
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.state.read().index.contains_key(key)
    }

    /// Current size of the log in bytes
    pub fn log_size(&self) -> Result<u64> {
        let state = self.state.read();
        state
            .log
            .as_ref()
            .map(AppendLog::offset)
            .ok_or(LogKvError::InvalidLog)
    }

    pub fn stats(&self) -> Result<EngineStats> {
        let state = self.state.read();
        let log = state.log.as_ref().ok_or(LogKvError::InvalidLog)?;
        Ok(EngineStats {
            live_keys: state.index.len(),
            log_size: log.offset(),
        })
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the canonical log file path
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
