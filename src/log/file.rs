//! Append log file
//!
//! Owns the backing file and the current write offset. Reads are positional
//! (`&self`), so many readers can share one log; appends need `&mut self`.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{LogKvError, Result};

use super::entry::{Entry, EntryHeader, HEADER_SIZE};
use super::iter::LogIterator;

/// A single file treated as an ever-growing sequence of entries
#[derive(Debug)]
pub struct AppendLog {
    /// Backing file, opened read/write
    file: File,
    /// Path the file was opened from
    path: PathBuf,
    /// Byte position of the next write (= logical length)
    offset: u64,
    /// When to fsync
    sync_strategy: SyncStrategy,
    /// Appends written since the last fsync
    unsynced: usize,
}

impl AppendLog {
    /// Open the log at `path`, creating it if absent
    ///
    /// The write offset resumes at the current file length.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        Self::from_file(file, path, sync_strategy)
    }

    /// Create an empty log at `path`, discarding anything already there
    pub fn create(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Self::from_file(file, path, sync_strategy)
    }

    fn from_file(file: File, path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let offset = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            offset,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Read the entry starting at `offset`
    ///
    /// Returns:
    /// - `Err(EndOfLog)` — `offset` is at or beyond the logical end
    /// - `Err(TornEntry)` — the entry reaches or runs past the end (interrupted write)
    /// - `Err(Corruption)` — the header is malformed and more log follows it
    /// - `Err(Io)` — the read itself failed
    pub fn read_at(&self, offset: u64) -> Result<Entry> {
        if offset >= self.offset {
            return Err(LogKvError::EndOfLog { offset });
        }

        let remaining = self.offset - offset;
        if remaining < HEADER_SIZE as u64 {
            return Err(LogKvError::TornEntry {
                offset,
                reason: format!("truncated header: only {} bytes remain", remaining),
            });
        }

        let mut header_buf = [0u8; HEADER_SIZE];
        read_exact_at(&self.file, &mut header_buf, offset)?;
        let header = match EntryHeader::decode(&header_buf) {
            Ok(header) => header,
            // A bad header whose declared extent reaches the end of the log
            // is the tail of an interrupted write, not damage inside the log
            Err(e) if EntryHeader::declared_size(&header_buf) >= remaining => {
                return Err(LogKvError::TornEntry {
                    offset,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e.at_offset(offset)),
        };

        if header.total_size() > remaining {
            return Err(LogKvError::TornEntry {
                offset,
                reason: format!(
                    "entry of {} bytes runs past end of log ({} bytes remain)",
                    header.total_size(),
                    remaining
                ),
            });
        }

        let key_offset = offset + HEADER_SIZE as u64;
        let mut key = vec![0u8; header.key_size as usize];
        if !key.is_empty() {
            read_exact_at(&self.file, &mut key, key_offset)?;
        }

        let value_offset = key_offset + header.key_size as u64;
        let mut value = vec![0u8; header.value_size as usize];
        if !value.is_empty() {
            read_exact_at(&self.file, &mut value, value_offset)?;
        }

        Ok(Entry {
            key,
            value,
            mark: header.mark,
        })
    }

    /// Append an entry and return the offset it starts at
    ///
    /// The offset only advances if the write (and any sync it triggers)
    /// succeeds; on failure the file is cut back to the previous length.
    pub fn append(&mut self, entry: &Entry) -> Result<u64> {
        let encoded = entry.encode()?;
        let offset = self.offset;

        if let Err(e) = self.write_at_end(&encoded) {
            if let Err(rollback) = self.file.set_len(offset) {
                tracing::warn!(
                    "Failed to roll back partial append in {} at offset {}: {}",
                    self.path.display(),
                    offset,
                    rollback
                );
            } else {
                tracing::warn!(
                    "Rolled back failed append in {} at offset {}",
                    self.path.display(),
                    offset
                );
            }
            return Err(e);
        }

        self.offset += encoded.len() as u64;
        Ok(offset)
    }

    fn write_at_end(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(self.offset))?;
        self.file.write_all(bytes)?;

        let pending = self.unsynced + 1;
        let should_sync = match self.sync_strategy {
            SyncStrategy::Never => false,
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => pending >= count,
        };
        if should_sync {
            self.sync()?;
        } else {
            self.unsynced = pending;
        }
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Cut the log back to `len` bytes
    pub(crate) fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.offset = len;
        self.unsynced = 0;
        Ok(())
    }

    /// Sync and release the file handle
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    /// Iterate over all entries from offset 0
    pub fn iter(&self) -> LogIterator<'_> {
        LogIterator::new(self)
    }

    /// Byte position of the next write
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    /// Appends written since the last fsync
    pub fn unsynced(&self) -> usize {
        self.unsynced
    }

    /// Point this log at a new path after its file was renamed
    pub(crate) fn relocate(&mut self, path: &Path, sync_strategy: SyncStrategy) {
        self.path = path.to_path_buf();
        self.sync_strategy = sync_strategy;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Fsync a directory so a rename inside it is durable
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
