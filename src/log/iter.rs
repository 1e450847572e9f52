//! Log Iterator
//!
//! Sequential forward scan over every entry in an append log.

use crate::error::Result;

use super::entry::Entry;
use super::file::AppendLog;

/// Iterator over `(offset, entry)` pairs, starting at offset 0
///
/// Ends cleanly at the end-of-log signal. Any other error is yielded once
/// and then iteration stops; the caller decides whether a `TornEntry` is
/// repaired or treated as a fault.
pub struct LogIterator<'a> {
    log: &'a AppendLog,
    /// Offset of the next entry to read
    offset: u64,
    done: bool,
}

impl<'a> LogIterator<'a> {
    pub(super) fn new(log: &'a AppendLog) -> Self {
        Self {
            log,
            offset: 0,
            done: false,
        }
    }

    /// Offset the scan has reached: end of the last entry yielded
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<'a> Iterator for LogIterator<'a> {
    type Item = Result<(u64, Entry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.log.read_at(self.offset) {
            Ok(entry) => {
                let at = self.offset;
                self.offset += entry.total_size();
                Some(Ok((at, entry)))
            }
            Err(e) if e.is_end_of_log() => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
