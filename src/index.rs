//! In-memory index
//!
//! Maps each live key (raw bytes) to the offset of its most recent PUT entry.

use std::collections::HashMap;

use crate::error::{LogKvError, Result};
use crate::log::{Entry, Mark};

/// Key → offset of the current live PUT entry
///
/// DELETE markers and superseded offsets are never stored.
#[derive(Debug, Default)]
pub struct Index {
    offsets: HashMap<Vec<u8>, u64>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the live entry for `key`, or `KeyNotFound`
    pub fn locate(&self, key: &[u8]) -> Result<u64> {
        self.offsets
            .get(key)
            .copied()
            .ok_or(LogKvError::KeyNotFound)
    }

    /// Point `key` at `offset`, returning the previous offset
    pub fn insert(&mut self, key: Vec<u8>, offset: u64) -> Option<u64> {
        self.offsets.insert(key, offset)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<u64> {
        self.offsets.remove(key)
    }

    /// Replay one log entry found at `offset`
    pub fn apply(&mut self, offset: u64, entry: &Entry) {
        match entry.mark {
            Mark::Put => {
                self.offsets.insert(entry.key.clone(), offset);
            }
            Mark::Delete => {
                self.offsets.remove(&entry.key);
            }
        }
    }

    /// True if `key` is indexed at exactly `offset`
    pub fn is_live(&self, key: &[u8], offset: u64) -> bool {
        self.offsets.get(key) == Some(&offset)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.offsets.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }
}
