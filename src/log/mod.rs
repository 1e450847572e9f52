//! Append Log Module
//!
//! Durable sequential storage with positional random access.
//!
//! ## Responsibilities
//! - Encode/decode individual entries
//! - Append entries at the current write offset
//! - Read any entry back given the offset it was written at
//! - Forward scans for index replay and merge
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Entry 1                                                  │
//! │ ┌─────────────┬───────────────┬──────────┬─────┬───────┐ │
//! │ │ KeySize (4) │ ValueSize (4) │ Mark (4) │ Key │ Value │ │
//! │ └─────────────┴───────────────┴──────────┴─────┴───────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Entry 2                                                  │
//! │ ...                                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Header fields are big-endian u32. Mark: 0 = PUT, 1 = DELETE.
//! Offsets are absolute byte positions of an entry's header.

mod entry;
mod file;
mod iter;

pub use entry::{Entry, EntryHeader, Mark, HEADER_SIZE};
pub use file::AppendLog;
pub use iter::LogIterator;

pub(crate) use file::sync_dir;
