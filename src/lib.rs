//! # LogKV
//!
//! A minimal log-structured key-value store with:
//! - A single append-only data file of variable-length entries
//! - An in-memory hash index from key to entry offset
//! - Index rebuild by log replay, tolerating a torn trailing record
//! - Explicit merge (compaction) with an atomic file swap
//! - Single reader/writer lock concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                              │
//! │            (RwLock over { index, active log })              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Index    │          │ Append Log  │
//!   │ key→offset  │          │  (file)     │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │ Entry codec │
//!                           └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use logkv::Engine;
//!
//! let engine = Engine::open_path(std::path::Path::new("./logkv_data"))?;
//! engine.put(b"hello", b"world")?;
//! assert_eq!(engine.get(b"hello")?, Some(b"world".to_vec()));
//! engine.delete(b"hello")?;
//! engine.merge()?;
//! engine.close()?;
//! # Ok::<(), logkv::LogKvError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod log;
pub mod index;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogKvError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::{Engine, EngineStats, ReplayStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LogKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
