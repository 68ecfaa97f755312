//! # krati-engine — recoverable primitive array engine
//!
//! Ties [`memarray`], [`entrylog`], and [`arrayfile`] into a complete
//! recoverable fixed-width array: a segmented in-memory view backed by an
//! on-disk file, with durability provided by a bounded pool of append-only
//! log entries.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌───────────────────────────────────────────────────┐
//! │               RecoverableArray (facade)            │
//! │                                                     │
//! │  set(i, v, scn) → EntryManager::add_record          │
//! │                  → MemoryArray::set                 │
//! │                                                     │
//! │  sync()/persist() → EntryManager::sync               │
//! │    seals current Entry, applies FULL entries to       │
//! │    ArrayFile, writes water marks, fsyncs               │
//! │                                                     │
//! │  get(i) → MemoryArray::get                           │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module              | Purpose                                               |
//! |----------------------|-------------------------------------------------------|
//! | [`lib.rs`]          | `EngineError`, crate constants                         |
//! | [`entry_manager`]   | Write absorption, rollover, sync, six-step recovery    |
//! | [`recoverable_array`] | Public facade, lifecycle, expansion protocol          |
//!
//! ## Crash Safety
//!
//! Every `set` is appended to the currently OPEN Entry before the in-memory
//! cell is updated. `sync`/`persist` seal and apply pending Entries to the
//! ArrayFile and advance the durable water mark. On `open`, any Entries not
//! yet reflected in the ArrayFile's low water mark are replayed in SCN order.

mod entry_manager;
mod recoverable_array;

pub use entry_manager::EntryManager;
pub use recoverable_array::{ArrayMode, RecoverableArray};

use thiserror::Error;

/// Errors surfaced by the engine's public API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An underlying I/O failure from the array file or an entry file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The array's configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// The ArrayFile's on-disk header could not be parsed.
    #[error("corrupt array file: {0}")]
    CorruptArrayFile(String),

    /// An Entry's replay could not be completed cleanly.
    #[error("corrupt entry: {0}")]
    CorruptEntry(String),

    /// A read was attempted at or beyond the array's current length.
    #[error("index {0} out of range (length {1})")]
    IndexOutOfRange(u32, u32),

    /// An operation requiring an OPEN array was invoked while CLOSED or INIT.
    #[error("array is not open")]
    NotOpen,
}

impl From<arrayfile::ArrayFileError> for EngineError {
    fn from(e: arrayfile::ArrayFileError) -> Self {
        match e {
            arrayfile::ArrayFileError::Io(io) => EngineError::Io(io),
            arrayfile::ArrayFileError::CorruptHeader(msg) => EngineError::CorruptArrayFile(msg),
        }
    }
}

impl From<entrylog::EntryError> for EngineError {
    fn from(e: entrylog::EntryError) -> Self {
        match e {
            entrylog::EntryError::Io(io) => EngineError::Io(io),
            entrylog::EntryError::CorruptHeader(msg) => EngineError::CorruptEntry(msg),
            entrylog::EntryError::Full => {
                unreachable!("EntryError::Full is handled internally by rollover")
            }
        }
    }
}
