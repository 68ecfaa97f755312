//! The public facade: lifecycle, expansion, and the read/write surface.

use crate::{EngineError, EntryManager};
use config::ArrayConfig;
use memarray::MemoryArray;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle state of a [`RecoverableArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMode {
    /// Constructed but never opened; no files have been touched.
    Init,
    /// Open for reads and writes.
    Open,
    /// Closed; `get`/`set`/`sync` fail with [`EngineError::NotOpen`].
    Closed,
}

/// A persistent, recoverable, dynamically-growing array of fixed-width
/// integers, durable via a bounded append-only Entry log.
pub struct RecoverableArray {
    config: ArrayConfig,
    memory: MemoryArray,
    entry_manager: Option<EntryManager>,
    /// Set by `memory`'s growth listener whenever `MemoryArray::expand_capacity`
    /// grows the segment list; drained by `expand_capacity` below to grow the
    /// backing ArrayFile in lock-step. A plain field bridge rather than a
    /// closure over `entry_manager` directly, since both live as sibling
    /// fields on this struct.
    pending_growth: Arc<AtomicU32>,
    mode: ArrayMode,
    lifecycle: Mutex<()>,
}

impl RecoverableArray {
    /// Builds a not-yet-open array bound to `config`. No I/O happens until
    /// [`open`](Self::open) is called.
    pub fn new(config: ArrayConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let mut memory = MemoryArray::new(config.sub_array_bits);
        let pending_growth = Arc::new(AtomicU32::new(0));
        let pg = Arc::clone(&pending_growth);
        memory.set_listener(move |new_length| pg.store(new_length, Ordering::SeqCst));

        Ok(Self {
            config,
            memory,
            entry_manager: None,
            pending_growth,
            mode: ArrayMode::Init,
            lifecycle: Mutex::new(()),
        })
    }

    /// Opens the array, running recovery if needed. Idempotent when already
    /// OPEN.
    pub fn open(&mut self) -> Result<(), EngineError> {
        let _guard = self.lifecycle.lock().unwrap();
        if self.mode == ArrayMode::Open {
            return Ok(());
        }

        let mut entry_manager = EntryManager::open(&self.config)?;
        let file_length = entry_manager.array_file_length();
        if file_length > 0 {
            self.memory.expand_capacity(file_length - 1);
        }
        self.pending_growth.store(0, Ordering::SeqCst);
        entry_manager.load_into(&mut self.memory)?;

        self.entry_manager = Some(entry_manager);
        self.mode = ArrayMode::Open;
        Ok(())
    }

    /// Closes the array, releasing its file handles. Idempotent when already
    /// CLOSED. Does not implicitly `sync` — callers needing durability before
    /// closing must call [`sync`](Self::sync) first.
    pub fn close(&mut self) -> Result<(), EngineError> {
        let _guard = self.lifecycle.lock().unwrap();
        if self.mode == ArrayMode::Closed {
            return Ok(());
        }
        self.entry_manager = None;
        self.mode = ArrayMode::Closed;
        Ok(())
    }

    /// `true` if the array is currently OPEN.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.mode == ArrayMode::Open
    }

    fn manager_mut(&mut self) -> Result<&mut EntryManager, EngineError> {
        self.entry_manager.as_mut().ok_or(EngineError::NotOpen)
    }

    fn manager(&self) -> Result<&EntryManager, EngineError> {
        self.entry_manager.as_ref().ok_or(EngineError::NotOpen)
    }

    /// Current logical length in elements. Always a multiple of
    /// `1 << sub_array_bits`.
    #[must_use]
    pub fn length(&self) -> u32 {
        self.memory.length()
    }

    /// Reads the value at `index`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotOpen`] if not OPEN; [`EngineError::IndexOutOfRange`]
    /// if `index >= length()`.
    pub fn get(&self, index: u32) -> Result<i64, EngineError> {
        if !self.is_open() {
            return Err(EngineError::NotOpen);
        }
        let length = self.memory.length();
        if index >= length {
            return Err(EngineError::IndexOutOfRange(index, length));
        }
        Ok(self.memory.get(index))
    }

    /// Writes `value` at `index` tagged with sequence number `scn`,
    /// auto-growing the array if `index >= length()`.
    ///
    /// The Entry append happens before the in-memory cell is updated: if it
    /// fails, the cell is left untouched.
    pub fn set(&mut self, index: u32, value: i64, scn: u64) -> Result<(), EngineError> {
        if !self.is_open() {
            return Err(EngineError::NotOpen);
        }
        if index >= self.memory.length() {
            self.expand_capacity(index)?;
        }
        self.manager_mut()?.add_record(index, value, scn)?;
        self.memory.set(index, value);
        Ok(())
    }

    /// The in-memory accepted (high) water mark SCN.
    pub fn get_hwmark(&self) -> Result<u64, EngineError> {
        Ok(self.manager()?.hwm_scn())
    }

    /// The durable (low) water mark SCN.
    pub fn get_lwmark(&self) -> Result<u64, EngineError> {
        Ok(self.manager()?.lwm_scn())
    }

    /// Advances the high water mark to `end` without a corresponding data
    /// write, or rewinds both marks if `end` is below the current low water
    /// mark.
    ///
    /// If `end > hwm`, records a no-op write at index 0 (re-appending its
    /// current value) tagged with `scn = end`, advancing `hwm`. If
    /// `0 < end < lwm`, first `sync()`s, then forces both water marks to
    /// `(end, end)`. Retained for on-disk format compatibility with the
    /// reference design even though it conflates a control signal with a
    /// data record.
    pub fn save_hwmark(&mut self, end: u64) -> Result<(), EngineError> {
        if !self.is_open() {
            return Err(EngineError::NotOpen);
        }
        let hwm = self.get_hwmark()?;
        if end > hwm {
            let current = self.memory.get(0);
            self.manager_mut()?.add_record(0, current, end)?;
            return Ok(());
        }
        let lwm = self.get_lwmark()?;
        if end > 0 && end < lwm {
            self.sync()?;
            self.manager_mut()?.set_water_marks(end, end)?;
        }
        Ok(())
    }

    /// Seals the current Entry, applies pending Entries to the ArrayFile, and
    /// advances the durable water mark to the accepted one. Post-condition:
    /// `get_lwmark() == get_hwmark()`. A second call with no writes in
    /// between is a no-op with respect to data.
    pub fn sync(&mut self) -> Result<(), EngineError> {
        self.manager_mut()?.sync()
    }

    /// Synonym of [`sync`](Self::sync).
    pub fn persist(&mut self) -> Result<(), EngineError> {
        self.sync()
    }

    /// Zeroes every in-memory cell, recycles every Entry, zeroes the backing
    /// ArrayFile's body, and resets both water marks to zero. `length()` is
    /// unchanged. Zeroing the ArrayFile body (not just memory) is what keeps
    /// a later `close(); open()` from resurrecting values written before the
    /// clear.
    pub fn clear(&mut self) -> Result<(), EngineError> {
        self.memory.clear();
        self.manager_mut()?.clear()
    }

    /// Explicitly grows the array so that `index` is addressable.
    ///
    /// Computes `new_len = ((index >> bits) + 1) << bits`, grows the
    /// in-memory segments first (cannot fail short of OOM), then grows the
    /// backing ArrayFile (zero-fills the tail, updates the header length,
    /// fsyncs). If the file grow fails, the in-memory growth is **not**
    /// rolled back — see `DESIGN.md` for why this asymmetry is an accepted
    /// limitation rather than a silent correctness gap.
    pub fn expand_capacity(&mut self, index: u32) -> Result<(), EngineError> {
        self.memory.expand_capacity(index);
        let pending = self.pending_growth.swap(0, Ordering::SeqCst);
        if pending > 0 {
            self.manager_mut()?.grow_array_file(pending)?;
        }
        Ok(())
    }
}
