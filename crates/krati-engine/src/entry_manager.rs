//! Write absorption, rollover, sync, and on-open recovery.
//!
//! `EntryManager` owns the [`arrayfile::ArrayFile`] and the
//! [`entrylog::pool::EntryPool`] that backs it, and is the only thing in this
//! crate that touches either directly.

use crate::EngineError;
use arrayfile::ArrayFile;
use config::ArrayConfig;
use entrylog::pool::{entry_file_name, EntryPool};
use entrylog::{Entry, EntryState};
use std::path::Path;

const ARRAY_FILE_NAME: &str = "indexes.dat";

/// Glues writes, Entries, water marks, and recovery together for one array
/// directory.
pub struct EntryManager {
    pool: EntryPool,
    array_file: ArrayFile,
    /// In-memory accepted water mark; advanced on every `add_record`, ahead
    /// of whatever is currently durable in the ArrayFile header.
    hwm_scn: u64,
    /// Mirrors the ArrayFile header's durable water mark; only advances on
    /// `sync`/`set_water_marks`.
    lwm_scn: u64,
}

impl EntryManager {
    /// Opens (or creates) the array directory named by `config`, replaying
    /// any Entries not yet reflected in the ArrayFile's low water mark.
    pub fn open(config: &ArrayConfig) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&config.directory)?;

        let array_path = config.directory.join(ARRAY_FILE_NAME);
        let mut array_file = if array_path.exists() {
            ArrayFile::open(&array_path)?
        } else {
            ArrayFile::create(
                &array_path,
                config.sub_array_size() as u32,
                config.element_width,
            )?
        };

        let file_lwm = array_file.lwm_scn();
        let file_hwm = array_file.hwm_scn();

        let entries = Self::load_or_create_entries(&config.directory, config)?;
        let (mut to_replay, mut to_recycle): (Vec<Entry>, Vec<Entry>) = entries
            .into_iter()
            .partition(|e| !e.is_empty() && e.max_scn() > file_lwm);
        to_replay.sort_by_key(Entry::min_scn);

        let mut max_replayed = file_lwm;
        for entry in to_replay.iter_mut() {
            for record in entry.records()? {
                if record.scn > file_lwm {
                    array_file.put(record.index, record.value)?;
                    max_replayed = max_replayed.max(record.scn);
                }
            }
        }
        array_file.flush()?;

        let new_lwm = max_replayed.max(file_hwm);
        array_file.write_water_marks(new_lwm, new_lwm)?;

        let mut settled = to_replay;
        settled.append(&mut to_recycle);
        for entry in settled.iter_mut() {
            entry.recycle()?;
        }
        let pool = EntryPool::from_recycled(&config.directory, config.max_entry_size, settled);

        Ok(Self {
            pool,
            array_file,
            hwm_scn: new_lwm,
            lwm_scn: new_lwm,
        })
    }

    fn load_or_create_entries(
        directory: &Path,
        config: &ArrayConfig,
    ) -> Result<Vec<Entry>, EngineError> {
        let mut entries = Vec::with_capacity(config.max_entries);
        for n in 0..config.max_entries {
            let path = directory.join(entry_file_name(n));
            let entry = if path.exists() {
                match Entry::open_existing(&path, config.max_entry_size, EntryState::Recycled) {
                    Ok(e) => e,
                    Err(e) => {
                        log::warn!(
                            "failed to open entry {} during recovery ({e}); starting a fresh one",
                            path.display()
                        );
                        Entry::create(&path, config.max_entry_size)?
                    }
                }
            } else {
                Entry::create(&path, config.max_entry_size)?
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Length (in elements) of the backing array file.
    #[must_use]
    pub fn array_file_length(&self) -> u32 {
        self.array_file.length()
    }

    /// The in-memory accepted (high) water mark.
    #[must_use]
    pub fn hwm_scn(&self) -> u64 {
        self.hwm_scn
    }

    /// The durable (low) water mark, as last written to the ArrayFile header.
    #[must_use]
    pub fn lwm_scn(&self) -> u64 {
        self.lwm_scn
    }

    /// Loads the ArrayFile's contents into `memory`. Caller must have grown
    /// `memory` to `array_file_length()` elements first.
    pub fn load_into(&mut self, memory: &mut memarray::MemoryArray) -> Result<(), EngineError> {
        self.array_file.load(memory)?;
        Ok(())
    }

    /// Grows the backing ArrayFile to `new_length` elements.
    pub fn grow_array_file(&mut self, new_length: u32) -> Result<(), EngineError> {
        self.array_file.set_array_length(new_length)?;
        Ok(())
    }

    /// Appends `(index, value, scn)` to the current Entry, rolling over (and,
    /// if necessary, synchronously applying FULL entries for headroom) as
    /// needed. Advances the in-memory high water mark.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the Entry append or a rollover apply. If
    /// this returns `Err`, the caller's in-memory cell must not be updated.
    pub fn add_record(&mut self, index: u32, value: i64, scn: u64) -> Result<(), EngineError> {
        loop {
            match self.pool.current_mut().append(index, value, scn) {
                Ok(()) => break,
                Err(entrylog::EntryError::Full) => {
                    self.pool.seal_current()?;
                    self.ensure_recycled_slot()?;
                    self.pool.acquire_free();
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.hwm_scn = self.hwm_scn.max(scn);
        Ok(())
    }

    /// Synchronously applies the oldest FULL entries until at least one
    /// RECYCLED slot is available, providing backpressure per the pool's
    /// `OPEN + FULL <= max_entries` invariant. Each inline apply advances the
    /// durable low water mark to that Entry's `max_scn`, the same as a full
    /// `sync` would for that Entry.
    fn ensure_recycled_slot(&mut self) -> Result<(), EngineError> {
        while !self.pool.has_recycled_slot() {
            match self.pool.apply_oldest_full(&mut self.array_file)? {
                Some(applied_scn) => self.advance_durable_lwm(applied_scn)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Advances the durable low water mark to `scn` if it is higher, writing
    /// and fsyncing the new header immediately.
    fn advance_durable_lwm(&mut self, scn: u64) -> Result<(), EngineError> {
        if scn > self.lwm_scn {
            self.lwm_scn = scn;
            let disk_hwm = self.array_file.hwm_scn().max(self.lwm_scn);
            self.array_file.write_water_marks(self.lwm_scn, disk_hwm)?;
        }
        Ok(())
    }

    /// Seals the current Entry (if non-empty), applies and recycles every
    /// FULL entry, and writes `{lwm := hwm, hwm}` to the ArrayFile header,
    /// fsyncing it. Post-condition: `lwm_scn() == hwm_scn()`.
    pub fn sync(&mut self) -> Result<(), EngineError> {
        if !self.pool.current().is_empty() {
            self.pool.seal_current()?;
            self.ensure_recycled_slot()?;
            self.pool.acquire_free();
        }
        self.pool.apply_all_full(&mut self.array_file)?;
        self.array_file.write_water_marks(self.hwm_scn, self.hwm_scn)?;
        self.lwm_scn = self.hwm_scn;
        Ok(())
    }

    /// Synonym of [`sync`](Self::sync); identical external contract.
    pub fn persist(&mut self) -> Result<(), EngineError> {
        self.sync()
    }

    /// Forces both water marks to `(lwm, hwm)`, used by recovery and by
    /// `RecoverableArray::save_hwmark` when rewinding.
    pub fn set_water_marks(&mut self, lwm: u64, hwm: u64) -> Result<(), EngineError> {
        self.array_file.write_water_marks(lwm, hwm)?;
        self.lwm_scn = lwm;
        self.hwm_scn = hwm;
        Ok(())
    }

    /// Recycles every Entry, zeroes the ArrayFile body, and resets both
    /// water marks to zero. Zeroing the body (not just the water marks) is
    /// what keeps a later reopen from replaying stale on-disk element bytes
    /// that predate the clear.
    pub fn clear(&mut self) -> Result<(), EngineError> {
        self.pool.reset_all()?;
        self.array_file.reset()?;
        self.lwm_scn = 0;
        self.hwm_scn = 0;
        Ok(())
    }
}
