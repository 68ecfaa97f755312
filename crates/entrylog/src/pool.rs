//! EntryPool — a bounded set of Entry files plus a free-list.
//!
//! Exactly one Entry is ever `Open` at a time (the "current" entry).
//! Entries that have been sealed but not yet applied sit in `full_entries`,
//! oldest first, waiting for `EntryManager` to apply them to the
//! `ArrayFile`. `Applied` entries are retired back into the free-list via
//! `recycle`, ready to become the next `Open` entry.

use crate::{Entry, EntryError, EntryState};
use std::path::{Path, PathBuf};

/// Filename for entry slot `n` within an array's directory.
pub fn entry_file_name(n: usize) -> String {
    format!("entry_{n}.dat")
}

/// A bounded pool of on-disk Entry segments.
pub struct EntryPool {
    directory: PathBuf,
    slots: Vec<Entry>,
    /// Index into `slots` of the current OPEN entry.
    current: usize,
    /// Indices into `slots` of entries sealed FULL, oldest first.
    full: Vec<usize>,
    max_entries: usize,
    max_entry_size: usize,
}

impl EntryPool {
    /// Creates a fresh pool in `directory`: slot 0 is OPEN, the rest are
    /// freshly-created RECYCLED entries.
    pub fn create<P: AsRef<Path>>(
        directory: P,
        max_entries: usize,
        max_entry_size: usize,
    ) -> Result<Self, EntryError> {
        let directory = directory.as_ref().to_path_buf();
        let mut slots = Vec::with_capacity(max_entries);

        let first_path = directory.join(entry_file_name(0));
        slots.push(Entry::create(&first_path, max_entry_size)?);

        for n in 1..max_entries {
            let path = directory.join(entry_file_name(n));
            let mut e = Entry::create(&path, max_entry_size)?;
            e.recycle()?;
            slots.push(e);
        }

        Ok(Self {
            directory,
            slots,
            current: 0,
            full: Vec::new(),
            max_entries,
            max_entry_size,
        })
    }

    /// Builds a pool directly from a set of Entries that have all already
    /// been recycled (the state recovery leaves them in after replay).
    /// Slot 0 becomes the new OPEN entry.
    ///
    /// # Panics
    ///
    /// Panics if `entries` is empty.
    pub fn from_recycled<P: AsRef<Path>>(
        directory: P,
        max_entry_size: usize,
        mut entries: Vec<Entry>,
    ) -> Self {
        assert!(!entries.is_empty(), "EntryPool requires at least one slot");
        entries[0].reopen_as_open();
        let max_entries = entries.len();
        Self {
            directory: directory.as_ref().to_path_buf(),
            slots: entries,
            current: 0,
            full: Vec::new(),
            max_entries,
            max_entry_size,
        }
    }

    /// The directory this pool's Entry files live in.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Maximum records a single Entry in this pool may hold.
    #[must_use]
    pub fn max_entry_size(&self) -> usize {
        self.max_entry_size
    }

    /// The current OPEN entry.
    pub fn current(&self) -> &Entry {
        &self.slots[self.current]
    }

    /// The current OPEN entry, mutably.
    pub fn current_mut(&mut self) -> &mut Entry {
        &mut self.slots[self.current]
    }

    /// Number of entries currently sealed FULL and awaiting apply.
    #[must_use]
    pub fn full_count(&self) -> usize {
        self.full.len()
    }

    /// Total Entry slots in the pool (always `max_entries`).
    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Seals the current OPEN entry as FULL and moves it to the back of the
    /// `full` queue.
    pub fn seal_current(&mut self) -> Result<(), EntryError> {
        self.slots[self.current].seal()?;
        self.full.push(self.current);
        Ok(())
    }

    /// Finds a RECYCLED slot, reopens it as the new OPEN entry, and returns
    /// its index. This is the only way `self.current` changes.
    ///
    /// # Panics
    ///
    /// Panics if no RECYCLED slot exists — the caller (`EntryManager`) must
    /// guarantee headroom by applying FULL entries first, per the pool's
    /// `OPEN + FULL <= max_entries` invariant.
    pub fn acquire_free(&mut self) -> usize {
        let idx = self
            .slots
            .iter()
            .position(|e| e.state() == EntryState::Recycled)
            .expect("EntryPool invariant violated: no recycled slot available for rollover");
        self.slots[idx].reopen_as_open();
        self.current = idx;
        idx
    }

    /// The oldest FULL entry's slot index, if any.
    #[must_use]
    pub fn oldest_full(&self) -> Option<usize> {
        self.full.first().copied()
    }

    /// Applies and recycles the oldest FULL entry against `array_file`,
    /// returning the SCN it advanced the durable water mark to.
    pub fn apply_oldest_full(
        &mut self,
        array_file: &mut arrayfile::ArrayFile,
    ) -> Result<Option<u64>, EntryError> {
        let Some(idx) = self.full.first().copied() else {
            return Ok(None);
        };
        let max_scn = self.slots[idx].apply(array_file)?;
        self.slots[idx].recycle()?;
        self.full.remove(0);
        Ok(Some(max_scn))
    }

    /// Applies and recycles every FULL entry, in order, against
    /// `array_file`. Returns the highest SCN applied, if any entry had
    /// records.
    pub fn apply_all_full(
        &mut self,
        array_file: &mut arrayfile::ArrayFile,
    ) -> Result<Option<u64>, EntryError> {
        let mut max_scn = None;
        while let Some(scn) = self.apply_oldest_full(array_file)? {
            max_scn = Some(scn);
        }
        Ok(max_scn)
    }

    /// `true` if at least one slot is RECYCLED and ready for `acquire_free`.
    #[must_use]
    pub fn has_recycled_slot(&self) -> bool {
        self.slots.iter().any(|e| e.state() == EntryState::Recycled)
    }

    /// Recycles every slot regardless of its current state and reopens slot
    /// 0 as the new OPEN entry. Used by a full pool reset (`clear`).
    pub fn reset_all(&mut self) -> Result<(), EntryError> {
        for e in self.slots.iter_mut() {
            e.recycle()?;
        }
        self.full.clear();
        self.current = 0;
        self.slots[0].reopen_as_open();
        Ok(())
    }

    /// Borrows every slot for inspection (used by tests and diagnostics).
    pub fn slots(&self) -> &[Entry] {
        &self.slots
    }
}
