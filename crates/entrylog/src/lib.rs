//! # Entry — bounded append-only log segment
//!
//! Provides crash-safe absorption of writes for a recoverable array. Every
//! mutation is appended as a fixed-width record to the currently OPEN
//! [`Entry`]; once applied to the backing [`arrayfile::ArrayFile`], an Entry
//! is recycled and reused by the [`pool::EntryPool`] that owns it.
//!
//! ## Binary Record Format (20 bytes, big-endian)
//!
//! ```text
//! [index: u32 BE][value: i64 BE][scn: u64 BE]
//! ```
//!
//! Records are always 64-bit-valued regardless of the array's element
//! width — narrowing to 32 bits happens only at the `ArrayFile` boundary.
//!
//! ## Header Format (28 bytes, big-endian)
//!
//! ```text
//! [magic: u32 BE][version: u32 BE][kind: u32 BE][record_count: u32 BE]
//! [min_scn: u64 BE][max_scn: u64 BE]
//! ```
//!
//! The header is a bookkeeping summary refreshed on every append; it is
//! **not** the source of truth during recovery. A crash can leave the
//! header stale relative to bytes already on disk, so recovery (in
//! `krati-engine`) scans the record bytes directly, the same way the
//! reference WAL design treats a truncated tail record as a clean stopping
//! point rather than trusting a length field that might itself be stale.

pub mod pool;

use arrayfile::ArrayFile;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Magic number identifying an Entry file (ASCII "ENTR").
pub const ENTRY_MAGIC: u32 = 0x454E_5452;
/// Current on-disk Entry header version.
pub const ENTRY_VERSION: u32 = 1;
/// Size of the Entry header in bytes.
pub const ENTRY_HEADER_BYTES: u64 = 28;
/// Size of one packed Entry record in bytes.
pub const ENTRY_RECORD_BYTES: u64 = 20;

/// The kind of payload an Entry's records carry.
///
/// `LongCompaction` is part of the on-disk format for forward compatibility
/// with a merged/compacted entry kind; this engine only ever writes `Long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Plain append-order records (the only kind this engine writes).
    Long,
    /// Reserved for a future compacted representation.
    LongCompaction,
}

impl EntryKind {
    fn as_u32(self) -> u32 {
        match self {
            EntryKind::Long => 0,
            EntryKind::LongCompaction => 1,
        }
    }

    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(EntryKind::Long),
            1 => Some(EntryKind::LongCompaction),
            _ => None,
        }
    }
}

/// A single Entry record: one `set(index, value, scn)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRecord {
    pub index: u32,
    pub value: i64,
    pub scn: u64,
}

impl EntryRecord {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(self.index)?;
        w.write_i64::<BigEndian>(self.value)?;
        w.write_u64::<BigEndian>(self.scn)?;
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let index = r.read_u32::<BigEndian>()?;
        let value = r.read_i64::<BigEndian>()?;
        let scn = r.read_u64::<BigEndian>()?;
        Ok(Self { index, value, scn })
    }
}

/// Lifecycle state of an Entry within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// The single writable Entry; accepts `append`.
    Open,
    /// Sealed, awaiting `apply`.
    Full,
    /// Applied to the ArrayFile; awaiting `recycle`.
    Applied,
    /// Truncated and ready to be reused as the next OPEN entry.
    Recycled,
}

#[derive(Debug, Clone, Copy)]
struct EntryHeader {
    kind: EntryKind,
    record_count: u32,
    min_scn: u64,
    max_scn: u64,
}

impl EntryHeader {
    fn empty() -> Self {
        Self {
            kind: EntryKind::Long,
            record_count: 0,
            min_scn: 0,
            max_scn: 0,
        }
    }

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(ENTRY_MAGIC)?;
        w.write_u32::<BigEndian>(ENTRY_VERSION)?;
        w.write_u32::<BigEndian>(self.kind.as_u32())?;
        w.write_u32::<BigEndian>(self.record_count)?;
        w.write_u64::<BigEndian>(self.min_scn)?;
        w.write_u64::<BigEndian>(self.max_scn)?;
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let magic = r.read_u32::<BigEndian>()?;
        if magic != ENTRY_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad Entry magic: {magic:#x}"),
            ));
        }
        let _version = r.read_u32::<BigEndian>()?;
        let kind_raw = r.read_u32::<BigEndian>()?;
        let kind = EntryKind::from_u32(kind_raw).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("bad Entry kind: {kind_raw}"))
        })?;
        let record_count = r.read_u32::<BigEndian>()?;
        let min_scn = r.read_u64::<BigEndian>()?;
        let max_scn = r.read_u64::<BigEndian>()?;
        Ok(Self {
            kind,
            record_count,
            min_scn,
            max_scn,
        })
    }
}

/// Errors produced by [`Entry`] operations.
#[derive(Debug, Error)]
pub enum EntryError {
    /// An underlying I/O failure. Propagate.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The Entry header failed to parse. Returned by `open_existing`;
    /// recovery treats it leniently by logging and substituting a fresh
    /// Entry rather than aborting `open()` of the whole array.
    #[error("corrupt entry header: {0}")]
    CorruptHeader(String),

    /// Internal only: the current Entry cannot accept another record.
    /// Callers roll to a fresh Entry and retry; this never escapes
    /// `krati-engine`'s public API.
    #[error("entry is full")]
    Full,
}

/// One bounded append-only log segment.
pub struct Entry {
    file: File,
    path: PathBuf,
    header: EntryHeader,
    state: EntryState,
    max_entry_size: usize,
}

impl Entry {
    /// Creates a brand-new, empty, OPEN Entry file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, max_entry_size: usize) -> Result<Self, EntryError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)?;
        let header = EntryHeader::empty();
        header.write_to(&mut file)?;
        file.set_len(ENTRY_HEADER_BYTES)?;
        file.flush()?;
        Ok(Self {
            file,
            path,
            header,
            state: EntryState::Open,
            max_entry_size,
        })
    }

    /// Opens an existing Entry file, assigning it `state` (the caller — the
    /// pool during recovery — decides FULL vs RECYCLED vs OPEN based on the
    /// scanned SCN range, not on anything stored in the header itself).
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::CorruptHeader`] if the header fails to parse.
    /// The caller (`EntryManager`'s recovery path) is expected to log and
    /// substitute a fresh Entry rather than abort `open()` of the whole
    /// array, matching the `CorruptEntry` policy of skipping unusable state
    /// and proceeding.
    pub fn open_existing<P: AsRef<Path>>(
        path: P,
        max_entry_size: usize,
        state: EntryState,
    ) -> Result<Self, EntryError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        file.seek(SeekFrom::Start(0))?;
        let header = EntryHeader::read_from(&mut file)
            .map_err(|e| EntryError::CorruptHeader(format!("{}: {e}", path.display())))?;
        Ok(Self {
            file,
            path,
            header,
            state,
            max_entry_size,
        })
    }

    /// This Entry's path on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.record_count as usize
    }

    /// `true` if no records have been appended since creation or recycle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.record_count == 0
    }

    /// Lowest SCN appended since creation or recycle. `0` if empty.
    #[must_use]
    pub fn min_scn(&self) -> u64 {
        self.header.min_scn
    }

    /// Highest SCN appended since creation or recycle. `0` if empty.
    #[must_use]
    pub fn max_scn(&self) -> u64 {
        self.header.max_scn
    }

    /// Appends a record, requiring `scn >= max_scn()` of an already
    /// non-empty Entry (callers supplying a lower SCN are a documented
    /// hazard per the array's SCN contract, not rejected here).
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::Full`] once `len() == max_entry_size`; the
    /// caller (`EntryManager`) rolls to a fresh Entry and retries.
    pub fn append(&mut self, index: u32, value: i64, scn: u64) -> Result<(), EntryError> {
        debug_assert_eq!(self.state, EntryState::Open, "append on a non-OPEN entry");
        if self.header.record_count as usize == self.max_entry_size {
            return Err(EntryError::Full);
        }

        let offset = ENTRY_HEADER_BYTES + (self.header.record_count as u64) * ENTRY_RECORD_BYTES;
        self.file.seek(SeekFrom::Start(offset))?;
        EntryRecord { index, value, scn }.write_to(&mut self.file)?;

        if self.header.record_count == 0 {
            self.header.min_scn = scn;
        }
        self.header.max_scn = scn;
        self.header.record_count += 1;

        self.file.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.file)?;

        Ok(())
    }

    /// Fsyncs the Entry file.
    pub fn flush(&mut self) -> Result<(), EntryError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Seals an OPEN Entry as FULL. Flushes so the sealed content is
    /// durable before the caller starts writing to a new Entry.
    pub fn seal(&mut self) -> Result<(), EntryError> {
        self.state = EntryState::Full;
        self.flush()
    }

    /// Reads every record currently on disk, in append order.
    ///
    /// Scans the record bytes directly rather than trusting
    /// `header.record_count` — a truncated tail record (fewer than 20
    /// bytes remaining) is treated as a clean stopping point, the same
    /// tolerance the reference WAL design applies to a crash mid-append.
    pub fn records(&mut self) -> Result<Vec<EntryRecord>, EntryError> {
        self.file.seek(SeekFrom::Start(ENTRY_HEADER_BYTES))?;
        let mut out = Vec::with_capacity(self.header.record_count as usize);
        loop {
            let mut buf = [0u8; ENTRY_RECORD_BYTES as usize];
            let mut read = 0usize;
            while read < buf.len() {
                match self.file.read(&mut buf[read..])? {
                    0 => break,
                    n => read += n,
                }
            }
            if read == 0 {
                break; // clean EOF
            }
            if read < buf.len() {
                log::warn!(
                    "entry {} has a truncated tail record ({read} of {} bytes); stopping replay here",
                    self.path.display(),
                    buf.len()
                );
                break;
            }
            out.push(EntryRecord::read_from(&mut &buf[..])?);
        }
        Ok(out)
    }

    /// Applies every record to `array_file`, in order, then fsyncs it.
    ///
    /// Returns the highest SCN applied (`0` if this Entry was empty) so the
    /// caller can advance the array's durable water mark. Transitions this
    /// Entry to `Applied` — the caller is responsible for the subsequent
    /// `recycle()`.
    pub fn apply(&mut self, array_file: &mut ArrayFile) -> Result<u64, EntryError> {
        let records = self.records()?;
        let batch: Vec<(u32, i64)> = records.iter().map(|r| (r.index, r.value)).collect();
        array_file.put_bulk(&batch)?;
        array_file.flush()?;
        let max_scn = records.last().map(|r| r.scn).unwrap_or(self.header.max_scn);
        self.state = EntryState::Applied;
        debug!(
            "applied {} records from {} (max_scn={})",
            records.len(),
            self.path.display(),
            max_scn
        );
        Ok(max_scn)
    }

    /// Truncates the Entry back to an empty header and marks it `Recycled`,
    /// ready to be handed out by `EntryPool::acquire_free` as the next OPEN
    /// entry.
    pub fn recycle(&mut self) -> Result<(), EntryError> {
        self.header = EntryHeader::empty();
        self.file.set_len(ENTRY_HEADER_BYTES)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.file)?;
        self.file.flush()?;
        self.state = EntryState::Recycled;
        Ok(())
    }

    /// Reopens a `Recycled` Entry as the new `Open` entry. Called only by
    /// `EntryPool::acquire_free`.
    pub(crate) fn reopen_as_open(&mut self) {
        debug_assert_eq!(self.state, EntryState::Recycled);
        self.state = EntryState::Open;
    }
}
