//! # ArrayFile
//!
//! The on-disk backing store for a recoverable primitive array: a 40-byte
//! header (see [`format`]) followed by a dense vector of fixed-width
//! elements. Unlike an immutable SSTable, an `ArrayFile` is mutated in
//! place — callers overwrite individual elements and occasionally grow or
//! shrink the array; nothing here is append-only or rewritten wholesale
//! except the water-mark header.
//!
//! ## Crash safety
//!
//! `put`/`put_bulk` perform no `fsync`; callers (the `EntryManager`) batch
//! many element writes and only call [`ArrayFile::flush`] once per batch.
//! [`ArrayFile::write_water_marks`] always fsyncs, since a caller observing
//! a new water mark must be able to trust it survives a crash. A crash
//! between element writes and a water-mark write leaves a file with a
//! consistent (but possibly stale) prefix and an older water mark — the
//! gap is recovered from surviving Entry files, not from this crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use arrayfile::ArrayFile;
//! use config::ElementWidth;
//!
//! let mut f = ArrayFile::create("indexes.dat", 0, ElementWidth::Long).unwrap();
//! f.set_array_length(16).unwrap();
//! f.put(5, 500).unwrap();
//! f.flush().unwrap();
//! f.write_water_marks(0, 1).unwrap();
//! ```

pub mod format;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use config::ElementWidth;
use format::{ArrayFileHeader, HEADER_BYTES};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

/// Errors produced by [`ArrayFile`] operations.
#[derive(Debug, Error)]
pub enum ArrayFileError {
    /// An underlying I/O failure. Propagate.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The header's magic, version, or element width did not parse.
    /// Fatal: the caller must not continue opening this file.
    #[error("corrupt ArrayFile header: {0}")]
    CorruptHeader(String),
}

/// The on-disk array: header + dense element vector.
pub struct ArrayFile {
    file: File,
    header: ArrayFileHeader,
}

impl ArrayFile {
    /// Creates a new ArrayFile at `path`, sized for `length` elements of
    /// `element_width`. The header is initialized with `lwm_scn = hwm_scn =
    /// 0`; the body is zero-filled.
    pub fn create<P: AsRef<Path>>(
        path: P,
        length: u32,
        element_width: ElementWidth,
    ) -> Result<Self, ArrayFileError> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)?;

        let header = ArrayFileHeader::new(element_width, length);
        header.write_to(&mut file)?;

        let body_bytes = (length as u64) * (element_width.byte_size() as u64);
        file.set_len(HEADER_BYTES + body_bytes)?;
        file.flush()?;

        Ok(Self { file, header })
    }

    /// Opens an existing ArrayFile, validating its header.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayFileError::CorruptHeader`] if the magic, version, or
    /// element width field does not parse.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArrayFileError> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        file.seek(SeekFrom::Start(0))?;
        let header = ArrayFileHeader::read_from(&mut file)
            .map_err(|e| ArrayFileError::CorruptHeader(e.to_string()))?;
        Ok(Self { file, header })
    }

    /// The element width this file was created with.
    #[must_use]
    pub fn element_width(&self) -> ElementWidth {
        self.header.element_width
    }

    /// The current array length, in elements.
    #[must_use]
    pub fn length(&self) -> u32 {
        self.header.length
    }

    /// The durable water mark last written to the header.
    #[must_use]
    pub fn lwm_scn(&self) -> u64 {
        self.header.lwm_scn
    }

    /// The accepted water mark last written to the header.
    #[must_use]
    pub fn hwm_scn(&self) -> u64 {
        self.header.hwm_scn
    }

    fn element_offset(&self, index: u32) -> u64 {
        HEADER_BYTES + (index as u64) * (self.header.element_width.byte_size() as u64)
    }

    /// Copies the file body into `dest`, which must already be expanded to
    /// exactly `length()` elements. Used during `open()`-time recovery to
    /// bulk-load the on-disk array into the in-memory segmented view.
    ///
    /// # Panics
    ///
    /// Panics if `dest.length() != self.length()`.
    pub fn load(&mut self, dest: &mut memarray::MemoryArray) -> Result<(), ArrayFileError> {
        assert_eq!(
            dest.length(),
            self.length(),
            "destination MemoryArray length must match ArrayFile length before load()"
        );
        self.file.seek(SeekFrom::Start(HEADER_BYTES))?;
        let width = self.header.element_width;
        for index in 0..self.header.length {
            let value = match width {
                ElementWidth::Long => self.file.read_i64::<BigEndian>()?,
                ElementWidth::Int => self.file.read_i32::<BigEndian>()? as i64,
            };
            dest.set(index, value);
        }
        Ok(())
    }

    /// Overwrites the element at `index` with `value`. Performs no `fsync`;
    /// callers batch writes and call [`flush`](Self::flush) once per batch.
    ///
    /// `value` is truncated to 32 bits when the file's element width is
    /// [`ElementWidth::Int`].
    pub fn put(&mut self, index: u32, value: i64) -> Result<(), ArrayFileError> {
        let offset = self.element_offset(index);
        self.file.seek(SeekFrom::Start(offset))?;
        match self.header.element_width {
            ElementWidth::Long => self.file.write_i64::<BigEndian>(value)?,
            ElementWidth::Int => self.file.write_i32::<BigEndian>(value as i32)?,
        }
        Ok(())
    }

    /// Applies an ordered batch of `(index, value)` pairs.
    ///
    /// Records are applied in the order given; if the same index appears
    /// more than once, the last value for that index wins — exactly as if
    /// `put` had been called once per record in order. No `fsync` is
    /// performed; the caller is expected to call [`flush`](Self::flush)
    /// after the batch.
    pub fn put_bulk(&mut self, records: &[(u32, i64)]) -> Result<(), ArrayFileError> {
        for &(index, value) in records {
            self.put(index, value)?;
        }
        Ok(())
    }

    /// Grows or shrinks the array to `new_length` elements.
    ///
    /// Growing zero-fills the new tail. The new length is written to the
    /// header and fsynced before this call returns, so callers can rely on
    /// the new length being durable immediately.
    pub fn set_array_length(&mut self, new_length: u32) -> Result<(), ArrayFileError> {
        let width = self.header.element_width.byte_size() as u64;
        let new_size = HEADER_BYTES + (new_length as u64) * width;
        let old_length = self.header.length;

        self.file.set_len(new_size)?;

        if new_length > old_length {
            // Zero-fill the newly extended tail explicitly; relying on
            // set_len's implicit zero-fill is filesystem-dependent.
            self.file.seek(SeekFrom::Start(
                HEADER_BYTES + (old_length as u64) * width,
            ))?;
            let tail_elements = (new_length - old_length) as usize;
            let zeros = vec![0u8; width as usize];
            for _ in 0..tail_elements {
                self.file.write_all(&zeros)?;
            }
        }

        self.header.length = new_length;
        self.file.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.file)?;
        self.file.sync_all()?;
        debug!(
            "ArrayFile length changed {} -> {} (durable)",
            old_length, new_length
        );
        Ok(())
    }

    /// Updates the header's water marks and fsyncs. After this call
    /// returns, the header and all bytes up to the committed prefix are
    /// durable.
    pub fn write_water_marks(&mut self, lwm: u64, hwm: u64) -> Result<(), ArrayFileError> {
        self.header.lwm_scn = lwm;
        self.header.hwm_scn = hwm;
        self.file.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.file)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Fsyncs file data and metadata.
    pub fn flush(&mut self) -> Result<(), ArrayFileError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Zeroes every element and resets both water marks to zero, without
    /// changing `length()`. Used by `clear()` so a subsequent reopen cannot
    /// resurrect stale element bytes from before the clear.
    pub fn reset(&mut self) -> Result<(), ArrayFileError> {
        self.file.seek(SeekFrom::Start(HEADER_BYTES))?;
        let width = self.header.element_width.byte_size() as u64;
        let body_bytes = (self.header.length as u64) * width;
        let zeros = vec![0u8; 64 * 1024];
        let mut remaining = body_bytes;
        while remaining > 0 {
            let chunk = remaining.min(zeros.len() as u64) as usize;
            self.file.write_all(&zeros[..chunk])?;
            remaining -= chunk as u64;
        }
        self.header.lwm_scn = 0;
        self.header.hwm_scn = 0;
        self.file.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.file)?;
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
