//! # Config
//!
//! Recognized configuration parameters for a Krati-style recoverable array,
//! plus the fixed-width [`ElementWidth`] choice that the array's on-disk
//! format is built around.
//!
//! There is no external config-file format here (no `serde`, no `toml`):
//! every other crate in this workspace takes its settings as plain
//! constructor arguments, and `cli` follows the same convention via
//! environment variables. `ArrayConfig` exists purely to collect those
//! arguments in one place and validate them before anything touches disk.

use thiserror::Error;

/// The fixed element width an array is opened with. Uniform for the array's
/// lifetime; there is no way to widen or narrow an existing array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementWidth {
    /// 32-bit signed integer elements.
    Int,
    /// 64-bit signed integer elements.
    Long,
}

impl ElementWidth {
    /// Size of one element in bytes.
    #[must_use]
    pub fn byte_size(self) -> usize {
        match self {
            ElementWidth::Int => 4,
            ElementWidth::Long => 8,
        }
    }

    /// Decodes the on-disk header's `element_width` field (4 or 8).
    pub fn from_byte_size(size: u32) -> Option<Self> {
        match size {
            4 => Some(ElementWidth::Int),
            8 => Some(ElementWidth::Long),
            _ => None,
        }
    }
}

/// Errors produced validating an [`ArrayConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `sub_array_bits` was 0 or large enough that `1 << bits` would not fit
    /// a `u32` index space.
    #[error("sub_array_bits must be in 1..=31, got {0}")]
    InvalidSubArrayBits(u32),

    /// `max_entry_size` was 0 (an Entry that can never hold a record).
    #[error("max_entry_size must be > 0")]
    InvalidMaxEntrySize,

    /// `max_entries` was 0 (a pool with no room for an OPEN entry).
    #[error("max_entries must be > 0")]
    InvalidMaxEntries,
}

/// The recognized configuration parameters for a recoverable array.
///
/// Typical values (matching the reference implementation this design is
/// modeled on): `sub_array_bits = 16`, `max_entry_size = 10_000`,
/// `max_entries = 5`.
#[derive(Debug, Clone)]
pub struct ArrayConfig {
    /// Sub-array size is `1 << sub_array_bits` elements.
    pub sub_array_bits: u32,
    /// Maximum number of records a single Entry may hold before rolling over.
    pub max_entry_size: usize,
    /// Maximum number of Entry files kept in the pool at once.
    pub max_entries: usize,
    /// Element width: 4 bytes (`Int`) or 8 bytes (`Long`).
    pub element_width: ElementWidth,
    /// Directory holding `indexes.dat` and the `entry_<N>.dat` files.
    pub directory: std::path::PathBuf,
}

impl ArrayConfig {
    /// Starts a config with the reference defaults, rooted at `directory`.
    pub fn new<P: Into<std::path::PathBuf>>(directory: P) -> Self {
        Self {
            sub_array_bits: 16,
            max_entry_size: 10_000,
            max_entries: 5,
            element_width: ElementWidth::Long,
            directory: directory.into(),
        }
    }

    /// Sets the sub-array size exponent. Builder-style.
    #[must_use]
    pub fn with_sub_array_bits(mut self, bits: u32) -> Self {
        self.sub_array_bits = bits;
        self
    }

    /// Sets the per-Entry record cap. Builder-style.
    #[must_use]
    pub fn with_max_entry_size(mut self, max_entry_size: usize) -> Self {
        self.max_entry_size = max_entry_size;
        self
    }

    /// Sets the Entry pool size. Builder-style.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the element width. Builder-style.
    #[must_use]
    pub fn with_element_width(mut self, width: ElementWidth) -> Self {
        self.element_width = width;
        self
    }

    /// Validates the parameters, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sub_array_bits == 0 || self.sub_array_bits > 31 {
            return Err(ConfigError::InvalidSubArrayBits(self.sub_array_bits));
        }
        if self.max_entry_size == 0 {
            return Err(ConfigError::InvalidMaxEntrySize);
        }
        if self.max_entries == 0 {
            return Err(ConfigError::InvalidMaxEntries);
        }
        Ok(())
    }

    /// Number of elements per sub-array: `1 << sub_array_bits`.
    #[must_use]
    pub fn sub_array_size(&self) -> usize {
        1usize << self.sub_array_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ArrayConfig::new("/tmp/krati");
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sub_array_size(), 1 << 16);
    }

    #[test]
    fn rejects_zero_sub_array_bits() {
        let cfg = ArrayConfig::new("/tmp/krati").with_sub_array_bits(0);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidSubArrayBits(0))
        );
    }

    #[test]
    fn rejects_zero_max_entry_size() {
        let cfg = ArrayConfig::new("/tmp/krati").with_max_entry_size(0);
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidMaxEntrySize));
    }

    #[test]
    fn rejects_zero_max_entries() {
        let cfg = ArrayConfig::new("/tmp/krati").with_max_entries(0);
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidMaxEntries));
    }

    #[test]
    fn element_width_round_trips_byte_size() {
        assert_eq!(ElementWidth::from_byte_size(4), Some(ElementWidth::Int));
        assert_eq!(ElementWidth::from_byte_size(8), Some(ElementWidth::Long));
        assert_eq!(ElementWidth::from_byte_size(5), None);
        assert_eq!(ElementWidth::Int.byte_size(), 4);
        assert_eq!(ElementWidth::Long.byte_size(), 8);
    }
}
