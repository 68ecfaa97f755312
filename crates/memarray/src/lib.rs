//! # MemoryArray
//!
//! The in-memory segmented view backing a recoverable array: a vector of
//! fixed-size sub-arrays, each `1 << sub_array_bits` elements long. A read at
//! index `i` resolves to `segments[i >> bits][i & mask]`.
//!
//! ## Key properties
//! - **O(1) access**: index arithmetic only, no search.
//! - **Segments never move**: each sub-array is a `Box<[i64]>` allocated once
//!   and never reallocated. A caller holding a reference into one segment
//!   keeps a valid reference across concurrent growth of the segment list —
//!   this is the invariant that permits lock-free reads.
//! - **Growth-only**: `expand_capacity` appends zero-filled segments; it
//!   never removes or shrinks them.
//! - **One-slot growth listener**: set at construction, not a generic event
//!   bus, so the owning façade can keep its on-disk ArrayFile length in
//!   lock-step with in-memory growth.
//!
//! ## Example
//! ```rust
//! use memarray::MemoryArray;
//!
//! let mut m = MemoryArray::new(4); // sub-array size = 1 << 4 = 16
//! assert_eq!(m.get(0), 0);
//! m.expand_capacity(20);
//! m.set(20, 42);
//! assert_eq!(m.get(20), 42);
//! assert_eq!(m.length(), 32); // two 16-element segments
//! ```

/// One fixed-size chunk of the segmented array.
type Segment = Box<[i64]>;

/// An ordered list of fixed-size sub-arrays forming one logically dense
/// array of `i64` cells. Narrower element widths are handled by the caller
/// at the `ArrayFile` boundary; `MemoryArray` itself is always 64-bit wide.
pub struct MemoryArray {
    segments: Vec<Segment>,
    sub_array_bits: u32,
    sub_array_mask: usize,
    /// One-slot growth observer, invoked with the new logical length after
    /// every successful expansion. `None` until the owning façade wires it
    /// up at construction time.
    listener: Option<Box<dyn FnMut(u32) + Send>>,
}

impl MemoryArray {
    /// Creates an empty `MemoryArray` with sub-arrays of `1 << sub_array_bits`
    /// elements. No segments are allocated until the first `expand_capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `sub_array_bits` is 0 or greater than 31 (mirrors
    /// `config::ConfigError::InvalidSubArrayBits`, which callers are expected
    /// to have already checked).
    pub fn new(sub_array_bits: u32) -> Self {
        assert!(
            sub_array_bits > 0 && sub_array_bits <= 31,
            "sub_array_bits must be in 1..=31, got {sub_array_bits}"
        );
        Self {
            segments: Vec::new(),
            sub_array_bits,
            sub_array_mask: (1usize << sub_array_bits) - 1,
            listener: None,
        }
    }

    /// Registers the one-slot growth listener, replacing any previous one.
    pub fn set_listener<F>(&mut self, listener: F)
    where
        F: FnMut(u32) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    /// Number of elements per sub-array.
    #[must_use]
    pub fn sub_array_size(&self) -> usize {
        self.sub_array_mask + 1
    }

    /// Current logical length: `segments.len() << sub_array_bits`.
    #[must_use]
    pub fn length(&self) -> u32 {
        (self.segments.len() << self.sub_array_bits) as u32
    }

    /// Reads the value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= length()`. Reading past the current length is a
    /// programming error here — the façade is responsible for auto-expanding
    /// on writes and for bounds-checking reads against the caller-visible
    /// length before calling in.
    pub fn get(&self, index: u32) -> i64 {
        let (seg, off) = self.locate(index);
        self.segments[seg][off]
    }

    /// Writes `value` at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= length()`.
    pub fn set(&mut self, index: u32, value: i64) {
        let (seg, off) = self.locate(index);
        self.segments[seg][off] = value;
    }

    fn locate(&self, index: u32) -> (usize, usize) {
        let index = index as usize;
        (index >> self.sub_array_bits, index & self.sub_array_mask)
    }

    /// Grows the segment list, if necessary, so that `index` is addressable.
    ///
    /// Allocates zero-filled segments; never shrinks. Existing segments are
    /// left untouched and unmoved. Invokes the growth listener (if any) with
    /// the new length once growth completes. A no-op if `index` is already
    /// within the current length.
    pub fn expand_capacity(&mut self, index: u32) {
        let needed_segment = (index as usize) >> self.sub_array_bits;
        if needed_segment < self.segments.len() {
            return;
        }
        let sub_array_size = self.sub_array_size();
        while self.segments.len() <= needed_segment {
            self.segments.push(vec![0i64; sub_array_size].into_boxed_slice());
        }
        let new_length = self.length();
        if let Some(listener) = self.listener.as_mut() {
            listener(new_length);
        }
    }

    /// Zeroes every cell in every allocated segment. The segment count (and
    /// therefore `length()`) is unchanged.
    pub fn clear(&mut self) {
        for segment in &mut self.segments {
            segment.fill(0);
        }
    }
}

#[cfg(test)]
mod tests;
