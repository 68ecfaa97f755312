//! ArrayFile binary header format — bit-exact, big-endian.
//!
//! ## Header (40 bytes)
//!
//! ```text
//! [magic: u32 BE][version: u32 BE][element_width: u32 BE][reserved: u32 BE]
//! [lwm_scn: u64 BE][hwm_scn: u64 BE][length: u32 BE][reserved: u32 BE]
//! ```
//!
//! Element `i` lives at byte offset `HEADER_BYTES + i * element_width`.
//! All integers are big-endian, matching the reference wire format this
//! engine is interoperable with.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use config::ElementWidth;
use std::io::{self, Read, Write};

/// Magic number identifying an ArrayFile (ASCII "KRAT").
pub const ARRAY_FILE_MAGIC: u32 = 0x4B52_4154;

/// Current on-disk header version.
pub const ARRAY_FILE_VERSION: u32 = 1;

/// Size of the header in bytes.
pub const HEADER_BYTES: u64 = 40;

/// The parsed ArrayFile header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayFileHeader {
    pub version: u32,
    pub element_width: ElementWidth,
    pub lwm_scn: u64,
    pub hwm_scn: u64,
    pub length: u32,
}

impl ArrayFileHeader {
    /// Builds a fresh header for a newly created array: water marks at zero.
    pub fn new(element_width: ElementWidth, length: u32) -> Self {
        Self {
            version: ARRAY_FILE_VERSION,
            element_width,
            lwm_scn: 0,
            hwm_scn: 0,
            length,
        }
    }

    /// Writes the 40-byte header to `w`, big-endian.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(ARRAY_FILE_MAGIC)?;
        w.write_u32::<BigEndian>(self.version)?;
        w.write_u32::<BigEndian>(self.element_width.byte_size() as u32)?;
        w.write_u32::<BigEndian>(0)?; // reserved
        w.write_u64::<BigEndian>(self.lwm_scn)?;
        w.write_u64::<BigEndian>(self.hwm_scn)?;
        w.write_u32::<BigEndian>(self.length)?;
        w.write_u32::<BigEndian>(0)?; // reserved
        Ok(())
    }

    /// Reads and validates a 40-byte header from `r`.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidData` io::Error if the magic doesn't match, the
    /// version is unrecognized, or the element width is neither 4 nor 8.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let magic = r.read_u32::<BigEndian>()?;
        if magic != ARRAY_FILE_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad ArrayFile magic: {magic:#x}"),
            ));
        }
        let version = r.read_u32::<BigEndian>()?;
        if version != ARRAY_FILE_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported ArrayFile version: {version}"),
            ));
        }
        let width_bytes = r.read_u32::<BigEndian>()?;
        let element_width = ElementWidth::from_byte_size(width_bytes).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad element width: {width_bytes}"),
            )
        })?;
        let _reserved = r.read_u32::<BigEndian>()?;
        let lwm_scn = r.read_u64::<BigEndian>()?;
        let hwm_scn = r.read_u64::<BigEndian>()?;
        let length = r.read_u32::<BigEndian>()?;
        let _reserved = r.read_u32::<BigEndian>()?;
        Ok(Self {
            version,
            element_width,
            lwm_scn,
            hwm_scn,
            length,
        })
    }
}
