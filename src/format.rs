//! Kernel blob format types and constants.
//!
//! A merged blob is a 64-byte directory header, each kernel's bytes padded to a
//! 64-byte boundary, and a fixed 128-byte zero trailer. All multi-byte fields are
//! little-endian 32-bit integers.

/// Size of the directory header in bytes. The first entry always starts here.
pub const HEADER_SIZE: usize = 64;

/// Every entry starts on a multiple of this.
pub const ENTRY_ALIGNMENT: usize = 64;

/// Maximum number of directory slots the consumer understands.
pub const MAX_ENTRIES: usize = 15;

/// Zero bytes appended after the last entry's padding.
pub const TRAILER_SIZE: usize = 128;

/// Width of the count field and of each offset slot in the header.
pub const FIELD_SIZE: usize = 4;

/// Largest offset or blob size representable in the header's signed 32-bit fields.
pub const MAX_BLOB_SIZE: u64 = i32::MAX as u64;

/// One compiled kernel: a name for diagnostics plus its raw bytes.
///
/// The name is never written to the blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelEntry {
    /// Identifier used in logs and error messages.
    pub name: String,
    /// Compiled kernel binary, written verbatim.
    pub bytes: Vec<u8>,
}

impl KernelEntry {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Placement of every entry in a merged blob.
///
/// `offsets[i]` is the absolute start of entry `i`; `paddings[i]` is the number of
/// zero bytes written after it so the next entry (or the trailer) starts aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DirectoryPlan {
    /// Absolute start of each entry; always multiples of 64, first is 64.
    pub offsets: Vec<u32>,
    /// Zero bytes after each entry, 0..=63.
    pub paddings: Vec<u32>,
}

impl DirectoryPlan {
    /// Number of directory slots in use.
    #[must_use]
    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    /// Offset where the trailer begins, i.e. the end of the last entry's padding.
    ///
    /// Only known when the plan was computed from sizes; a plan parsed back from
    /// a blob has no record of the last entry's size (see [`crate::reader`]).
    #[must_use]
    pub fn payload_end(&self, last_size: u64) -> u64 {
        match (self.offsets.last(), self.paddings.last()) {
            (Some(&off), Some(&pad)) => u64::from(off) + last_size + u64::from(pad),
            _ => HEADER_SIZE as u64,
        }
    }

    /// Encode the 64-byte header: count, `count` offsets, zero fill.
    #[must_use]
    pub fn encode_header(&self) -> [u8; HEADER_SIZE] {
        let mut header = [0u8; HEADER_SIZE];
        let count = self.count() as u32;
        header[..FIELD_SIZE].copy_from_slice(&count.to_le_bytes());
        for (i, offset) in self.offsets.iter().enumerate() {
            let at = FIELD_SIZE * (i + 1);
            header[at..at + FIELD_SIZE].copy_from_slice(&offset.to_le_bytes());
        }
        header
    }
}

/// Round `n` up to the next multiple of [`ENTRY_ALIGNMENT`].
#[must_use]
pub const fn align_up(n: u64) -> u64 {
    let a = ENTRY_ALIGNMENT as u64;
    (n + a - 1) / a * a
}
