//! Blob reader: parse the directory header and expose each entry's bytes.
//!
//! The format records where every entry starts but not how long the last one
//! is. Entries `0..count-1` are recovered as their slot minus trailing zero
//! padding; the last entry is only available as the remaining tail (payload,
//! padding and trailer together). Its exact length is not guessed.
//!
//! A recovered payload that legitimately ends in zero bytes loses them: padding
//! and content are indistinguishable on disk. At most 63 bytes are stripped,
//! since that is the most padding the writer ever emits.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::format::{ENTRY_ALIGNMENT, FIELD_SIZE, HEADER_SIZE, MAX_ENTRIES, TRAILER_SIZE};

/// Errors produced by the reader.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt header: {0}")]
    CorruptHeader(String),
    #[error("truncated blob: need at least {needed} bytes, have {actual}")]
    TruncatedSource { needed: u64, actual: u64 },
    #[error("blob does not end in {len} zero trailer bytes", len = TRAILER_SIZE)]
    MissingTrailer,
    #[error("blob length {0} is not a multiple of {align}", align = ENTRY_ALIGNMENT)]
    UnalignedLength(u64),
}

/// Parsed directory header: entry count and start offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Directory {
    /// Start of each entry as stored in the header, in slot order.
    pub offsets: Vec<u32>,
}

impl Directory {
    #[must_use]
    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    /// Parse and check the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, ReadError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ReadError::TruncatedSource {
                needed: HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let count = read_u32(bytes, 0) as usize;
        if count == 0 || count > MAX_ENTRIES {
            return Err(ReadError::CorruptHeader(format!(
                "entry count {count} outside 1..={MAX_ENTRIES}"
            )));
        }

        let offsets: Vec<u32> = (0..count)
            .map(|i| read_u32(bytes, FIELD_SIZE * (i + 1)))
            .collect();

        if offsets[0] as usize != HEADER_SIZE {
            return Err(ReadError::CorruptHeader(format!(
                "first entry at {} instead of {HEADER_SIZE}",
                offsets[0]
            )));
        }
        for (i, &off) in offsets.iter().enumerate() {
            if off == 0 || off as usize % ENTRY_ALIGNMENT != 0 {
                return Err(ReadError::CorruptHeader(format!(
                    "entry {i} offset {off} is not a positive multiple of {ENTRY_ALIGNMENT}"
                )));
            }
        }
        // Equal neighbours mean a zero-length entry, which the writer allows.
        if let Some(i) = offsets.windows(2).position(|w| w[1] < w[0]) {
            return Err(ReadError::CorruptHeader(format!(
                "entry {} offset {} precedes entry {i} offset {}",
                i + 1,
                offsets[i + 1],
                offsets[i]
            )));
        }

        let last = u64::from(offsets[count - 1]);
        let needed = last + TRAILER_SIZE as u64;
        if (bytes.len() as u64) < needed {
            return Err(ReadError::TruncatedSource {
                needed,
                actual: bytes.len() as u64,
            });
        }

        Ok(Self { offsets })
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut field = [0u8; FIELD_SIZE];
    field.copy_from_slice(&bytes[at..at + FIELD_SIZE]);
    u32::from_le_bytes(field)
}

/// One entry's bytes as far as the format allows them to be recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryView<'a> {
    /// A non-final entry: payload with trailing padding removed.
    Recovered {
        index: usize,
        offset: u32,
        payload: &'a [u8],
        padding: u32,
    },
    /// The final entry: everything from its offset to the end of the blob.
    Tail { index: usize, offset: u32, bytes: &'a [u8] },
}

impl<'a> EntryView<'a> {
    #[must_use]
    pub fn index(&self) -> usize {
        match *self {
            EntryView::Recovered { index, .. } | EntryView::Tail { index, .. } => index,
        }
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        match *self {
            EntryView::Recovered { offset, .. } | EntryView::Tail { offset, .. } => offset,
        }
    }

    /// Recovered payload, or the raw tail for the last entry.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        match *self {
            EntryView::Recovered { payload, .. } => payload,
            EntryView::Tail { bytes, .. } => bytes,
        }
    }
}

/// Borrowed, zero-copy view over a merged blob (a byte buffer or mapped region).
#[derive(Debug, Clone)]
pub struct BlobView<'a> {
    bytes: &'a [u8],
    directory: Directory,
}

/// Parse `bytes` as a merged blob.
pub fn read(bytes: &[u8]) -> Result<BlobView<'_>, ReadError> {
    BlobView::parse(bytes)
}

impl<'a> BlobView<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ReadError> {
        let directory = Directory::parse(bytes)?;
        Ok(Self { bytes, directory })
    }

    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.directory.count()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Padded slot of a non-final entry (payload + padding). `None` for the last entry.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&'a [u8]> {
        let offsets = &self.directory.offsets;
        if index + 1 >= offsets.len() {
            return None;
        }
        let start = offsets[index] as usize;
        let end = offsets[index + 1] as usize;
        Some(&self.bytes[start..end])
    }

    /// Payload of a non-final entry with trailing padding removed.
    #[must_use]
    pub fn payload(&self, index: usize) -> Option<&'a [u8]> {
        self.slot(index).map(strip_padding)
    }

    /// Bytes from the last entry's start to the end of the blob.
    #[must_use]
    pub fn tail(&self) -> &'a [u8] {
        let last = self.directory.offsets[self.count() - 1] as usize;
        &self.bytes[last..]
    }

    /// Padding removed from each non-final entry, in order.
    #[must_use]
    pub fn recovered_paddings(&self) -> Vec<u32> {
        (0..self.count().saturating_sub(1))
            .filter_map(|i| {
                let slot = self.slot(i)?;
                Some((slot.len() - strip_padding(slot).len()) as u32)
            })
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = EntryView<'a>> + '_ {
        let count = self.count();
        (0..count).map(move |index| {
            let offset = self.directory.offsets[index];
            match self.slot(index) {
                Some(slot) => {
                    let payload = strip_padding(slot);
                    EntryView::Recovered {
                        index,
                        offset,
                        payload,
                        padding: (slot.len() - payload.len()) as u32,
                    }
                }
                None => EntryView::Tail {
                    index,
                    offset,
                    bytes: self.tail(),
                },
            }
        })
    }

    /// Structural checks beyond what parsing needs: header zero fill, total
    /// length alignment and the zero trailer after the last entry's start.
    pub fn verify(&self) -> Result<(), ReadError> {
        let used = FIELD_SIZE * (self.count() + 1);
        if let Some(pos) = self.bytes[used..HEADER_SIZE].iter().position(|&b| b != 0) {
            return Err(ReadError::CorruptHeader(format!(
                "non-zero byte in header fill at {}",
                used + pos
            )));
        }

        let len = self.bytes.len() as u64;
        if len % ENTRY_ALIGNMENT as u64 != 0 {
            return Err(ReadError::UnalignedLength(len));
        }

        let tail = self.tail();
        let trailer = &tail[tail.len() - TRAILER_SIZE..];
        if trailer.iter().any(|&b| b != 0) {
            return Err(ReadError::MissingTrailer);
        }
        Ok(())
    }
}

fn strip_padding(slot: &[u8]) -> &[u8] {
    let max_strip = slot.len().min(ENTRY_ALIGNMENT - 1);
    let zeros = slot.iter().rev().take(max_strip).take_while(|&&b| b == 0).count();
    &slot[..slot.len() - zeros]
}

/// Owning reader over a blob file on disk.
pub struct BlobReader {
    bytes: Vec<u8>,
    directory: Directory,
}

impl BlobReader {
    /// Read the file at `path` and parse its directory. Does not run [`BlobView::verify`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ReadError> {
        let directory = Directory::parse(&bytes)?;
        Ok(Self { bytes, directory })
    }

    #[must_use]
    pub fn view(&self) -> BlobView<'_> {
        BlobView {
            bytes: &self.bytes,
            directory: self.directory.clone(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn verify(&self) -> Result<(), ReadError> {
        self.view().verify()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_padding_keeps_last_block_byte() {
        assert_eq!(strip_padding(&[0u8; 64]), &[0u8]);
        assert_eq!(strip_padding(&[]), &[] as &[u8]);
        let mut slot = vec![7u8; 10];
        slot.resize(64, 0);
        assert_eq!(strip_padding(&slot), &[7u8; 10]);
    }

    #[test]
    fn header_shorter_than_64_is_truncated() {
        match Directory::parse(&[1, 0, 0, 0]) {
            Err(ReadError::TruncatedSource { needed: 64, actual: 4 }) => {}
            other => panic!("expected truncation, got {other:?}"),
        }
    }
}
