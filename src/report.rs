//! Inspection report for a parsed blob: layout plus SHA-256 digests.

use sha2::{Digest, Sha256};

use crate::reader::{BlobView, EntryView};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EntryReport {
    pub index: usize,
    pub offset: u32,
    /// Recovered payload length; `None` for the last entry, whose length the format does not record.
    pub size: Option<u64>,
    pub padding: Option<u32>,
    /// Digest of the recovered payload, or of the whole tail for the last entry.
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlobReport {
    pub total_size: u64,
    pub count: usize,
    pub sha256: String,
    pub entries: Vec<EntryReport>,
    /// Outcome of [`BlobView::verify`]; `None` when valid.
    pub problem: Option<String>,
}

impl BlobReport {
    #[must_use]
    pub fn new(view: &BlobView<'_>) -> Self {
        let entries = view
            .entries()
            .map(|entry| match entry {
                EntryView::Recovered {
                    index,
                    offset,
                    payload,
                    padding,
                } => EntryReport {
                    index,
                    offset,
                    size: Some(payload.len() as u64),
                    padding: Some(padding),
                    sha256: sha256_hex(payload),
                },
                EntryView::Tail { index, offset, bytes } => EntryReport {
                    index,
                    offset,
                    size: None,
                    padding: None,
                    sha256: sha256_hex(bytes),
                },
            })
            .collect();

        Self {
            total_size: view.as_bytes().len() as u64,
            count: view.count(),
            sha256: sha256_hex(view.as_bytes()),
            entries,
            problem: view.verify().err().map(|e| e.to_string()),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.problem.is_none()
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::KernelEntry;
    use crate::writer::merge_to_vec;

    #[test]
    fn report_marks_last_entry_size_unknown() {
        let blob = merge_to_vec(&[
            KernelEntry::new("a", b"first".to_vec()),
            KernelEntry::new("b", b"second".to_vec()),
        ])
        .unwrap();
        let view = BlobView::parse(&blob).unwrap();
        let report = BlobReport::new(&view);

        assert!(report.is_valid());
        assert_eq!(report.count, 2);
        assert_eq!(report.total_size, 64 + 64 + 64 + 128);
        assert_eq!(report.entries[0].size, Some(5));
        assert_eq!(report.entries[0].padding, Some(59));
        assert_eq!(report.entries[0].sha256, sha256_hex(b"first"));
        assert_eq!(report.entries[1].size, None);
        assert_eq!(report.entries[1].offset, 128);
    }

    #[test]
    fn empty_input_digest() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_report_has_entries() {
        let blob = merge_to_vec(&[KernelEntry::new("only", vec![1, 2, 3])]).unwrap();
        let report = BlobReport::new(&BlobView::parse(&blob).unwrap());
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["entries"][0]["offset"], 64);
        assert!(json["entries"][0]["size"].is_null());
        assert!(json["problem"].is_null());
    }
}
