//! kpack — packer and validator for merged GPU kernel binary blobs.
//!
//! A blob holds up to 15 independently compiled kernels behind a fixed 64-byte
//! directory header, each entry starting on a 64-byte boundary, followed by a
//! 128-byte zero trailer. The driver interprets the header directly at load time.
//!
//! This crate provides:
//! - **Format types** (`format`): constants, `KernelEntry`, `DirectoryPlan`.
//! - **Planner** (`planner`): `plan(sizes)` computes offsets and paddings.
//! - **Writer** (`writer`): `write_blob` to any sink, `write_blob_to_path` with atomic publish.
//! - **Reader** (`reader`): `BlobView::parse` / `BlobReader::open`, entry access and `verify`.
//! - **Manifest** (`manifest`): TOML merge manifests and fixed name layouts.
//! - **Report** (`report`): layout and digest summary used by the `kpack` tool.
//! - **Logging** (`logging`): `tracing` subscriber setup for the binaries.

pub mod format;
pub mod logging;
#[cfg(feature = "serde")]
pub mod manifest;
pub mod planner;
pub mod reader;
pub mod report;
pub mod writer;

pub use format::{
    align_up, DirectoryPlan, KernelEntry, ENTRY_ALIGNMENT, HEADER_SIZE, MAX_ENTRIES, TRAILER_SIZE,
};
#[cfg(feature = "serde")]
pub use manifest::{FixedLayout, ManifestError, MergeManifest};
pub use planner::{blob_size, plan, PlanError};
pub use reader::{read, BlobReader, BlobView, Directory, EntryView, ReadError};
pub use report::{sha256_hex, BlobReport};
pub use writer::{
    load_sources, merge_files, merge_to_vec, write_blob, write_blob_to_path, KernelSource,
    MergeOutcome, PackError,
};
