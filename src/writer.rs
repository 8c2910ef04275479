//! Blob writer: build a merged kernel blob from an ordered list of entries.
//!
//! Used by the kpack-merge binary. Writes header + padded entries + trailer, and
//! publishes to a path only once the whole blob has been written.

use std::fs;
use std::io::{self, Write};
use std::path::{is_separator, Path, PathBuf};
use std::thread;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::format::{DirectoryPlan, KernelEntry, ENTRY_ALIGNMENT, MAX_ENTRIES, TRAILER_SIZE};
use crate::planner::{plan, PlanError};

const ZERO_PAD: [u8; ENTRY_ALIGNMENT] = [0u8; ENTRY_ALIGNMENT];
const TRAILER: [u8; TRAILER_SIZE] = [0u8; TRAILER_SIZE];

/// Errors produced by the writer.
#[derive(Debug, Error)]
pub enum PackError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("cannot read kernel '{name}' from {}: {source}", path.display())]
    SourceRead {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write failed: {0}")]
    SinkWrite(#[from] io::Error),
}

/// A kernel binary on disk, named for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    /// Diagnostic name; never stored in the blob.
    pub name: String,
    /// File holding the compiled kernel bytes.
    pub path: PathBuf,
}

impl KernelSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Parse a command-line input, `PATH` or `NAME=PATH`.
    ///
    /// The `NAME=` prefix is only recognised when it holds no path separator, so
    /// `out/a=b.bin` is a plain path.
    pub fn from_arg(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((name, path))
                if !name.is_empty() && !path.is_empty() && !name.contains(is_separator) =>
            {
                Self::new(name, path)
            }
            _ => Self::from_path(arg),
        }
    }

    /// Name the source after its file stem (falls back to the full path).
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }
}

/// Result of a successful merge to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MergeOutcome {
    /// Destination the blob was published to.
    pub path: PathBuf,
    /// Total blob size, header and trailer included.
    pub bytes_written: u64,
    /// Layout the blob was written with.
    pub plan: DirectoryPlan,
}

/// Serialize `entries` as one blob to `out`. Returns the number of bytes written.
///
/// The plan is computed before anything is written, so count violations leave
/// `out` untouched. Entries are emitted strictly in order.
pub fn write_blob<W: Write>(out: &mut W, entries: &[KernelEntry]) -> Result<u64, PackError> {
    let sizes: Vec<u64> = entries.iter().map(KernelEntry::size).collect();
    let plan = plan(&sizes)?;
    write_planned(out, entries, &plan)
}

fn write_planned<W: Write>(
    out: &mut W,
    entries: &[KernelEntry],
    plan: &DirectoryPlan,
) -> Result<u64, PackError> {
    let header = plan.encode_header();
    out.write_all(&header)?;
    let mut written = header.len() as u64;

    for (entry, &padding) in entries.iter().zip(&plan.paddings) {
        out.write_all(&entry.bytes)?;
        out.write_all(&ZERO_PAD[..padding as usize])?;
        debug!(
            name = %entry.name,
            offset = written,
            size = entry.bytes.len(),
            padding,
            "wrote kernel entry"
        );
        written += entry.size() + u64::from(padding);
    }

    out.write_all(&TRAILER)?;
    written += TRAILER.len() as u64;
    out.flush()?;
    Ok(written)
}

/// Merge `entries` into an in-memory blob.
pub fn merge_to_vec(entries: &[KernelEntry]) -> Result<Vec<u8>, PackError> {
    let mut buf = Vec::new();
    write_blob(&mut buf, entries)?;
    Ok(buf)
}

/// Merge `entries` into `path`, all or nothing.
///
/// The blob is staged in a temporary file next to `path` and renamed over it
/// after a successful `sync_all`. On error the temporary is removed and any
/// previous file at `path` is left as it was.
pub fn write_blob_to_path(entries: &[KernelEntry], path: &Path) -> Result<MergeOutcome, PackError> {
    let sizes: Vec<u64> = entries.iter().map(KernelEntry::size).collect();
    let plan = plan(&sizes)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    let written = write_planned(staged.as_file_mut(), entries, &plan).and_then(|n| {
        staged.as_file().sync_all()?;
        Ok(n)
    });
    let bytes_written = match written {
        Ok(n) => n,
        Err(e) => {
            discard(staged);
            return Err(e);
        }
    };
    if let Err(e) = staged.persist(path) {
        discard(e.file);
        return Err(PackError::SinkWrite(e.error));
    }

    info!(path = %path.display(), bytes = bytes_written, count = plan.count(), "published kernel blob");
    Ok(MergeOutcome {
        path: path.to_path_buf(),
        bytes_written,
        plan,
    })
}

fn discard(staged: NamedTempFile) {
    let tmp = staged.path().to_path_buf();
    if let Err(err) = staged.close() {
        warn!(path = %tmp.display(), %err, "could not remove staged blob");
    }
}

/// Read every source into memory, preserving input order.
///
/// The entry count is checked before any file is opened. Files are read
/// concurrently; if several fail, the first failing source in input order is
/// reported.
pub fn load_sources(sources: &[KernelSource]) -> Result<Vec<KernelEntry>, PackError> {
    if sources.is_empty() {
        return Err(PlanError::EmptyEntrySet.into());
    }
    if sources.len() > MAX_ENTRIES {
        return Err(PlanError::TooManyEntries {
            count: sources.len(),
        }
        .into());
    }

    let results: Vec<io::Result<Vec<u8>>> = thread::scope(|s| {
        let handles: Vec<_> = sources
            .iter()
            .map(|src| s.spawn(move || fs::read(&src.path)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    sources
        .iter()
        .zip(results)
        .map(|(src, res)| match res {
            Ok(bytes) => {
                debug!(name = %src.name, path = %src.path.display(), size = bytes.len(), "loaded kernel");
                Ok(KernelEntry::new(src.name.clone(), bytes))
            }
            Err(source) => Err(PackError::SourceRead {
                name: src.name.clone(),
                path: src.path.clone(),
                source,
            }),
        })
        .collect()
}

/// Load `sources` and publish the merged blob at `output`.
pub fn merge_files(sources: &[KernelSource], output: &Path) -> Result<MergeOutcome, PackError> {
    let entries = load_sources(sources)?;
    write_blob_to_path(&entries, output)
}

