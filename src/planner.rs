//! Directory planner: entry sizes in, offsets and paddings out. Pure, no I/O.

use thiserror::Error;
use tracing::debug;

use crate::format::{align_up, DirectoryPlan, HEADER_SIZE, MAX_BLOB_SIZE, MAX_ENTRIES, TRAILER_SIZE};

/// Errors produced while planning a blob layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("no kernels given, at least one is required")]
    EmptyEntrySet,
    #[error("{count} kernels given, maximum is {max}", max = MAX_ENTRIES)]
    TooManyEntries { count: usize },
    #[error("entry {index} does not fit in a 32-bit blob offset")]
    OffsetOverflow { index: usize },
}

/// Compute the placement of each entry from the ordered entry sizes.
///
/// Entry 0 starts at [`HEADER_SIZE`]; each entry is padded up to the next 64-byte
/// boundary and the next one starts there.
pub fn plan(sizes: &[u64]) -> Result<DirectoryPlan, PlanError> {
    if sizes.is_empty() {
        return Err(PlanError::EmptyEntrySet);
    }
    if sizes.len() > MAX_ENTRIES {
        return Err(PlanError::TooManyEntries { count: sizes.len() });
    }

    let mut offsets = Vec::with_capacity(sizes.len());
    let mut paddings = Vec::with_capacity(sizes.len());
    let mut cursor = HEADER_SIZE as u64;
    for (index, &size) in sizes.iter().enumerate() {
        let end = cursor
            .checked_add(size)
            .filter(|&end| end <= MAX_BLOB_SIZE)
            .ok_or(PlanError::OffsetOverflow { index })?;
        let aligned_end = align_up(end);
        if aligned_end + TRAILER_SIZE as u64 > MAX_BLOB_SIZE {
            return Err(PlanError::OffsetOverflow { index });
        }
        offsets.push(cursor as u32);
        paddings.push((aligned_end - end) as u32);
        cursor = aligned_end;
    }

    debug!(count = sizes.len(), ?offsets, "planned kernel directory");
    Ok(DirectoryPlan { offsets, paddings })
}

/// Total blob size for `sizes`: header, padded entries and trailer.
pub fn blob_size(sizes: &[u64]) -> Result<u64, PlanError> {
    let plan = plan(sizes)?;
    let last = sizes.last().copied().unwrap_or(0);
    Ok(plan.payload_end(last) + TRAILER_SIZE as u64)
}
