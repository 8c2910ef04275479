//! Minimal example: merge two kernels in memory, then parse the blob and print its directory.
//!
//! Run: cargo run --example merge_and_inspect

use kpack::{merge_to_vec, BlobReport, BlobView, KernelEntry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let entries = vec![
        KernelEntry::new("scale", b"scale_kernel_isa".to_vec()),
        KernelEntry::new("csc", vec![0x5A; 130]),
    ];

    let blob = merge_to_vec(&entries)?;
    let view = BlobView::parse(&blob)?;
    view.verify()?;

    let report = BlobReport::new(&view);
    println!("blob: {} bytes, {} kernels", report.total_size, report.count);
    for e in &report.entries {
        match e.size {
            Some(size) => println!("  [{}] offset {} size {}", e.index, e.offset, size),
            None => println!("  [{}] offset {} (last entry, size not recorded)", e.index, e.offset),
        }
    }
    Ok(())
}
