//! kpack: inspect, verify and unpack merged kernel blobs.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;

use kpack::{BlobReader, BlobReport, EntryView};

#[derive(Debug, Parser)]
#[command(name = "kpack", version, about = "Inspect and validate merged kernel blobs")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the directory, entry sizes and digests
    Inspect(InspectArgs),
    /// Check header, alignment and trailer; exit non-zero if invalid
    Verify(VerifyArgs),
    /// Write each entry to its own file
    Extract(ExtractArgs),
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Path to the blob
    path: PathBuf,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    /// Path to the blob
    path: PathBuf,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Path to the blob
    path: PathBuf,
    /// Directory to write `entry_<i>.bin` files into (created if missing)
    #[arg(long, short)]
    out_dir: PathBuf,
}

fn inspect(args: InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BlobReader::open(&args.path)?;
    let report = BlobReport::new(&reader.view());

    if args.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("{}", args.path.display());
    println!("  {:<12} {}", "size", report.total_size);
    println!("  {:<12} {}", "kernels", report.count);
    println!("  {:<12} {}", "sha256", report.sha256);
    println!("  {:<12} {}", "status", report.problem.as_deref().unwrap_or("ok"));
    for e in &report.entries {
        match (e.size, e.padding) {
            (Some(size), Some(padding)) => println!(
                "  [{:>2}] offset {:>8}  size {:>8}  pad {:>2}  {}",
                e.index, e.offset, size, padding, e.sha256
            ),
            _ => println!(
                "  [{:>2}] offset {:>8}  size unknown (last entry)  tail {}",
                e.index, e.offset, e.sha256
            ),
        }
    }
    Ok(())
}

fn verify(args: VerifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BlobReader::open(&args.path)?;
    reader.verify()?;
    println!("{}: ok ({} kernels)", args.path.display(), reader.directory().count());
    Ok(())
}

fn extract(args: ExtractArgs) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BlobReader::open(&args.path)?;
    fs::create_dir_all(&args.out_dir)?;
    for entry in reader.view().entries() {
        let file = match entry {
            EntryView::Recovered { index, .. } => format!("entry_{index}.bin"),
            // The last entry's length is not recorded; write everything after its offset.
            EntryView::Tail { index, .. } => format!("entry_{index}.tail.bin"),
        };
        let dest = args.out_dir.join(file);
        fs::write(&dest, entry.bytes())?;
        info!(path = %dest.display(), bytes = entry.bytes().len(), "extracted entry");
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    kpack::logging::init(cli.verbose);
    let result = match cli.command {
        Commands::Inspect(args) => inspect(args),
        Commands::Verify(args) => verify(args),
        Commands::Extract(args) => extract(args),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
