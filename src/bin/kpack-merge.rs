//! kpack-merge: producer tool to build one kernel blob from up to 15 kernel binaries.
//!
//! Inputs come from the command line (`[NAME=]PATH`, in slot order), a TOML
//! manifest, or a fixed name list resolved in a directory. The output is
//! published atomically: on failure nothing is left at the output path.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};

use kpack::{merge_files, FixedLayout, KernelSource, MergeManifest};

#[derive(Debug, Parser)]
#[command(name = "kpack-merge", version)]
#[command(about = "Merge compiled GPU kernel binaries into one 64-byte-aligned blob", long_about = None)]
struct Cli {
    /// Kernel binaries in slot order, as PATH or NAME=PATH (NAME may not contain a path separator).
    #[arg(conflicts_with_all = ["manifest", "layout_dir"])]
    inputs: Vec<String>,

    /// TOML manifest listing `[[kernel]]` entries (and optionally `output`).
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Directory holding the kernels named by `--names`.
    #[arg(long, requires = "names", conflicts_with = "manifest")]
    layout_dir: Option<PathBuf>,

    /// Comma-separated kernel names for `--layout-dir`, in slot order.
    #[arg(long, value_delimiter = ',', requires = "layout_dir")]
    names: Vec<String>,

    /// File extension of the kernels named by `--names`.
    #[arg(long, default_value = "bin")]
    ext: String,

    /// Output blob path. Overrides the manifest's `output`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a JSON summary (path, size, offsets, paddings) on stdout.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (sources, manifest_output) = if let Some(path) = &cli.manifest {
        let manifest = MergeManifest::load(path)?;
        (manifest.sources(), manifest.output_path())
    } else if let Some(dir) = &cli.layout_dir {
        let names: Vec<&str> = cli.names.iter().map(String::as_str).collect();
        (FixedLayout::new(&names, &cli.ext).sources(dir), None)
    } else {
        (cli.inputs.iter().map(|a| KernelSource::from_arg(a)).collect(), None)
    };

    let output = cli
        .output
        .or(manifest_output)
        .ok_or("--output is required (or set `output` in the manifest)")?;

    let outcome = merge_files(&sources, &output)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        eprintln!(
            "wrote {} ({} bytes, {} kernels)",
            outcome.path.display(),
            outcome.bytes_written,
            outcome.plan.count()
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    kpack::logging::init(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
