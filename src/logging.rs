//! Log setup shared by the `kpack` and `kpack-merge` binaries.

use tracing_subscriber::EnvFilter;

/// Install a stderr `tracing` subscriber. `RUST_LOG` wins; otherwise `verbose`
/// picks the level (0 warn, 1 info, 2+ debug).
pub fn init(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
