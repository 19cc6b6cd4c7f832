//! # Media Mirror - Main Entry Point
//!
//! ## Responsabilità:
//! - Parsing of the two positional arguments with `clap`
//! - Logging setup with `tracing` (level from `RUST_LOG`, default `info`)
//! - Building the walker and mapping the run result onto an exit code
//!
//! ## Exit codes:
//! - `0`: every entry mirrored
//! - `1`: fatal error, nothing (or nothing more) was written
//! - `2`: usage error (reported by clap)
//! - `3`: the walk completed but some files failed
//!
//! ## Esempio di utilizzo:
//! ```bash
//! RUST_LOG=debug media-mirror ~/Pictures /mnt/phone/Pictures
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use media_mirror::{Config, MirrorWalker, ProgressManager};

#[derive(Parser)]
#[command(name = "media-mirror", version)]
#[command(about = "Mirror a directory tree, shrinking images and videos to fit within 1920x1080")]
struct Args {
    /// Directory to mirror
    source_directory: PathBuf,

    /// Directory receiving the mirrored tree (created if missing)
    destination_directory: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut walker = MirrorWalker::new(
        &args.source_directory,
        &args.destination_directory,
        Config::default(),
    )
    .await
    .with_context(|| {
        format!(
            "cannot mirror {} into {}",
            args.source_directory.display(),
            args.destination_directory.display()
        )
    })?
    .with_progress(ProgressManager::new());

    let stats = walker.run().await?;

    Ok(ExitCode::from(stats.exit_code()))
}
