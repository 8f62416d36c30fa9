//! Copy a Zarr V2 store into a directory with every chunk stored uncompressed.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use unzarr::cli::{init_logging, parse_or_usage};
use unzarr::copy::check_distinct;
use unzarr::{LocalBackend, StoreRef, decompress_store, open_node};

const USAGE: &str = "Usage: decompress_zarr <input_zarr> <output_dir>";

#[derive(Parser, Debug)]
#[command(name = "decompress_zarr", version)]
#[command(about = "Copy a Zarr store with all chunks decompressed")]
struct Cli {
    /// Source Zarr store (array or group directory), opened read-only
    input_zarr: PathBuf,

    /// Destination directory; created if absent, existing contents replaced
    output_dir: PathBuf,

    /// Log progress to stderr (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let Some(cli) = parse_or_usage::<Cli>(USAGE) else {
        return;
    };
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let src: StoreRef = Arc::new(
        LocalBackend::open_existing(&cli.input_zarr)
            .await
            .with_context(|| format!("opening {}", cli.input_zarr.display()))?,
    );
    open_node(src.clone(), "")
        .await
        .with_context(|| format!("reading {}", cli.input_zarr.display()))?;
    check_distinct(&cli.input_zarr, &cli.output_dir)?;

    let dst: StoreRef = Arc::new(
        LocalBackend::create(&cli.output_dir)
            .await
            .with_context(|| format!("creating {}", cli.output_dir.display()))?,
    );

    let stats = decompress_store(src, dst).await.with_context(|| {
        format!(
            "copying {} to {}",
            cli.input_zarr.display(),
            cli.output_dir.display()
        )
    })?;

    log::info!(
        "{} -> {}: {} array(s), {} chunk(s)",
        cli.input_zarr.display(),
        cli.output_dir.display(),
        stats.arrays,
        stats.chunks
    );
    Ok(())
}
