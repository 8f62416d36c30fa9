//! Read a Zarr V2 array, halve it, and dump it as raw `u8` bytes.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use unzarr::cli::{init_logging, parse_or_usage};
use unzarr::serialize::DEFAULT_DIVISOR;
use unzarr::{LocalBackend, SerializeOptions, StoreRef, serialize_array};

const USAGE: &str = "Usage: read_zarr_serialize <input_zarr> <output_file>";

#[derive(Parser, Debug)]
#[command(name = "read_zarr_serialize", version)]
#[command(about = "Dump a Zarr array as raw bytes: value / divisor, cast to u8")]
struct Cli {
    /// Source Zarr store, opened read-only
    input_zarr: PathBuf,

    /// Raw output file; overwritten if present
    output_file: PathBuf,

    /// Array inside the store to read, when the store root is a group
    #[arg(long, default_value = "")]
    array: String,

    /// Every element is divided by this before the cast
    #[arg(long, default_value_t = DEFAULT_DIVISOR)]
    divisor: f64,

    /// Fail unless the array has this NumPy dtype (e.g. "<f4")
    #[arg(long, value_name = "DTYPE")]
    expect_dtype: Option<String>,

    /// Fail on scaled values outside 0..=255 instead of wrapping
    #[arg(long)]
    check_range: bool,

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
    let store: StoreRef = Arc::new(
        LocalBackend::open_existing(&cli.input_zarr)
            .await
            .with_context(|| format!("opening {}", cli.input_zarr.display()))?,
    );

    let options = SerializeOptions {
        divisor: cli.divisor,
        expected_dtype: cli.expect_dtype,
        check_range: cli.check_range,
    };

    let report = serialize_array(store, &cli.array, &cli.output_file, &options)
        .await
        .with_context(|| {
            format!(
                "serializing {} to {}",
                cli.input_zarr.display(),
                cli.output_file.display()
            )
        })?;

    log::info!(
        "{} ({}, shape {:?}) -> {} bytes",
        cli.input_zarr.display(),
        report.dtype,
        report.shape,
        report.bytes_written
    );
    Ok(())
}
