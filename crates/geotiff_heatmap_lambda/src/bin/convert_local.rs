use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use geotiff_heatmap_core::render::{DEFAULT_DPI, DEFAULT_PAD_INCHES, DEFAULT_SIZE_INCHES};
use geotiff_heatmap_core::RenderOptions;
use geotiff_heatmap_lambda::adapters::fs_store::FsObjectStore;
use geotiff_heatmap_lambda::handlers::convert::handle_conversion_event;
use geotiff_heatmap_lambda::telemetry::{init_tracing, LogFormat};
use serde_json::json;

/// Converts a GeoTIFF stored under a local directory tree, one sub-directory per bucket.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Directory standing in for object storage.
    #[arg(long, env = "GEOTIFF_HEATMAP_ROOT", default_value = ".")]
    root: PathBuf,
    #[arg(long)]
    bucket: String,
    #[arg(long)]
    key: String,
    #[arg(long, default_value_t = DEFAULT_DPI)]
    dpi: u32,
    #[arg(long, default_value_t = DEFAULT_SIZE_INCHES)]
    size_inches: f64,
    #[arg(long, default_value_t = DEFAULT_PAD_INCHES)]
    pad_inches: f64,
}

fn main() -> ExitCode {
    init_tracing(LogFormat::Text);
    let cli = Cli::parse();

    let store = FsObjectStore::new(cli.root);
    let options = RenderOptions {
        size_inches: cli.size_inches,
        dpi: cli.dpi,
        pad_inches: cli.pad_inches,
    };
    let event = json!({"bucket": cli.bucket, "key": cli.key});

    let response = handle_conversion_event(event, &store, &options);
    match serde_json::to_string_pretty(&response) {
        Ok(text) => println!("{text}"),
        Err(error) => {
            eprintln!("failed to serialize response: {error}");
            return ExitCode::FAILURE;
        }
    }

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
