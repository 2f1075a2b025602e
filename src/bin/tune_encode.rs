//! Tune image encoder
//! Builds a binary tune image from a saved JSON document (schema plus values)

use base64::Engine;
use std::env;
use std::fs;
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};
use tune_rs::{Config, TuneDocument};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 || (args.len() == 4 && args[3] != "--base64") {
        eprintln!("Usage: {} <document.json> <out.bin> [--base64]", args[0]);
        eprintln!("Example: {} current.json current.bin", args[0]);
        eprintln!("\nWith --base64 the image is also printed as base64 for upload.");
        std::process::exit(1);
    }

    let document_path = &args[1];
    let output_path = &args[2];

    let text = fs::read_to_string(document_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", document_path, e))?;
    let document: TuneDocument = serde_json::from_str(&text)?;

    let (config, arena) = Config::load_document(&document)?;

    fs::write(output_path, arena.as_bytes())?;
    tracing::info!("Wrote {} bytes to {}", arena.len(), output_path);
    tracing::info!(
        "{} bytes of table space left",
        config.total_free_table_space(&arena)?
    );

    if args.len() == 4 {
        println!(
            "{}",
            base64::engine::general_purpose::STANDARD.encode(arena.as_bytes())
        );
    }

    Ok(())
}
