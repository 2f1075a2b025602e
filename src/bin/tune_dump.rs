//! Tune image dump utility
//! Decodes a binary tune image against its schema and prints the values as JSON

use std::env;
use std::fs;
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};
use tune_rs::{ByteArena, Config};

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
    let mode = args.get(3).map(String::as_str);
    if args.len() < 3 || args.len() > 4 || !matches!(mode, None | Some("--hex") | Some("--vars")) {
        eprintln!("Usage: {} <schema.json> <tune.bin> [--hex | --vars]", args[0]);
        eprintln!("Example: {} engine.json current.bin", args[0]);
        eprintln!("\nPrints the schema and decoded values as a JSON document.");
        eprintln!("With --hex the raw image and free table space are shown instead.");
        eprintln!("With --vars the variables tables can bind to are listed by group.");
        std::process::exit(1);
    }

    let schema_path = &args[1];
    let image_path = &args[2];

    let schema_text = fs::read_to_string(schema_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", schema_path, e))?;
    let schema: serde_json::Value = serde_json::from_str(&schema_text)?;
    let config = Config::from_json(&schema)?;

    let data = fs::read(image_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", image_path, e))?;
    tracing::info!("Loaded {} bytes from {}", data.len(), image_path);
    let arena = ByteArena::new(data);

    if mode == Some("--vars") {
        for (group, members) in config.variables().by_category() {
            println!("{}", group.unwrap_or("(ungrouped)"));
            for v in members {
                let index = config.variables().index_of(&v.short_name)?;
                let width = v
                    .packed_encoding()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "  {:3}  {:<12} {:<24} {:<6} {}",
                    index,
                    v.short_name,
                    v.label(),
                    v.units,
                    width
                );
            }
        }
        return Ok(());
    }

    if mode == Some("--hex") {
        println!("{}", arena.printable(None, None));

        let free = config.free_table_space(&arena)?;
        println!("Free table space:");
        for range in &free {
            println!("  0x{:04x}..0x{:04x} ({} bytes)", range.start, range.end, range.len());
        }
        println!("  total {} bytes", config.total_free_table_space(&arena)?);
        return Ok(());
    }

    for (name, enabled) in config.conditional_states(&arena)? {
        if !enabled {
            tracing::debug!("{} is disabled", name);
        }
    }

    let document = config.decode_document(&arena)?;
    println!("{}", serde_json::to_string_pretty(&document)?);

    Ok(())
}
