use anyhow::{Context, Result};
use clap::Parser;
use std::fs;

use pdf_clean::cli::Args;
use pdf_clean::config::CleanOptions;
use pdf_clean::session::Session;
use pdf_clean::store::ObjectStore;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let options = CleanOptions::from_args(&args);
    let output_path = args.output_path();

    // Load and decrypt the input
    let store = ObjectStore::open(&args.input, &args.password)
        .with_context(|| format!("Failed to open input file: {}", args.input.display()))?;

    log::info!(
        "Loaded {} with {} pages",
        args.input.display(),
        store.page_count()
    );

    // Clean into memory first so a failed run never leaves a partial file
    let mut pdf_data = Vec::new();
    Session::new(store, options)
        .run(&mut pdf_data)
        .with_context(|| "Failed to clean PDF")?;

    fs::write(&output_path, pdf_data)
        .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;

    println!("Wrote {}", output_path.display());

    Ok(())
}
