#[macro_use] extern crate log;

use clap::Parser;
use googlemaps::bulk::{download_bulk_file, BulkOptions};
use googlemaps::cli::{init_logging, MapArgs};
use googlemaps::config::Config;
use std::path::PathBuf;

/// Download one static map image per row of a CSV file
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV file with id, group, is_public, latitude and longitude columns
    #[arg(long)]
    file: PathBuf,

    #[command(flatten)]
    map: MapArgs,
}

// Example:
//   download_bulk --file data/public_locations.csv --zoom 17 --output-dir data/images/zoom17
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let config = Config::load(args.map.config.as_deref())?;

    let options = BulkOptions {
        zoom: args.map.zoom,
        size: args.map.size(),
        maptype: args.map.maptype.clone(),
        secret_key: config.secret_key()?,
        output_dir: args.map.output_dir(&config),
        base_url: None,
    };

    info!("Reading locations from {}", args.file.display());
    let report = download_bulk_file(&args.file, &options).await?;

    for failure in &report.failed {
        println!("Error when saving row {}: {}", failure.row, failure.message);
    }
    println!(
        "{} of {} images saved in {}",
        report.saved.len(),
        report.total(),
        options.output_dir.display()
    );

    Ok(())
}
