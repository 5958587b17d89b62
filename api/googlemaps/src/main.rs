#[macro_use] extern crate log;

use anyhow::Context;
use clap::Parser;
use googlemaps::cli::{init_logging, MapArgs};
use googlemaps::config::Config;
use googlemaps::GoogleMapsDownloader;

/// File written in the output directory
const OUTPUT_FILE: &str = "image.png";

/// Download one static map image centered on a location
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Map location
    #[arg(
        long,
        num_args = 2,
        value_names = ["LATITUDE", "LONGITUDE"],
        required = true,
        allow_negative_numbers = true
    )]
    location: Vec<f64>,

    #[command(flatten)]
    map: MapArgs,
}

// Example:
//   googlemaps --location -31.428489 -64.184853 --maptype satellite --size 512 512 --zoom 15
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let config = Config::load(args.map.config.as_deref())?;
    let location = match args.location.as_slice() {
        [.., lat, lon] => (*lat, *lon),
        _ => anyhow::bail!("--location needs a latitude and a longitude"),
    };

    let downloader = GoogleMapsDownloader::new(
        location,
        args.map.zoom,
        args.map.size(),
        &args.map.maptype,
        config.secret_key()?,
    )?;

    let image = downloader.request(true).await?;

    if let Some((height, width, channels)) = image.shape() {
        println!("({}, {}, {})", height, width, channels);
    }

    let output_dir = args.map.output_dir(&config);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("could not create output directory {}", output_dir.display()))?;

    let output_path = output_dir.join(OUTPUT_FILE);
    image.save(&output_path)?;
    info!("Image saved in {}", output_path.display());

    Ok(())
}
