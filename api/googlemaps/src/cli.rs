use crate::config::Config;
use crate::{DEFAULT_SIZE, DEFAULT_ZOOM, MAP_TYPES, MAX_ZOOM};
use clap::builder::PossibleValuesParser;
use clap::Args;
use std::path::PathBuf;

const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Flags shared by the single and bulk downloaders
#[derive(Debug, Clone, Args)]
pub struct MapArgs {
    /// Zoom level of the map image
    #[arg(
        long,
        default_value_t = DEFAULT_ZOOM,
        value_parser = clap::value_parser!(u32).range(0..=MAX_ZOOM as i64)
    )]
    pub zoom: u32,

    /// Type of map
    #[arg(long, default_value = MAP_TYPES[1], value_parser = PossibleValuesParser::new(MAP_TYPES))]
    pub maptype: String,

    /// Image size, it will be a (WIDTH x HEIGHT) image
    #[arg(
        long,
        num_args = 2,
        value_names = ["WIDTH", "HEIGHT"],
        default_values_t = [DEFAULT_SIZE.0, DEFAULT_SIZE.1]
    )]
    pub size: Vec<u32>,

    /// Output directory to save the images [default: ./output]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// TOML config file with secret_key and output_dir [default: googlemaps.toml if present]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl MapArgs {
    /// Last `--size` given on the command line wins
    pub fn size(&self) -> (u32, u32) {
        match self.size.as_slice() {
            [.., width, height] => (*width, *height),
            _ => DEFAULT_SIZE,
        }
    }

    /// Output directory from the flag, else the config file, else `./output`
    pub fn output_dir(&self, config: &Config) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(|| config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}

/// Start `pretty_env_logger` at `info` unless `RUST_LOG` says otherwise
pub fn init_logging() {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
