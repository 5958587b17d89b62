use image::RgbImage;
use log::{debug, info};
use reqwest::Client;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub mod bulk;
pub mod cli;
pub mod config;

#[cfg(test)]
mod test_server;

/// Google Static Maps endpoint
pub const BASE_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

/// Map types accepted by the API, in wire form. Index 1 is the default.
pub const MAP_TYPES: [&str; 4] = ["roadmap", "satellite", "hybrid", "terrain"];

pub const MAX_ZOOM: u32 = 22;
pub const DEFAULT_ZOOM: u32 = 18;

/// Largest width or height the API serves without a premium plan
pub const MAX_SIZE: u32 = 640;
pub const DEFAULT_SIZE: (u32, u32) = (512, 512);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Rendering style of the requested map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapType {
    Roadmap,
    #[default]
    Satellite,
    Hybrid,
    Terrain,
}

impl MapType {
    /// Name used in the `maptype` query parameter
    pub fn name(&self) -> &'static str {
        match self {
            MapType::Roadmap => "roadmap",
            MapType::Satellite => "satellite",
            MapType::Hybrid => "hybrid",
            MapType::Terrain => "terrain",
        }
    }
}

impl FromStr for MapType {
    type Err = InvalidParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "road" | "roadmap" => Ok(MapType::Roadmap),
            "satellite" => Ok(MapType::Satellite),
            "hybrid" => Ok(MapType::Hybrid),
            "terrain" => Ok(MapType::Terrain),
            _ => Err(InvalidParameter::MapType(s.to_string())),
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which request parameter was rejected, and with what value
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InvalidParameter {
    #[error("zoom level {0} is not valid, must be between 0 and {}", MAX_ZOOM)]
    Zoom(u32),
    #[error("map type {0:?} is not valid, choose from {:?}", MAP_TYPES)]
    MapType(String),
    #[error("size {0}x{1} is not valid, width and height must be between 1 and {} pixels", MAX_SIZE)]
    Size(u32, u32),
    #[error(
        "location ({0}, {1}) is not valid, latitude must be between -90 and 90, \
         longitude between -180 and 180"
    )]
    Location(f64, f64),
    #[error("API key is required, please provide a valid Google Maps API key")]
    MissingKey,
}

#[derive(thiserror::Error, Debug)]
pub enum DownloaderError {
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameter),

    #[error("error when getting the image, HTTP {status}")]
    RequestFailed { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("error when saving {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("could not create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not open input table {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not read input table: {0}")]
    Csv(#[from] csv::Error),
}

impl DownloaderError {
    /// HTTP status of a rejected request
    pub fn status(&self) -> Option<u16> {
        match self {
            DownloaderError::RequestFailed { status } => Some(*status),
            DownloaderError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The API answered with 429 Too Many Requests
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

/// A downloaded map, either decoded or as the bytes the API sent
#[derive(Debug, Clone)]
pub enum MapImage {
    Raster(RgbImage),
    Encoded(Vec<u8>),
}

impl MapImage {
    /// `(height, width, channels)` of a decoded raster
    pub fn shape(&self) -> Option<(u32, u32, u8)> {
        match self {
            MapImage::Raster(img) => Some((img.height(), img.width(), 3)),
            MapImage::Encoded(_) => None,
        }
    }

    /// Save to `path`. Rasters are encoded from the path's extension, raw bytes are written as-is.
    pub fn save(&self, path: &Path) -> Result<(), DownloaderError> {
        let result = match self {
            MapImage::Raster(img) => img.save(path),
            MapImage::Encoded(bytes) => std::fs::write(path, bytes).map_err(image::ImageError::IoError),
        };
        result.map_err(|source| DownloaderError::Save {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Downloads a single static map image from the Google Maps API.
///
/// Every parameter is checked in [`GoogleMapsDownloader::new`], so an instance always
/// describes a request the API can serve. Each call to [`GoogleMapsDownloader::request`]
/// makes exactly one HTTP request; nothing is cached.
pub struct GoogleMapsDownloader {
    client: Client,
    base_url: String,
    center: (f64, f64),
    zoom: u32,
    size: (u32, u32),
    maptype: MapType,
    key: String,
}

impl GoogleMapsDownloader {
    /// Validate the parameters and create a downloader.
    ///
    /// `location` is `(latitude, longitude)` and `size` is `(width, height)` in pixels.
    pub fn new(
        location: (f64, f64),
        zoom: u32,
        size: (u32, u32),
        maptype: &str,
        secret_key: impl Into<String>,
    ) -> Result<Self, DownloaderError> {
        let key = secret_key.into();
        let maptype = validate_parameters(location, zoom, size, maptype, &key)?;

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            center: location,
            zoom,
            size,
            maptype,
            key,
        })
    }

    /// Send requests to `base_url` instead of the public endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn maptype(&self) -> MapType {
        self.maptype
    }

    /// Build the request URL (pure function)
    pub fn generate_url(&self) -> String {
        self.url_with_key(&self.key)
    }

    fn url_with_key(&self, key: &str) -> String {
        let (lat, lon) = self.center;
        let (width, height) = self.size;
        let tail = serde_urlencoded::to_string(&[("maptype", self.maptype.name()), ("key", key)])
            .unwrap_or_default();

        format!(
            "{}?center={},{}&zoom={}&size={}x{}&{}",
            self.base_url.trim_end_matches('?'),
            lat,
            lon,
            self.zoom,
            width,
            height,
            tail
        )
    }

    /// Download the image. With `as_raster` the body is decoded to RGB, otherwise the
    /// encoded bytes are returned untouched.
    pub async fn request(&self, as_raster: bool) -> Result<MapImage, DownloaderError> {
        info!("Downloading {}", self.url_with_key("REDACTED"));

        let response = self.client.get(self.generate_url()).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("HTTP {} body: {}", status, body);
            return Err(DownloaderError::RequestFailed {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        debug!("Received {} bytes", bytes.len());

        if as_raster {
            Ok(MapImage::Raster(image_bytes_to_raster(&bytes)?))
        } else {
            Ok(MapImage::Encoded(bytes.to_vec()))
        }
    }
}

/// Decode PNG/JPEG/GIF bytes into a 3-channel raster
pub fn image_bytes_to_raster(bytes: &[u8]) -> Result<RgbImage, DownloaderError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

fn validate_parameters(
    location: (f64, f64),
    zoom: u32,
    size: (u32, u32),
    maptype: &str,
    key: &str,
) -> Result<MapType, InvalidParameter> {
    if zoom > MAX_ZOOM {
        return Err(InvalidParameter::Zoom(zoom));
    }

    let maptype = maptype.parse::<MapType>()?;

    let (width, height) = size;
    if !(1..=MAX_SIZE).contains(&width) || !(1..=MAX_SIZE).contains(&height) {
        return Err(InvalidParameter::Size(width, height));
    }

    let (lat, lon) = location;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(InvalidParameter::Location(lat, lon));
    }

    if key.trim().is_empty() {
        return Err(InvalidParameter::MissingKey);
    }

    Ok(maptype)
}
