//! Bulk download: one map per row of a CSV table.

use crate::{DownloaderError, GoogleMapsDownloader};
use log::*;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::{Path, PathBuf};

/// One input row. Extra columns in the table are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BulkRecord {
    pub id: i64,
    pub group: i64,
    #[serde(deserialize_with = "zero_or_one")]
    pub is_public: u8,
    pub latitude: f64,
    pub longitude: f64,
}

impl BulkRecord {
    pub fn location(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    pub fn output_filename(&self) -> String {
        format!("id{}_group{}_public{}.png", self.id, self.group, self.is_public)
    }
}

fn zero_or_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    match u8::deserialize(deserializer)? {
        flag @ (0 | 1) => Ok(flag),
        other => Err(serde::de::Error::custom(format!("is_public must be 0 or 1, got {}", other))),
    }
}

/// Parameters shared by every row of a batch
#[derive(Debug, Clone)]
pub struct BulkOptions {
    pub zoom: u32,
    pub size: (u32, u32),
    pub maptype: String,
    pub secret_key: String,
    pub output_dir: PathBuf,
    /// Endpoint override, `None` for the public API
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    /// 1-based data row, not counting the header
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BulkReport {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<RowFailure>,
}

impl BulkReport {
    pub fn total(&self) -> usize {
        self.saved.len() + self.failed.len()
    }
}

/// Open a CSV file and download a map for each row
pub async fn download_bulk_file(
    path: &Path,
    options: &BulkOptions,
) -> Result<BulkReport, DownloaderError> {
    let file = std::fs::File::open(path).map_err(|source| DownloaderError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    download_bulk(file, options).await
}

/// Download a map for each CSV row read from `reader`, one after another.
///
/// Shared parameters are validated before anything is read or requested, and an invalid
/// one aborts the batch. Failures of a single row are logged, recorded in the report and
/// skipped; files written for earlier rows stay on disk.
pub async fn download_bulk<R: Read>(
    reader: R,
    options: &BulkOptions,
) -> Result<BulkReport, DownloaderError> {
    GoogleMapsDownloader::new(
        (0.0, 0.0),
        options.zoom,
        options.size,
        &options.maptype,
        options.secret_key.as_str(),
    )?;

    std::fs::create_dir_all(&options.output_dir).map_err(|source| DownloaderError::OutputDir {
        path: options.output_dir.clone(),
        source,
    })?;

    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut report = BulkReport::default();

    for (index, result) in csv_reader.deserialize::<BulkRecord>().enumerate() {
        let row = index + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                error!("Row {}: could not parse record: {}", row, e);
                report.failed.push(RowFailure { row, message: e.to_string() });
                continue;
            }
        };

        match download_record(&record, options).await {
            Ok(path) => {
                info!("Image saved in {}", path.display());
                report.saved.push(path);
            }
            Err(e) => {
                if e.is_rate_limited() {
                    warn!("Row {}: rate limited by the API (HTTP 429)", row);
                }
                error!("Row {} ({}): {}", row, record.output_filename(), e);
                report.failed.push(RowFailure { row, message: e.to_string() });
            }
        }
    }

    Ok(report)
}

async fn download_record(
    record: &BulkRecord,
    options: &BulkOptions,
) -> Result<PathBuf, DownloaderError> {
    let mut downloader = GoogleMapsDownloader::new(
        record.location(),
        options.zoom,
        options.size,
        &options.maptype,
        options.secret_key.as_str(),
    )?;
    if let Some(base_url) = &options.base_url {
        downloader = downloader.with_base_url(base_url.as_str());
    }

    let image = downloader.request(true).await?;
    let path = options.output_dir.join(record.output_filename());
    image.save(&path)?;
    Ok(path)
}
