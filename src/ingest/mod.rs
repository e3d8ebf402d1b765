//! Offline bulk ingestion.
//!
//! Turns the published SCADA archive of a wind farm into the files the data
//! endpoint serves: one readings CSV per calendar month and a `metadata.json`
//! of turbine positions. Runs once, ahead of time; the pipeline itself never
//! touches the archive.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use thiserror::Error;
use tracing::{info, warn};

use crate::partition::MonthKey;
use crate::source::{MetadataRecord, Reading, TurbineId};

/// Published archive set for the Penmanshiel wind farm.
pub const DEFAULT_ARCHIVE_ROOT: &str = "https://zenodo.org/record/5946808/files";

/// Archive files holding the per-turbine SCADA exports.
pub const DEFAULT_ARCHIVES: [&str; 2] = [
    "Penmanshiel_SCADA_2021_WT01-10_3108.zip",
    "Penmanshiel_SCADA_2021_WT11-15_3108.zip",
];

/// Static metadata file published alongside the archives.
pub const DEFAULT_METADATA_FILE: &str = "Penmanshiel_WT_static.csv";

/// Prefix of archive entries that carry turbine readings.
pub const DEFAULT_TURBINE_PREFIX: &str = "Turbine_Data_Penmanshiel_";

/// Days the raw timestamps are shifted forward so the dataset looks current.
pub const DEFAULT_TIMESHIFT_DAYS: i64 = 730;

/// Column headers of the per-turbine CSVs inside the archives.
const RAW_TIMESTAMP_COL: &str = "# Date and time";
const RAW_WIND_SPEED_COL: &str = "Wind speed (m/s)";
const RAW_POWER_COL: &str = "Power (kW)";

/// Lines of preamble before the header row in each archive CSV.
const PREAMBLE_LINES: usize = 9;

/// Errors that can occur during bulk ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A file could not be downloaded.
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// An archive could not be opened or read.
    #[error("failed to read archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// A required column is missing from a CSV.
    #[error("missing column '{column}' in {context}")]
    MissingColumn { column: String, context: String },

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for one ingestion run.
#[derive(Debug, Clone)]
pub struct PrepConfig {
    /// Root URL the archive files are published under.
    pub archive_root_url: String,
    /// Archive file names to download and split.
    pub archives: Vec<String>,
    /// Static metadata file name to download and convert.
    pub metadata_file: String,
    /// Directory downloads land in; monthly files go to `{data_dir}/turbine-data`.
    pub data_dir: PathBuf,
    /// Prefix of archive entries holding turbine readings.
    pub turbine_prefix: String,
    /// Days to shift raw timestamps forward.
    pub timeshift_days: i64,
    /// Re-download files that already exist locally.
    pub force_redownload: bool,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            archive_root_url: DEFAULT_ARCHIVE_ROOT.to_string(),
            archives: DEFAULT_ARCHIVES.iter().map(|s| s.to_string()).collect(),
            metadata_file: DEFAULT_METADATA_FILE.to_string(),
            data_dir: PathBuf::from("./data"),
            turbine_prefix: DEFAULT_TURBINE_PREFIX.to_string(),
            timeshift_days: DEFAULT_TIMESHIFT_DAYS,
            force_redownload: false,
        }
    }
}

impl PrepConfig {
    /// Directory the monthly CSVs and metadata JSON are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("turbine-data")
    }
}

/// Run the full ingestion: download, split into monthly files, convert
/// metadata.
pub async fn prepare_dataset(
    client: &reqwest::Client,
    config: &PrepConfig,
) -> Result<(), IngestError> {
    let mut filenames = config.archives.clone();
    filenames.push(config.metadata_file.clone());
    download_archives(
        client,
        &config.archive_root_url,
        &filenames,
        &config.data_dir,
        config.force_redownload,
    )
    .await?;

    let output_dir = config.output_dir();
    let zip_paths: Vec<PathBuf> = config
        .archives
        .iter()
        .map(|name| config.data_dir.join(name))
        .collect();
    split_monthly_files(
        &zip_paths,
        &output_dir,
        &config.turbine_prefix,
        ChronoDuration::days(config.timeshift_days),
    )?;

    write_metadata_file(
        &config.data_dir.join(&config.metadata_file),
        &output_dir.join("metadata.json"),
    )?;
    Ok(())
}

/// Download `filenames` from `root_url` into `destination_dir`, skipping
/// files already present unless `force_redownload` is set.
pub async fn download_archives(
    client: &reqwest::Client,
    root_url: &str,
    filenames: &[String],
    destination_dir: &Path,
    force_redownload: bool,
) -> Result<Vec<PathBuf>, IngestError> {
    tokio::fs::create_dir_all(destination_dir).await?;

    let mut paths = Vec::with_capacity(filenames.len());
    for name in filenames {
        let destination = destination_dir.join(name);
        if destination.is_file() && !force_redownload {
            info!(file = %name, "already downloaded, pass --force to re-download");
            paths.push(destination);
            continue;
        }

        let url = format!("{}/{}", root_url.trim_end_matches('/'), name);
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::Download {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Download {
                url,
                reason: format!("status {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(|e| IngestError::Download {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&destination, &bytes).await?;
        info!(file = %name, bytes = bytes.len(), "downloaded");
        paths.push(destination);
    }
    Ok(paths)
}

/// Split turbine readings out of the archives into one CSV per calendar
/// month, named `{month}.csv` under `destination_dir`.
///
/// Only entries whose name starts with `turbine_data_prefix` are read; the
/// turbine id is derived from the entry name. Raw timestamps are shifted by
/// `timeshift` before grouping.
pub fn split_monthly_files(
    zip_paths: &[PathBuf],
    destination_dir: &Path,
    turbine_data_prefix: &str,
    timeshift: ChronoDuration,
) -> Result<(), IngestError> {
    std::fs::create_dir_all(destination_dir)?;

    let mut by_month: BTreeMap<MonthKey, Vec<Reading>> = BTreeMap::new();
    for zip_path in zip_paths {
        let file = File::open(zip_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| IngestError::Archive {
            path: zip_path.clone(),
            message: e.to_string(),
        })?;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| IngestError::Archive {
                path: zip_path.clone(),
                message: e.to_string(),
            })?;
            let name = entry.name().to_string();
            if !name.starts_with(turbine_data_prefix) {
                continue;
            }

            let Some(turbine_id) = turbine_id_from_entry(&name, turbine_data_prefix) else {
                warn!(entry = %name, "cannot derive a turbine id, skipping entry");
                continue;
            };

            let mut contents = String::new();
            entry.read_to_string(&mut contents)?;
            for reading in parse_turbine_entry(&contents, turbine_id, timeshift, &name)? {
                by_month
                    .entry(MonthKey::containing(reading.timestamp.date()))
                    .or_default()
                    .push(reading);
            }
        }
    }

    for (month, rows) in &mut by_month {
        rows.sort_by(|a, b| (a.timestamp, a.turbine_id).cmp(&(b.timestamp, b.turbine_id)));

        let path = destination_dir.join(format!("{month}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows.iter() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!(%month, rows = rows.len(), path = %path.display(), "monthly file written");
    }
    Ok(())
}

/// Convert the static metadata CSV into the `metadata.json` record array.
///
/// All-empty rows are dropped; `Alternative Title` values like `T01` become
/// numeric turbine ids so metadata and monthly files key the same way.
pub fn write_metadata_file(
    metadata_src_path: &Path,
    destination_path: &Path,
) -> Result<(), IngestError> {
    let file = File::open(metadata_src_path)?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();

    let context = metadata_src_path.display().to_string();
    let title_idx = column_index(&headers, "Alternative Title", &context)?;
    let lat_idx = column_index(&headers, "Latitude", &context)?;
    let lon_idx = column_index(&headers, "Longitude", &context)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        match parse_metadata_record(&record, title_idx, lat_idx, lon_idx) {
            Some(parsed) => records.push(parsed),
            None => warn!(row = ?record, "cannot parse metadata row, skipping"),
        }
    }

    std::fs::write(destination_path, serde_json::to_string(&records)?)?;
    info!(
        turbines = records.len(),
        path = %destination_path.display(),
        "metadata file written"
    );
    Ok(())
}

/// Derive the numeric turbine id from an archive entry name, e.g.
/// `Turbine_Data_Penmanshiel_T01_2021.csv` with the default prefix → `1`.
fn turbine_id_from_entry(entry_name: &str, prefix: &str) -> Option<TurbineId> {
    let rest = entry_name.strip_prefix(prefix)?;
    let fragment = rest.split('_').next()?;
    fragment.trim_start_matches(['T', 't']).parse().ok()
}

/// Parse one archive CSV: skip the preamble, locate the raw columns by
/// header, keep parseable rows with shifted timestamps.
fn parse_turbine_entry(
    contents: &str,
    turbine_id: TurbineId,
    timeshift: ChronoDuration,
    entry_name: &str,
) -> Result<Vec<Reading>, IngestError> {
    let mut lines = contents.lines();
    for _ in 0..PREAMBLE_LINES {
        lines.next();
    }
    let data = lines.collect::<Vec<_>>().join("\n");

    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let headers = reader.headers()?.clone();
    let timestamp_idx = column_index(&headers, RAW_TIMESTAMP_COL, entry_name)?;
    let wind_idx = column_index(&headers, RAW_WIND_SPEED_COL, entry_name)?;
    let power_idx = column_index(&headers, RAW_POWER_COL, entry_name)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let record = result?;
        match parse_reading_record(&record, timestamp_idx, wind_idx, power_idx) {
            Some((timestamp, wind_speed_m_s, power_kw)) => rows.push(Reading {
                timestamp: timestamp + timeshift,
                turbine_id,
                wind_speed_m_s,
                power_kw,
            }),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(entry = %entry_name, skipped, "skipped unparsable rows");
    }
    Ok(rows)
}

fn column_index(
    headers: &csv::StringRecord,
    column: &str,
    context: &str,
) -> Result<usize, IngestError> {
    headers
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| IngestError::MissingColumn {
            column: column.to_string(),
            context: context.to_string(),
        })
}

fn parse_reading_record(
    record: &csv::StringRecord,
    timestamp_idx: usize,
    wind_idx: usize,
    power_idx: usize,
) -> Option<(NaiveDateTime, f64, f64)> {
    let timestamp = parse_raw_timestamp(record.get(timestamp_idx)?)?;
    let wind_speed = record.get(wind_idx)?.trim().parse().ok()?;
    let power = record.get(power_idx)?.trim().parse().ok()?;
    Some((timestamp, wind_speed, power))
}

fn parse_raw_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M"))
        .ok()
}

fn parse_metadata_record(
    record: &csv::StringRecord,
    title_idx: usize,
    lat_idx: usize,
    lon_idx: usize,
) -> Option<MetadataRecord> {
    let turbine_id = record
        .get(title_idx)?
        .trim()
        .trim_start_matches(['T', 't'])
        .parse()
        .ok()?;
    let latitude = record.get(lat_idx)?.trim().parse().ok()?;
    let longitude = record.get(lon_idx)?.trim().parse().ok()?;
    Some(MetadataRecord {
        turbine_id,
        latitude,
        longitude,
    })
}
