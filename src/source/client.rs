//! HTTP client for the remote SCADA data endpoint.
//!
//! The endpoint serves `GET {root}/{month}.csv` for readings and
//! `GET {root}/metadata.json` for turbine positions. Every call re-fetches;
//! nothing is cached and failed requests are not retried at this layer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::{
    Coordinates, MetadataRecord, Reading, SourceError, SourceResult, TurbineMetadata,
};
use super::DataSource;
use crate::partition::MonthKey;

/// Data source client backed by the remote HTTP endpoint.
pub struct HttpSource {
    http_client: Client,
    root_url: String,
}

impl HttpSource {
    /// Create a client for the endpoint rooted at `root_url`.
    ///
    /// `timeout` bounds each individual request; the fetch itself is not
    /// retried on failure.
    pub fn new(root_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            root_url: root_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Root URL the client fetches from.
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    fn readings_url(&self, month: &MonthKey) -> String {
        format!("{}/{}.csv", self.root_url, month)
    }

    fn metadata_url(&self) -> String {
        format!("{}/metadata.json", self.root_url)
    }

    async fn get_bytes(&self, url: &str) -> SourceResult<Vec<u8>> {
        let response =
            self.http_client
                .get(url)
                .send()
                .await
                .map_err(|e| SourceError::Unavailable {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable {
                url: url.to_string(),
                reason: format!("status {status}"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Unavailable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch_readings(&self, month: &MonthKey) -> SourceResult<Vec<Reading>> {
        let url = self.readings_url(month);
        let body = self.get_bytes(&url).await?;
        let readings = decode_readings_csv(&body).map_err(|e| SourceError::Decode {
            url,
            message: e.to_string(),
        })?;
        debug!(rows = readings.len(), %month, "retrieved readings");
        Ok(readings)
    }

    async fn fetch_metadata(&self) -> SourceResult<TurbineMetadata> {
        let url = self.metadata_url();
        let body = self.get_bytes(&url).await?;
        let metadata = decode_metadata_json(&body).map_err(|e| SourceError::Decode {
            url,
            message: e.to_string(),
        })?;
        debug!(turbines = metadata.len(), "retrieved turbine metadata");
        Ok(metadata)
    }
}

/// Decode a monthly readings CSV (wire headers, see [`Reading`]).
pub(crate) fn decode_readings_csv(bytes: &[u8]) -> Result<Vec<Reading>, csv::Error> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader.deserialize().collect()
}

/// Decode the `metadata.json` record array into an id-keyed map.
pub(crate) fn decode_metadata_json(bytes: &[u8]) -> Result<TurbineMetadata, serde_json::Error> {
    let records: Vec<MetadataRecord> = serde_json::from_slice(bytes)?;
    Ok(records
        .into_iter()
        .map(|record| {
            (
                record.turbine_id,
                Coordinates {
                    latitude: record.latitude,
                    longitude: record.longitude,
                },
            )
        })
        .collect())
}
