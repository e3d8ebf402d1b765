//! Wire types shared by the data source client and its consumers.
//!
//! The remote endpoint serves one CSV of readings per month and a single JSON
//! array of static turbine metadata. Both are owned by the source and
//! read-only to this system.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a single turbine within the farm.
pub type TurbineId = u32;

/// Errors that can occur while fetching from the remote data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The endpoint could not be reached, or answered with a non-2xx status.
    /// Not retried here; the caller owns retry policy.
    #[error("source unavailable ({url}): {reason}")]
    Unavailable { url: String, reason: String },

    /// The endpoint answered but the payload could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Result type alias for data source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// One SCADA sample. Produced externally every 10 minutes per turbine;
/// immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sample instant.
    #[serde(rename = "Timestamp", with = "scada_timestamp")]
    pub timestamp: NaiveDateTime,

    /// Turbine the sample belongs to.
    #[serde(rename = "TurbineName")]
    pub turbine_id: TurbineId,

    /// Averaged wind speed over the sample interval.
    #[serde(rename = "Wind speed (m/s)")]
    pub wind_speed_m_s: f64,

    /// Averaged power output over the sample interval.
    #[serde(rename = "Power (kW)")]
    pub power_kw: f64,
}

/// Geographic position of a turbine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Static per-turbine reference data, keyed by turbine id. Fetched once per
/// run, never mutated.
pub type TurbineMetadata = BTreeMap<TurbineId, Coordinates>;

/// One record of the remote `metadata.json` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "TurbineName")]
    pub turbine_id: TurbineId,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

/// (De)serialization for SCADA timestamps.
///
/// The monthly CSVs use a space separator (`2023-01-01 00:10:00`); a `T`
/// separator is accepted on input as well.
pub mod scada_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(WIRE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, WIRE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
