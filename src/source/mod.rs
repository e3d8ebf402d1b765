//! Data source client: remote SCADA readings and turbine metadata.

mod client;
mod types;

use async_trait::async_trait;

use crate::partition::MonthKey;

pub use client::HttpSource;
pub use types::{
    Coordinates, MetadataRecord, Reading, SourceError, SourceResult, TurbineId, TurbineMetadata,
};

/// Provider of raw readings and static turbine metadata.
///
/// The pipeline depends on this trait only; the HTTP client implements it for
/// production and tests swap in an in-memory source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch all readings for one month partition.
    async fn fetch_readings(&self, month: &MonthKey) -> SourceResult<Vec<Reading>>;

    /// Fetch the static turbine metadata.
    async fn fetch_metadata(&self) -> SourceResult<TurbineMetadata>;
}
