//! The monthly ETL pipeline: fetch, summarize, render, store.
//!
//! A [`Pipeline`] is an explicit value holding its data source and sink,
//! invoked with the month partition as a plain argument. Steps run strictly
//! in sequence within a run; runs for distinct months are independent and may
//! execute concurrently (their sink keys never collide).

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::partition::MonthKey;
use crate::sink::{HtmlSink, SinkError};
use crate::source::{DataSource, SourceError};
use crate::summary;
use crate::viz::{self, RenderError};

/// Errors from a single pipeline run, one variant per step.
#[derive(Debug, Error)]
pub enum RunError {
    /// The monthly readings could not be fetched.
    #[error("fetching readings failed: {0}")]
    FetchReadings(#[source] SourceError),

    /// The turbine metadata could not be fetched.
    #[error("fetching turbine metadata failed: {0}")]
    FetchMetadata(#[source] SourceError),

    /// The map document could not be rendered.
    #[error("rendering the map failed: {0}")]
    RenderMap(#[source] RenderError),

    /// The rendered document could not be stored.
    #[error("storing the visualisation failed: {0}")]
    StoreVisualisation(#[source] SinkError),
}

impl RunError {
    /// Name of the failing step, for failure events.
    pub fn step(&self) -> &'static str {
        match self {
            RunError::FetchReadings(_) => "fetch_readings",
            RunError::FetchMetadata(_) => "fetch_metadata",
            RunError::RenderMap(_) => "render_map",
            RunError::StoreVisualisation(_) => "store_visualisation",
        }
    }
}

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Month partition the run covered.
    pub month: MonthKey,
    /// Number of turbines with readings in the month.
    pub turbines: usize,
    /// Path of the stored visualisation artifact.
    pub artifact_path: PathBuf,
}

/// One month's ETL, wired as ordinary function calls over explicit parts.
pub struct Pipeline {
    source: Arc<dyn DataSource>,
    sink: HtmlSink,
}

impl Pipeline {
    /// Assemble a pipeline from its data source and output sink.
    pub fn new(source: Arc<dyn DataSource>, sink: HtmlSink) -> Self {
        Self { source, sink }
    }

    /// Execute the pipeline for one month partition.
    ///
    /// The first failing step aborts the run; its error names the step so the
    /// caller can build a failure event. No step is retried here.
    pub async fn run(&self, month: &MonthKey) -> Result<RunReport, RunError> {
        let readings = self
            .source
            .fetch_readings(month)
            .await
            .map_err(RunError::FetchReadings)?;
        debug!(rows = readings.len(), %month, "readings fetched");

        let energy = summary::summarize(&readings);

        let metadata = self
            .source
            .fetch_metadata()
            .await
            .map_err(RunError::FetchMetadata)?;

        let html = viz::render(&energy, &metadata).map_err(RunError::RenderMap)?;

        let artifact_path = self
            .sink
            .store(Some(month), &html)
            .await
            .map_err(RunError::StoreVisualisation)?;

        info!(%month, turbines = energy.len(), "monthly visualisation complete");
        Ok(RunReport {
            month: *month,
            turbines: energy.len(),
            artifact_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use tempfile::TempDir;

    use crate::source::{Coordinates, Reading, SourceResult, TurbineMetadata};

    struct StaticSource {
        readings: Vec<Reading>,
        metadata: TurbineMetadata,
    }

    #[async_trait]
    impl DataSource for StaticSource {
        async fn fetch_readings(&self, _month: &MonthKey) -> SourceResult<Vec<Reading>> {
            Ok(self.readings.clone())
        }

        async fn fetch_metadata(&self) -> SourceResult<TurbineMetadata> {
            Ok(self.metadata.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DataSource for FailingSource {
        async fn fetch_readings(&self, month: &MonthKey) -> SourceResult<Vec<Reading>> {
            Err(SourceError::Unavailable {
                url: format!("http://localhost:8000/{month}.csv"),
                reason: "connection refused".to_string(),
            })
        }

        async fn fetch_metadata(&self) -> SourceResult<TurbineMetadata> {
            Err(SourceError::Unavailable {
                url: "http://localhost:8000/metadata.json".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    fn fixture_source() -> StaticSource {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time");
        let readings = [500.0, 200.0, 300.0]
            .iter()
            .enumerate()
            .map(|(i, power_kw)| Reading {
                timestamp: start + Duration::minutes(10 * i as i64),
                turbine_id: 1,
                wind_speed_m_s: 5.0,
                power_kw: *power_kw,
            })
            .collect();

        let mut metadata = TurbineMetadata::new();
        metadata.insert(
            1,
            Coordinates {
                latitude: 55.902502,
                longitude: -2.306389,
            },
        );

        StaticSource { readings, metadata }
    }

    fn month() -> MonthKey {
        "2023-01-01".parse().expect("valid month")
    }

    #[tokio::test]
    async fn test_run_stores_partitioned_artifact() {
        let dir = TempDir::new().expect("tempdir");
        let pipeline = Pipeline::new(Arc::new(fixture_source()), HtmlSink::new(dir.path()));

        let report = pipeline.run(&month()).await.expect("run should succeed");
        assert_eq!(report.turbines, 1);
        assert_eq!(report.artifact_path, dir.path().join("viz-2023-01-01.html"));

        let html = std::fs::read_to_string(&report.artifact_path).expect("artifact readable");
        assert!(html.starts_with("<html>"));
    }

    #[tokio::test]
    async fn test_run_error_names_the_failing_step() {
        let dir = TempDir::new().expect("tempdir");
        let pipeline = Pipeline::new(Arc::new(FailingSource), HtmlSink::new(dir.path()));

        let err = pipeline.run(&month()).await.expect_err("run should fail");
        assert_eq!(err.step(), "fetch_readings");
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_run_fails_when_sink_is_unwritable() {
        let dir = TempDir::new().expect("tempdir");
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "a file, not a directory").expect("fixture");

        let pipeline = Pipeline::new(Arc::new(fixture_source()), HtmlSink::new(&blocker));
        let err = pipeline.run(&month()).await.expect_err("run should fail");
        assert_eq!(err.step(), "store_visualisation");
    }
}
