//! End-to-end pipeline tests against an in-memory data source.
//!
//! Exercises the full fetch → summarize → render → store chain with the
//! three-sample fixture (powers 500/200/300 for turbine 1) and checks the
//! stored artifact.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use tempfile::TempDir;

use windmap::partition::MonthKey;
use windmap::pipeline::Pipeline;
use windmap::sink::HtmlSink;
use windmap::source::{
    Coordinates, DataSource, Reading, SourceResult, TurbineMetadata,
};
use windmap::summary;

struct FixtureSource;

#[async_trait]
impl DataSource for FixtureSource {
    async fn fetch_readings(&self, _month: &MonthKey) -> SourceResult<Vec<Reading>> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time");
        Ok([500.0, 200.0, 300.0]
            .iter()
            .enumerate()
            .map(|(i, power_kw)| Reading {
                timestamp: start + Duration::minutes(10 * i as i64),
                turbine_id: 1,
                wind_speed_m_s: 5.0,
                power_kw: *power_kw,
            })
            .collect())
    }

    async fn fetch_metadata(&self) -> SourceResult<TurbineMetadata> {
        let mut metadata = TurbineMetadata::new();
        metadata.insert(
            1,
            Coordinates {
                latitude: 55.902502,
                longitude: -2.306389,
            },
        );
        Ok(metadata)
    }
}

fn fixture_pipeline(dir: &TempDir) -> Pipeline {
    Pipeline::new(Arc::new(FixtureSource), HtmlSink::new(dir.path()))
}

fn month() -> MonthKey {
    "2023-01-01".parse().expect("valid month")
}

#[tokio::test]
async fn test_end_to_end_run_produces_map_for_the_fixture() {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = fixture_pipeline(&dir);

    let report = pipeline.run(&month()).await.expect("run should succeed");
    assert_eq!(report.month, month());
    assert_eq!(report.turbines, 1);

    let html = std::fs::read_to_string(&report.artifact_path).expect("artifact readable");
    assert!(html.starts_with("<html>"));
    // the turbine-1 marker is present at its position
    assert!(html.contains("55.902502"));
    assert!(html.contains("scattermapbox"));
}

#[tokio::test]
async fn test_fixture_energy_is_the_sum_of_powers_over_six() {
    let readings = FixtureSource
        .fetch_readings(&month())
        .await
        .expect("fixture readings");
    let energy = summary::summarize(&readings);
    assert!((energy[&1] - 1000.0 / 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_rerunning_a_partition_overwrites_its_artifact() {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = fixture_pipeline(&dir);

    let first = pipeline.run(&month()).await.expect("first run");
    let second = pipeline.run(&month()).await.expect("second run");
    assert_eq!(first.artifact_path, second.artifact_path);

    // exactly one artifact for the partition, no accumulation
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .expect("output dir readable")
        .collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_distinct_months_write_distinct_artifacts() {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = fixture_pipeline(&dir);

    let january = pipeline
        .run(&"2023-01-01".parse().expect("valid month"))
        .await
        .expect("january run");
    let february = pipeline
        .run(&"2023-02-01".parse().expect("valid month"))
        .await
        .expect("february run");

    assert_ne!(january.artifact_path, february.artifact_path);
    assert!(january.artifact_path.is_file());
    assert!(february.artifact_path.is_file());
}
