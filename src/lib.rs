//! windmap: wind-farm SCADA ETL pipeline.
//!
//! Fetches per-month turbine readings from a remote endpoint, reduces them to
//! cumulative monthly energy per turbine and renders the result as a
//! standalone map document, one artifact per month partition.

// Core modules
pub mod cli;
pub mod config;
pub mod ingest;
pub mod notify;
pub mod partition;
pub mod pipeline;
pub mod schedule;
pub mod sink;
pub mod source;
pub mod summary;
pub mod viz;

// Re-export commonly used error types
pub use config::ConfigError;
pub use ingest::IngestError;
pub use partition::ParseMonthError;
pub use pipeline::RunError;
pub use sink::SinkError;
pub use source::SourceError;
pub use viz::RenderError;
