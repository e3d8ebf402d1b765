//! Command-line interface for windmap.
//!
//! Provides commands for single-month runs, the daily scheduling loop and
//! offline dataset preparation.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
