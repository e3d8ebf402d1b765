//! CLI command definitions for windmap.
//!
//! Three commands: `run` executes the pipeline for one month, `schedule`
//! starts the daily loop, and `prep-data` prepares the dataset the data
//! endpoint serves.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::config::PipelineConfig;
use crate::ingest::{self, PrepConfig};
use crate::notify::LogNotifier;
use crate::partition::MonthKey;
use crate::pipeline::Pipeline;
use crate::schedule::Scheduler;
use crate::sink::HtmlSink;
use crate::source::HttpSource;

/// Default root URL of the monthly-data endpoint.
const DEFAULT_SOURCE_URL: &str = "http://localhost:8000";

/// Default output directory for rendered visualisations.
const DEFAULT_OUTPUT_DIR: &str = "./data/output-viz";

/// Default download directory for the ingestion command.
const DEFAULT_DATA_DIR: &str = "./data";

/// Connect timeout for archive downloads (the transfers themselves are
/// unbounded; the archives are large).
const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Wind-farm SCADA ETL: monthly energy summaries and map visualisations.
#[derive(Parser)]
#[command(name = "windmap")]
#[command(about = "Compute monthly turbine energy summaries and render them as maps")]
#[command(version)]
#[command(
    long_about = "windmap fetches wind-turbine SCADA readings, reduces them to cumulative monthly energy per turbine and renders the result as a map.\n\nExample usage:\n  windmap run --month 2023-01 --source-url http://localhost:8000 --output ./data/output-viz"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the pipeline for a single month partition.
    Run(RunArgs),

    /// Run the daily scheduling loop: the current month, once per UTC day.
    Schedule(ScheduleArgs),

    /// Download the published SCADA archive and prepare the monthly CSV files
    /// and metadata JSON served by the data endpoint.
    #[command(name = "prep-data")]
    PrepData(PrepDataArgs),
}

/// Arguments for `windmap run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Month partition to run, e.g. 2023-01-01 (or 2023-01).
    #[arg(short, long)]
    pub month: MonthKey,

    /// Root URL of the data endpoint.
    #[arg(long, env = "WINDMAP_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    pub source_url: String,

    /// Output directory for rendered visualisations.
    #[arg(short, long, env = "WINDMAP_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,
}

/// Arguments for `windmap schedule`.
#[derive(Parser, Debug)]
pub struct ScheduleArgs {
    /// Root URL of the data endpoint.
    #[arg(long, env = "WINDMAP_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    pub source_url: String,

    /// Output directory for rendered visualisations.
    #[arg(short, long, env = "WINDMAP_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,
}

/// Arguments for `windmap prep-data`.
#[derive(Parser, Debug)]
pub struct PrepDataArgs {
    /// Root URL the archive files are published under.
    #[arg(long, default_value = ingest::DEFAULT_ARCHIVE_ROOT)]
    pub archive_url: String,

    /// Directory downloads and prepared files are written under.
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Days to shift raw timestamps forward.
    #[arg(long, default_value_t = ingest::DEFAULT_TIMESHIFT_DAYS)]
    pub timeshift_days: i64,

    /// Re-download archives that already exist locally.
    #[arg(short, long)]
    pub force: bool,
}

/// Parse CLI arguments without running a command.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// This is the main entry point for the windmap CLI.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_month_command(args).await,
        Commands::Schedule(args) => run_schedule_command(args).await,
        Commands::PrepData(args) => run_prep_data_command(args).await,
    }
}

async fn run_month_command(args: RunArgs) -> anyhow::Result<()> {
    let config = PipelineConfig::new()
        .with_source_root_url(args.source_url)
        .with_output_dir(args.output);
    config.validate()?;

    let pipeline = build_pipeline(&config);
    let report = pipeline.run(&args.month).await?;
    info!(
        month = %report.month,
        turbines = report.turbines,
        path = %report.artifact_path.display(),
        "run complete"
    );
    Ok(())
}

async fn run_schedule_command(args: ScheduleArgs) -> anyhow::Result<()> {
    let config = PipelineConfig::new()
        .with_source_root_url(args.source_url)
        .with_output_dir(args.output);
    config.validate()?;

    let pipeline = Arc::new(build_pipeline(&config));
    let scheduler = Scheduler::new(pipeline, Arc::new(LogNotifier));
    scheduler.run_forever().await;
    Ok(())
}

async fn run_prep_data_command(args: PrepDataArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
        .build()?;

    let config = PrepConfig {
        archive_root_url: args.archive_url,
        data_dir: args.data_dir,
        timeshift_days: args.timeshift_days,
        force_redownload: args.force,
        ..PrepConfig::default()
    };

    ingest::prepare_dataset(&client, &config).await?;
    info!(output = %config.output_dir().display(), "dataset prepared");
    Ok(())
}

fn build_pipeline(config: &PipelineConfig) -> Pipeline {
    let source = HttpSource::new(config.source_root_url.as_str(), config.request_timeout);
    let sink = HtmlSink::new(&config.output_dir);
    Pipeline::new(Arc::new(source), sink)
}
