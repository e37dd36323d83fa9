use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use sunshine_etl::config::PipelineConfig;
use sunshine_etl::logging;
use sunshine_etl::orchestrator::{self, RunOptions};

#[derive(Parser)]
#[command(name = "sunshine_etl")]
#[command(about = "Salary-disclosure ETL pipeline: raw CSVs to analytics JSON")]
#[command(version = "0.1.0")]
struct Cli {
    /// Run only this stage (e.g. ingest, link_persons, analytics_basic)
    #[arg(long)]
    stage: Option<String>,

    /// Resume from this stage, trusting earlier outputs on disk
    #[arg(long, conflicts_with = "stage")]
    from: Option<String>,

    /// Only run the validation stage
    #[arg(long)]
    validate_only: bool,

    /// Skip the validation stage
    #[arg(long, conflicts_with = "validate_only")]
    skip_validation: bool,

    /// Path to a config file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    logging::init_logging();

    let cli = Cli::parse();
    let config = match PipelineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load configuration: {e}");
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    let options = RunOptions {
        stage: cli.stage,
        from: cli.from,
        validate_only: cli.validate_only,
        skip_validation: cli.skip_validation,
    };

    println!("🌞 Salary Disclosure ETL Pipeline");
    println!("   Started: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    match orchestrator::run(&config, &options) {
        Ok(report) if report.success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("pipeline could not start: {e}");
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}
