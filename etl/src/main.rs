use clap::{Parser, Subcommand};
use shared::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod pipeline;
mod repositories;

use pipeline::{Pipeline, StageError};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch, normalize and load crypto price candles")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Lookback window in days (overrides DAYS)
    #[arg(long, global = true)]
    days: Option<u32>,

    /// Candle width in minutes (overrides INTERVAL_MIN)
    #[arg(long, global = true)]
    interval_min: Option<u32>,

    /// Spike threshold as a fraction, e.g. 0.10 (overrides SPIKE_PCT)
    #[arg(long, global = true)]
    spike_pct: Option<f64>,

    /// Directory for raw and transformed CSV files (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Fetch CoinGecko and Kraken data into raw CSV files
    Extract,
    /// Normalize and combine the raw CSV files
    Transform,
    /// Replace the warehouse table with the transformed CSV
    Load,
    /// Extract, transform and load in one go
    Run,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        let pipeline = &mut config.pipeline;
        if let Some(days) = self.days {
            pipeline.days = days;
        }
        if let Some(interval_min) = self.interval_min {
            pipeline.interval_min = interval_min;
        }
        if let Some(spike_pct) = self.spike_pct {
            pipeline.spike_pct = spike_pct;
        }
        if let Some(data_dir) = &self.data_dir {
            pipeline.data_dir = data_dir.clone();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);

    let span = info_span!("etl", run_id = %Uuid::new_v4(), command = ?cli.command);
    let result = run(cli.command, config).instrument(span.clone()).await;

    let _guard = span.enter();
    match result {
        Ok(()) => {
            info!("ETL {:?} finished", cli.command);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = %e.stage, "ETL {:?} failed at {}: {:#}", cli.command, e.stage, e.cause);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<(), StageError> {
    let database_url = config.database_url_or_default().to_string();
    let pipeline = Pipeline::new(config.fetch, config.pipeline);
    info!(
        "Pipeline {} / {} every {}m over {} days, data in {}",
        pipeline.config().coin_id,
        pipeline.config().kraken_pair,
        pipeline.config().interval_min,
        pipeline.config().days,
        pipeline.config().data_dir.display()
    );

    match command {
        Command::Extract => {
            pipeline.extract().await?;
        }
        Command::Transform => {
            pipeline.transform()?;
        }
        Command::Load => {
            pipeline.load(&database_url, None).await?;
        }
        Command::Run => {
            let extracted = pipeline.extract().await?;
            let combined = pipeline.transform_tables(extracted)?;
            pipeline.load(&database_url, Some(combined.into_vec())).await?;
        }
    }
    Ok(())
}
