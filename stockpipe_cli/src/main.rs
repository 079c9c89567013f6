mod output;

use anyhow::{bail, Result};
use clap::Parser;
use stockpipe_lib::{
    abort_message, AbortReason, MissingFieldPolicy, Pipeline, PipelineConfig, RunOutcome,
};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "stockpipe")]
#[command(about = "Fetch daily stock prices from Alpha Vantage and store them in SQLite")]
struct Cli {
    /// Ticker symbol to fetch
    #[arg(default_value = "IBM")]
    symbol: String,

    /// Database name (overrides STOCK_DB_NAME)
    #[arg(long)]
    db_name: Option<String>,

    /// Directory holding the database file (overrides STOCK_DB_HOST)
    #[arg(long)]
    db_host: Option<String>,

    /// Handling of absent numeric fields: zero or reject (overrides STOCK_MISSING_FIELDS)
    #[arg(long)]
    missing_fields: Option<MissingFieldPolicy>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stockpipe=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let outcome = match PipelineConfig::from_env() {
        Ok(config) => Pipeline::new(apply_overrides(config, &cli))
            .fetch_and_store(&cli.symbol)
            .await,
        Err(e) => {
            let reason = AbortReason::from(e);
            tracing::error!("{}", abort_message(&cli.symbol, &reason));
            RunOutcome::Aborted(reason)
        }
    };

    output::print_outcome(&outcome, &cli.output)?;

    if let RunOutcome::Aborted(reason) = outcome {
        bail!("{}", reason);
    }
    Ok(())
}

fn apply_overrides(mut config: PipelineConfig, cli: &Cli) -> PipelineConfig {
    if let Some(ref name) = cli.db_name {
        config.db.name = Some(name.clone());
    }
    if let Some(ref host) = cli.db_host {
        config.db.host = host.clone();
    }
    if let Some(policy) = cli.missing_fields {
        config = config.with_missing_fields(policy);
    }
    config
}
