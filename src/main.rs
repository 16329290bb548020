use clap::Parser;
use stockwatch_cli::config::{CliArgs, RunConfig};
use stockwatch_cli::runner;
use stockwatch_core::RunOutcome;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let outcome = match RunConfig::try_from(args) {
        Ok(config) => runner::run(config).await,
        Err(err) => {
            error!(target: "stockwatch", %err, "invalid configuration");
            RunOutcome::ConfigInvalid(err.to_string())
        }
    };

    if let RunOutcome::Matched { summary, records } = &outcome {
        info!(
            target: "stockwatch",
            total = summary.total_available,
            stores = records.len(),
            states = summary.per_state.len(),
            "run complete"
        );
    }

    std::process::exit(outcome.exit_code());
}
