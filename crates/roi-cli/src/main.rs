//! `rundeck-roi` - add the ROI hours-saved field to every Rundeck job
//!
//! Reads the server URL and token from the environment, then reconciles
//! each selected project. Dry run unless `--apply` is given.

mod cli;
mod output;
mod settings;

use anyhow::Context;
use cli::{LogFormat, Options};
use roi_client::RundeckClient;
use roi_core::Reconciler;
use settings::Settings;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli::command().get_matches();
    let options = Options::from_matches(&matches);
    init_tracing(options.log_format);

    match run(&options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(options: &Options) -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    let client = RundeckClient::new(settings.client_config())
        .context("failed to build Rundeck client")?;
    tracing::debug!(url = %settings.url, api_version = settings.api_version, "connecting");

    let config = options.reconciler_config();
    println!("{}", output::header(&config));

    // An unresolved plugin name is reported, not a configuration error
    let report = Reconciler::new(&client, config).run().await;
    println!("{}", output::report(&report));
    Ok(())
}

/// Log to stderr so stdout carries only the report
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}
