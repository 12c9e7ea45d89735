//! NEWS DIGEST - fetch top headlines and email them as an HTML digest

mod config;
mod consts;
mod dispatch;
mod logic;
mod network;
mod render;
mod utils;

use crate::config::{Config, ConfigError};
use crate::dispatch::LettreProvider;
use crate::logic::{run, RunError};
use crate::network::HttpNewsApi;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("═══════════════════════════════════════════");
    log::info!("  NEWS DIGEST {}", env!("CARGO_PKG_VERSION"));
    log::info!("═══════════════════════════════════════════");

    let (config, api, provider) = match prepare(Config::from_env()) {
        Ok(parts) => parts,
        Err(e) => {
            report(&e);
            return ExitCode::from(e.exit_code());
        }
    };

    match run(Ok(config), &api, &provider).await {
        Ok(dispatched) => {
            log::info!(
                "Done ({:?} → {}, \"{}\")",
                dispatched.mode, dispatched.recipient, dispatched.subject
            );
            if let Some(url) = dispatched.preview_url {
                log::info!("Preview URL: {}", url);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Configuration first, so a missing variable is reported even when a client cannot be built
fn prepare(
    config: Result<Config, ConfigError>,
) -> Result<(Config, HttpNewsApi, LettreProvider), RunError> {
    let config = config?;
    let api = HttpNewsApi::new(&config.api_base_url).map_err(RunError::Client)?;
    let provider = LettreProvider::new().map_err(RunError::Client)?;
    Ok((config, api, provider))
}

fn report(error: &RunError) {
    log::error!("❌ {}", error);
    if let RunError::Delivery(delivery) = error {
        for line in delivery.remediation() {
            log::error!("   {}", line);
        }
    }
}
