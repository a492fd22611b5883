//! ratechain - exchange rates through a tiered cache
//!
//! Resolves rate sheets through memory, file and remote tiers, either once
//! from the command line or behind an HTTP endpoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ratechain::cache::exchange_rate_chain;
use ratechain::cli::{parse_base_arg, Cli, Command};
use ratechain::config::Settings;
use ratechain::logging::init_tracing;
use ratechain::server;
use ratechain::service::ExchangeRateService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    cli.apply_overrides(&mut settings);

    match &cli.command {
        Command::Get { base, pretty } => {
            let base = parse_base_arg(base.as_deref())?;
            settings.validate(false)?;
            if settings.app_id.trim().is_empty() {
                warn!("No API key configured; only cached rates can be served");
            }

            let resolver = exchange_rate_chain(&settings).context("Failed to build tier chain")?;
            let resolved = resolver.resolve_base(&base).await?;

            if *pretty {
                println!("{}", resolved.to_json_pretty());
            } else {
                println!("{}", resolved.to_json());
            }
        }
        Command::Serve { .. } => {
            settings.validate(true)?;
            info!(
                cache_file = %settings.cache_file_template().display(),
                memory_ttl_secs = settings.memory_ttl_secs,
                file_ttl_secs = settings.file_ttl_secs,
                "Starting exchange rate service"
            );

            let resolver = exchange_rate_chain(&settings).context("Failed to build tier chain")?;
            let service = Arc::new(ExchangeRateService::new(resolver));
            server::serve(&settings.listen, service)
                .await
                .with_context(|| format!("Failed to serve on {}", settings.listen))?;
        }
    }

    Ok(())
}
