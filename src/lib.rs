pub mod cli;
pub mod core;
pub mod providers;
pub mod server;
pub mod service;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::throttle::Throttle;
use crate::providers::ExchangeRateApiProvider;
use crate::service::RateService;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

pub enum AppCommand {
    Serve { ephemeral: bool },
    History { limit: usize },
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Wires the throttle, upstream provider and store into a service.
pub fn build_service(config: &AppConfig, ephemeral: bool) -> Result<Arc<RateService>> {
    let store = store::open_store(config, ephemeral)?;
    let source = ExchangeRateApiProvider::new(&config.provider.url)
        .context("Failed to build upstream HTTP client")?;

    Ok(Arc::new(RateService::new(
        Arc::new(Throttle::new()),
        Arc::new(source),
        store,
    )))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    match command {
        AppCommand::Serve { ephemeral } => {
            info!("USD/RUB rate service starting...");
            let service = build_service(&config, ephemeral)?;
            let listener = TcpListener::bind(&config.server.bind)
                .await
                .with_context(|| format!("Failed to bind {}", config.server.bind))?;
            server::serve(listener, service, server::shutdown_signal()).await
        }
        AppCommand::History { limit } => {
            let store = store::open_store(&config, false)?;
            cli::history::show_history(store.as_ref(), limit).await
        }
    }
}
