use anyhow::Result;
use cctv_incidents::api::rest::{AppState, RestApi};
use cctv_incidents::config;
use cctv_incidents::db::DatabaseService;
use cctv_incidents::security::SecurityService;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

async fn run_app() -> Result<()> {
    // Optional config file as the first argument, defaults otherwise
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.api.log_level.as_str()),
    )
    .init();
    info!("Starting CCTV incident service");

    match &config_path {
        Some(path) => info!("Configuration loaded from {:?}", path),
        None => info!("No config file given, using defaults"),
    }

    let database = DatabaseService::new(&config.database).await?;

    let security = Arc::new(SecurityService::new(config.security.clone()));

    let state = AppState::new(database, security, config.pagination);

    RestApi::new(&config.api, state).run().await?;

    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        error!("Application error: {:#}", e);
        eprintln!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
