//! `binday` binary: serves council bin collection schedules over HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;

use binday_core::{BinService, CouncilId};
use binday_server::config::ServerConfig;
use binday_server::{BinServer, logging, registry, resolve_council};

#[actix_web::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();
    let config = ServerConfig::parse();
    logging::init_tracing(config.log_json);

    let client = Client::builder()
        .timeout(config.timeout())
        .build()
        .context("failed to build HTTP client")?;

    let service = BinService::new(Arc::new(registry(&client, &config))).with_timeout(config.timeout());
    let council = CouncilId(config.council.clone());

    let (meta, kind) = resolve_council(&service, &council)?;
    tracing::info!(
        %council,
        name = %meta.name,
        ?kind,
        timeout_secs = config.timeout_secs,
        "serving council"
    );

    let running = BinServer::new(Arc::new(service), council)
        .bind(config.bind_addr.as_str(), config.port)
        .workers(config.workers)
        .start()
        .with_context(|| format!("failed to bind {}:{}", config.bind_addr, config.port))?;

    running.wait().await.context("server exited with an error")
}
