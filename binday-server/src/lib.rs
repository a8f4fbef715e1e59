//! Actix-Web service exposing council bin collection schedules.
//!
//! Routes:
//! - `GET /health` always answers `{"status":"ok"}` without touching upstream.
//! - `GET /bin-collection` runs the configured council's pipeline.
//!
//! [`BinServer`] owns the listener lifecycle so tests can bind an ephemeral
//! port, talk to it, and shut it down again.

/// Command line and environment configuration.
pub mod config;
/// HTTP handlers.
pub mod handlers;
/// `tracing` subscriber setup.
pub mod logging;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::ServerHandle;
use actix_web::rt::task::JoinHandle;
use actix_web::{App, HttpServer, middleware, web};
use reqwest::Client;

use anyhow::bail;
use binday_core::{AdapterRegistry, BinService, CouncilId, CouncilMeta, QueryKind};
use binday_provider_bolton as bolton;
use binday_provider_bolton_legacy as bolton_legacy;

use crate::config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Pipeline service resolving council adapters.
    pub service: Arc<BinService>,
    /// Council answering `/bin-collection`.
    pub council: CouncilId,
}

/// Register the API routes on an actix app.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/bin-collection", web::get().to(handlers::bin_collection));
}

/// Build the adapter registry with every known council.
#[must_use]
pub fn registry(client: &Client, config: &ServerConfig) -> AdapterRegistry {
    let legacy = match &config.legacy_form_url {
        Some(form_url) => bolton_legacy::plugin_with_adapter(
            bolton_legacy::BoltonLegacyAdapter::with_form_url(client.clone(), form_url),
        ),
        None => bolton_legacy::plugin(client.clone()),
    };

    AdapterRegistry::new(vec![bolton::plugin(client.clone()), legacy])
}

/// Look up the configured council's metadata and query kind.
///
/// # Errors
///
/// Returns an error listing the registered councils when `council` is unknown.
pub fn resolve_council(
    service: &BinService,
    council: &CouncilId,
) -> anyhow::Result<(CouncilMeta, QueryKind)> {
    let councils = service.councils();
    let Some(meta) = councils.iter().find(|meta| &meta.id == council).cloned() else {
        let known = councils
            .iter()
            .map(|meta| meta.id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        bail!("council '{council}' is not supported (known: {known})");
    };

    let kind = service.query_kind(council)?;
    Ok((meta, kind))
}

/// HTTP listener configuration, not yet bound.
pub struct BinServer {
    state: web::Data<AppState>,
    bind_addr: String,
    port: u16,
    workers: Option<usize>,
}

impl BinServer {
    /// Create a server answering for `council`, bound to `127.0.0.1` on an
    /// ephemeral port unless [`bind`](Self::bind) says otherwise.
    #[must_use]
    pub fn new(service: Arc<BinService>, council: CouncilId) -> Self {
        Self {
            state: web::Data::new(AppState { service, council }),
            bind_addr: String::from("127.0.0.1"),
            port: 0,
            workers: None,
        }
    }

    /// Set the listen address.
    #[must_use]
    pub fn bind(mut self, bind_addr: impl Into<String>, port: u16) -> Self {
        self.bind_addr = bind_addr.into();
        self.port = port;
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Bind the listener and start serving in the background.
    ///
    /// Must be called from within an actix runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub fn start(self) -> io::Result<RunningServer> {
        let state = self.state;

        let mut server = HttpServer::new(move || {
            App::new()
                .wrap(middleware::Logger::default())
                .app_data(state.clone())
                .configure(routes)
        })
        .bind((self.bind_addr.as_str(), self.port))?;

        if let Some(workers) = self.workers {
            server = server.workers(workers);
        }

        let local_addr = server
            .addrs()
            .into_iter()
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no address bound"))?;

        let server = server.run();
        let handle = server.handle();
        let task = actix_web::rt::spawn(server);

        tracing::info!(%local_addr, "binday listening");

        Ok(RunningServer {
            local_addr,
            handle,
            task,
        })
    }
}

/// A started server; dropping it leaves the server running.
pub struct RunningServer {
    local_addr: SocketAddr,
    handle: ServerHandle,
    task: JoinHandle<io::Result<()>>,
}

impl RunningServer {
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the server task failed.
    pub async fn stop(self) -> io::Result<()> {
        self.handle.stop(true).await;
        tracing::info!(local_addr = %self.local_addr, "binday stopped");
        self.wait().await
    }

    /// Wait until the server exits, e.g. on Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the server task failed.
    pub async fn wait(self) -> io::Result<()> {
        self.task.await.map_err(io::Error::other)?
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn service() -> BinService {
        let config = ServerConfig::try_parse_from(["binday"]).expect("defaults parse");
        BinService::new(Arc::new(registry(&Client::new(), &config)))
    }

    #[test]
    fn resolves_registered_councils() {
        let service = service();

        let (meta, kind) =
            resolve_council(&service, &CouncilId::from("bolton")).expect("bolton is registered");
        assert_eq!(meta.name, "Bolton Council");
        assert_eq!(kind, QueryKind::Uprn);

        let (meta, kind) = resolve_council(&service, &CouncilId::from("bolton-legacy"))
            .expect("legacy form is registered");
        assert_eq!(meta.name, "Bolton Council (legacy form)");
        assert_eq!(kind, QueryKind::PostcodeAddress);
    }

    #[test]
    fn unknown_council_lists_known_ones() {
        let err = resolve_council(&service(), &CouncilId::from("wigan")).expect_err("unknown");
        assert_eq!(
            err.to_string(),
            "council 'wigan' is not supported (known: bolton, bolton-legacy)"
        );
    }
}
