//! Command line and environment configuration.

use std::time::Duration;

use clap::Parser;

/// Settings for the HTTP service. Every flag can also come from the environment
/// (or a `.env` file loaded at startup).
#[derive(Debug, Clone, Parser)]
#[command(name = "binday", version, about = "Council bin collection schedules as JSON")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "BINDAY_BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Council adapter answering `/bin-collection` (`bolton` or `bolton-legacy`).
    #[arg(long, env = "BINDAY_COUNCIL", default_value = "bolton")]
    pub council: String,

    /// Deadline in seconds for one upstream lookup, negotiation included.
    #[arg(long, env = "BINDAY_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Number of HTTP worker threads; defaults to the number of CPUs.
    #[arg(long, env = "BINDAY_WORKERS")]
    pub workers: Option<usize>,

    /// Override the legacy form URL.
    #[arg(long, env = "BINDAY_LEGACY_FORM_URL")]
    pub legacy_form_url: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "BINDAY_LOG_JSON")]
    pub log_json: bool,
}

impl ServerConfig {
    /// Upstream deadline as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
