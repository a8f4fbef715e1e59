//! Process-wide `tracing` setup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "binday=info,binday_server=info,binday_core=info,\
binday_provider_bolton=info,binday_provider_bolton_legacy=info,actix_web=info";

/// Install the global subscriber. Call once, before the server starts.
///
/// Access logs from actix-web's `Logger` middleware arrive through the `log`
/// bridge that the subscriber installs.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
