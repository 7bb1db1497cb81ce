//! Logging setup for the Dengon relay.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are enabled by the default filter.
const RELAY_CRATES: [&str; 2] = ["dengon_server", "dengon_shared"];

/// Build the default `EnvFilter` directive string.
///
/// The binary name is normalized the same way cargo normalizes crate names
/// (`dengon-server` becomes `dengon_server`), and `tower_http` is included so
/// request traces show up next to relay events.
pub fn default_directives(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    let mut directives: Vec<String> = RELAY_CRATES
        .iter()
        .map(|krate| format!("{krate}={default_log_level}"))
        .collect();
    if !RELAY_CRATES.contains(&binary_target.as_str()) {
        directives.push(format!("{binary_target}={default_log_level}"));
    }
    directives.push(format!("tower_http={default_log_level}"));
    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The level can be overridden with the `RUST_LOG` environment variable.
///
/// # Examples
///
/// ```no_run
/// use dengon_shared::logger::setup_logger;
///
/// setup_logger(env!("CARGO_PKG_NAME"), "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
