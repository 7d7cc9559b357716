//! Diagnostic tracing for the embedding process.
//!
//! The crate only emits `tracing` events. Hosts that already install a
//! subscriber need nothing from this module.

use crate::config::Settings;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize a stderr subscriber in compact format.
///
/// Reads `RUST_LOG`, falling back to `default_directive` (for example the
/// `log_filter` setting) when it is unset or unparsable. Calling it again,
/// or after another subscriber was installed, does nothing.
///
/// # Example
/// ```bash
/// RUST_LOG=loadout_sheet=debug my-host
/// ```
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

/// Initialize logging with the `log_filter` of `settings` as the fallback directive.
pub fn init_from_settings(settings: &Settings) {
    init(&settings.log_filter);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init("debug");
        init("not a [valid directive");
        tracing::debug!("still logging");
    }

    #[test]
    fn settings_supply_the_fallback_filter() {
        let settings = Settings::from_toml_str("log_filter = \"loadout_sheet=debug\"").expect("settings");
        assert_eq!(settings.log_filter, "loadout_sheet=debug");
        init_from_settings(&settings);
    }
}
