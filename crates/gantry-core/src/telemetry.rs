//! Centralised tracing initialisation for gantry binaries.
//!
//! Call [`init_tracing`] once at program start to configure the global
//! subscriber with an `EnvFilter` and optional JSON formatting.
//!
//! Safe to call more than once; subsequent calls are silently ignored
//! (the global subscriber can only be set once per process).

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset. Verbose mode opens the gantry
/// crates up to debug but keeps the HTTP client internals quiet, since a
/// single provider call produces pages of hyper chatter at debug.
fn default_filter(verbose: bool) -> String {
    if verbose {
        "debug,hyper=warn,hyper_util=warn,reqwest=warn".to_string()
    } else {
        "info".to_string()
    }
}

/// Initialise the global tracing subscriber.
///
/// * `json` — when `true`, emit newline-delimited JSON log lines.
/// * `verbose` — raise the default level to debug for gantry crates.
///
/// The `RUST_LOG` environment variable, when set, overrides both flags'
/// filtering entirely.
pub fn init_tracing(json: bool, verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_filter_silences_http_internals() {
        let filter = default_filter(true);
        assert!(filter.starts_with("debug"));
        assert!(filter.contains("hyper=warn"));
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(false, false);
        init_tracing(true, true);
    }
}
