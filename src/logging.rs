//! Logging and tracing initialization for cdripd.
//!
//! Structured logging through the `tracing` ecosystem, with either pretty
//! console output or JSON for log collectors.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Configuration for the logging system.
pub struct LogConfig {
    /// Default verbosity (`error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
    /// Output logs as JSON (for machine parsing)
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Filter directives for our own crate and the HTTP trace layer.
///
/// Unknown levels fall back to `info` rather than silencing everything.
pub fn default_directives(level: &str) -> String {
    let level = match level.trim().to_lowercase().as_str() {
        l @ ("error" | "warn" | "info" | "debug" | "trace") => l.to_string(),
        _ => "info".to_string(),
    };
    format!("cdripd={level},tower_http={level}")
}

/// Initialize the tracing subscriber with the given configuration.
///
/// Call early in main(), after config is loaded. `RUST_LOG` overrides the
/// configured level.
pub fn init(config: LogConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_use_configured_level() {
        assert_eq!(default_directives("debug"), "cdripd=debug,tower_http=debug");
        assert_eq!(default_directives(" WARN "), "cdripd=warn,tower_http=warn");
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(default_directives("loud"), "cdripd=info,tower_http=info");
    }
}
