//! ---
//! cm_section: "03-logging"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Structured logging adapters and sinks."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "CHAOSMONKEY_LOG";

/// Initialize a tracing subscriber writing to stderr.
///
/// The filter is taken from `CHAOSMONKEY_LOG`, then `RUST_LOG`. When neither
/// is set the level is derived from `verbosity` (0 = warn, 1 = info, 2+ = debug).
pub fn init(verbosity: u8) {
    let _ = Registry::default()
        .with(filter_for(verbosity))
        .with(
            subscriber_fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn filter_for(verbosity: u8) -> EnvFilter {
    if let Ok(directive) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(&directive) {
            return filter;
        }
        eprintln!("invalid {LOG_ENV} directive {directive:?}; using defaults");
    }
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level_for(verbosity).into()))
}

/// Map a `-v` count to a tracing level.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Target group of the chaos event.
    pub group: Option<&'a str>,
    /// Requested chaos strategy.
    pub strategy: Option<&'a str>,
    /// One-based campaign iteration.
    pub iteration: Option<u64>,
    /// Chaos Monkey endpoint.
    pub endpoint: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a group name.
    pub fn with_group(mut self, group: &'a str) -> Self {
        self.group = Some(group);
        self
    }

    /// Attach a strategy name.
    pub fn with_strategy(mut self, strategy: &'a str) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Attach an iteration number.
    pub fn with_iteration(mut self, iteration: u64) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Attach an endpoint.
    pub fn with_endpoint(mut self, endpoint: &'a str) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init(2);
        let ctx = LogContext::new()
            .with_group("web-asg")
            .with_strategy("ShutdownInstance")
            .with_iteration(1);
        cm_info!(context = ctx.clone(), "chaos event triggered");
        cm_debug!("debug message");
        cm_warn!(context = ctx, "skipped {} attempts", 2);
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), Level::WARN);
        assert_eq!(level_for(1), Level::INFO);
        assert_eq!(level_for(2), Level::DEBUG);
        assert_eq!(level_for(9), Level::DEBUG);
    }

    #[test]
    fn context_builder_sets_fields() {
        let ctx = LogContext::new()
            .with_endpoint("http://127.0.0.1:8080")
            .with_group("api");
        assert_eq!(ctx.endpoint, Some("http://127.0.0.1:8080"));
        assert_eq!(ctx.group, Some("api"));
        assert_eq!(ctx.strategy, None);
        assert_eq!(ctx.iteration, None);
    }
}
