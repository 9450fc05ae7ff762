//! Tracing subscriber setup.
//!
//! Filter priority, highest first: `STARSIFT_LOG`, `RUST_LOG`, then the
//! level implied by `-v`/`-q`. Logs go to stderr so stdout stays clean for
//! reports.

use crate::config::Verbosity;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Project-specific filter variable
pub const LOG_ENV: &str = "STARSIFT_LOG";

/// Install the global subscriber; later calls are ignored
pub fn init(verbosity: Verbosity, use_color: bool) {
    let filter = build_filter(verbosity, std::env::var(LOG_ENV).ok().as_deref());
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_color)
        .with_target(verbosity.is_verbose());

    let _ = if verbosity.is_verbose() {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_timer(fmt::time::uptime()))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.without_time().compact())
            .try_init()
    };
}

fn build_filter(verbosity: Verbosity, project_directives: Option<&str>) -> EnvFilter {
    if let Some(filter) = project_directives.and_then(|d| EnvFilter::try_new(d).ok()) {
        return filter;
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = verbosity.default_level().to_string().to_lowercase();
    EnvFilter::new(format!("warn,starsift={level},starsift_cli={level}"))
}
