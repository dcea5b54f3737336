//! Diagnostic logging
//!
//! Events go to stderr so that command output on stdout stays parseable.
//! `RUST_LOG` takes precedence over the configured level; `--verbose` forces
//! `debug`.

use tracing_subscriber::EnvFilter;

/// Chooses the filter directive for this run
pub fn filter_directive(configured: &str, verbose: bool, env: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    match env.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => configured.to_string(),
    }
}

/// Installs the global subscriber
///
/// Calling this more than once keeps the first subscriber.
pub fn init_logging(configured: &str, verbose: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(configured, verbose, env.as_deref());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Builds the filter for `directive`, falling back to `info` when it does not parse
fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}
