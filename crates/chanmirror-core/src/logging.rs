use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogFormat;

/// Initialize logging/tracing for a replication process.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init(service_name: &str, format: LogFormat) {
    // Default: info for our crates and everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("info,chanmirror_core=info,{service_name}=info"))
    });

    let builder = fmt().with_env_filter(filter).with_target(false);
    let installed = match format {
        LogFormat::Text => builder.with_ansi(true).try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };

    if let Err(e) = installed {
        tracing::debug!(error = %e, "subscriber already installed, keeping it");
    }
}
