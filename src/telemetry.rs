//! Logging and metrics setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use rf_core::config::MetricsConfig;
use rf_pipeline::VIDEOS_GENERATED;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "reelforge=debug,rf_pipeline=debug,rf_sources=debug,rf_publish=debug,rf_av=debug,rf_db=debug,rf_core=debug"
    } else {
        "reelforge=info,rf_pipeline=info,rf_sources=info,rf_publish=info,rf_av=info,rf_db=warn,rf_core=info"
    }
}

/// Install the global tracing subscriber. Logs go to stderr so command
/// output on stdout stays machine-readable.
pub fn init_tracing(verbose: bool, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

/// Start the Prometheus exporter if enabled. Must be called from inside a
/// Tokio runtime.
pub fn install_metrics(config: &MetricsConfig) -> anyhow::Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics.listen '{}': {e}", config.listen))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to start metrics exporter: {e}"))?;

    metrics::describe_counter!(VIDEOS_GENERATED, "Total number of generated videos");
    tracing::info!(listen = %addr, "Serving Prometheus metrics on /metrics");
    Ok(())
}
