use std::{net::SocketAddr, path::Path};

use anyhow::{anyhow, Context};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Install the global Prometheus recorder. Serves `/metrics` when `bind_addr` is set.
pub fn init(cfg: &MetricsConfig) -> anyhow::Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    let Some(bind_addr) = &cfg.bind_addr else {
        return Ok(builder.install_recorder()?);
    };

    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow!("invalid metrics.bind_addr '{bind_addr}': {e}"))?;
    let (recorder, exporter) = builder.with_http_listener(addr).build()?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|_| anyhow!("metrics recorder already installed"))?;

    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            tracing::error!(error = ?e, "metrics listener error");
        }
    });
    tracing::info!(%addr, "serving metrics");

    Ok(handle)
}

/// Dump the current metrics in the Prometheus text format, for a textfile collector.
pub async fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> anyhow::Result<()> {
    tokio::fs::write(path, handle.render())
        .await
        .with_context(|| format!("failed to write metrics snapshot {}", path.display()))?;
    tracing::debug!(path = %path.display(), "metrics snapshot written");
    Ok(())
}
