use std::time::SystemTime;

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::from_default_env().add_directive(
        "consumption_ingestion=info"
            .parse()
            .unwrap_or_else(|_| "info".parse().unwrap()),
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Time from an envelope's creation until its writes committed.
pub fn record_latency(received_at: SystemTime) {
    if let Ok(dur) = SystemTime::now().duration_since(received_at) {
        metrics::histogram!("consumption_end_to_end_latency_seconds").record(dur.as_secs_f64());
    }
}

/// Milestones of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Authenticated,
    Fetched { days: usize },
    Filtered { kept: usize, dropped: usize },
    Wrote { sink: &'static str },
}

/// Notified on run milestones. Never required for correctness.
pub trait PipelineObserver: Send + Sync {
    fn notify(&self, event: &PipelineEvent);
}

/// Default observer: structured log line plus a counter per milestone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn notify(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Authenticated => {
                tracing::info!("provider session established");
            }
            PipelineEvent::Fetched { days } => {
                metrics::counter!("provider_days_fetched_total").increment(*days as u64);
                tracing::info!(days, "fetched provider readings");
            }
            PipelineEvent::Filtered { kept, dropped } => {
                metrics::counter!("provider_days_filtered_out_total").increment(*dropped as u64);
                tracing::info!(kept, dropped, "filtered provider readings");
            }
            PipelineEvent::Wrote { sink } => {
                tracing::info!(sink, "extraction written");
            }
        }
    }
}
