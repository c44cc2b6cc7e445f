use anyhow::{bail, Result};
use consumption_ingestion::{
    config::{AppConfig, SinkKind},
    metrics_server,
    observability::{self, TracingObserver},
    pipeline::ConsumptionPipeline,
    sinks::{JsonFileSink, OutputSink, PostgresSink},
    sources::HttpProviderApi,
    transform::TimeNormalizer,
};
use sqlx::postgres::PgPoolOptions;
use std::{env, sync::Arc};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

const USAGE: &str = "usage: consumption-ingestion [interval <YYYY-MM-DD> <YYYY-MM-DD>]";
const ARG_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn parse_date(arg: &str) -> Result<Date> {
    Date::parse(arg, ARG_DATE_FORMAT).map_err(|e| anyhow::anyhow!("invalid date '{arg}': {e}\n{USAGE}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let interval = match args.as_slice() {
        [] => None,
        [cmd, start, end] if cmd == "interval" => Some((parse_date(start)?, parse_date(end)?)),
        _ => bail!(USAGE),
    };

    let cfg = AppConfig::load()?;
    let metrics = cfg.metrics.as_ref().map(metrics_server::init).transpose()?;
    let api = HttpProviderApi::new(cfg.provider.base_url()?, cfg.provider.request_timeout())?;

    // Database pool only when a postgres sink is configured.
    let pool = if cfg.output.sinks.contains(&SinkKind::Postgres) {
        Some(
            PgPoolOptions::new()
                .max_connections(cfg.database.max_connections)
                .connect_with(cfg.database.connect_options()?)
                .await?,
        )
    } else {
        None
    };

    let mut sinks = Vec::with_capacity(cfg.output.sinks.len());
    for kind in &cfg.output.sinks {
        match (kind, &pool) {
            (SinkKind::Json, _) => sinks.push(OutputSink::Json(JsonFileSink::new(&cfg.output.dir))),
            (SinkKind::Postgres, Some(pool)) => match cfg.database.tables().hourly {
                Some(table) => sinks.push(OutputSink::Postgres(PostgresSink::new(pool.clone(), table))),
                None => tracing::warn!("postgres sink configured but hourly table is disabled, skipping"),
            },
            (SinkKind::Postgres, None) => bail!("postgres sink configured without a database pool"),
        }
    }

    let outcome = run(&cfg, api, sinks, interval).await;

    if let (Some(handle), Some(path)) = (&metrics, cfg.metrics.as_ref().and_then(|m| m.textfile.as_deref())) {
        metrics_server::write_snapshot(handle, path).await?;
    }

    outcome
}

async fn run(cfg: &AppConfig, api: HttpProviderApi, sinks: Vec<OutputSink>, interval: Option<(Date, Date)>) -> Result<()> {
    let credentials = cfg.provider.credentials()?;
    let normalizer = TimeNormalizer::new(&cfg.provider.timezone)?;
    let pipeline = ConsumptionPipeline::connect(api, &credentials, normalizer, sinks, Arc::new(TracingObserver)).await?;

    let document = match interval {
        Some((start, end)) => pipeline.run_interval(start, end).await?,
        None => pipeline.run_last_invoiced().await?,
    };

    tracing::info!(
        days = document.hourly_consumption.len(),
        created = %document.creation_date,
        "consumption extraction finished"
    );

    Ok(())
}
