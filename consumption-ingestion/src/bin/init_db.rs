use anyhow::Result;
use consumption_ingestion::{config::AppConfig, observability};
use sqlx::postgres::PgPoolOptions;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect_with(cfg.database.connect_options()?)
        .await?;

    let tables = cfg.database.tables();
    let created = consumption_store::db::init_schema(&pool, &tables).await?;
    tracing::info!(statements = created, ?tables, "consumption schema ready");

    Ok(())
}
