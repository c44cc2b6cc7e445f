use consumption_store::{db, domain::NormalizedRecord};
use futures::StreamExt;
use sqlx::{postgres::PgPool, Postgres, Transaction};
use time::OffsetDateTime;

use crate::observability;
use crate::pipeline::{Envelope, Extraction, PipelineError, Sink};

/// Inserts the UTC-stamped readings of each extraction into the hourly table.
///
/// All rows of one extraction go in a single transaction.
pub struct PostgresSink {
    pool: PgPool,
    table: String,
}

/// Rows inserted inside an open transaction. Dropping it uncommitted rolls back.
pub struct StagedRows {
    tx: Transaction<'static, Postgres>,
    table: String,
    rows: u64,
}

impl StagedRows {
    pub async fn commit(self) -> Result<u64, PipelineError> {
        let Self { tx, table, rows } = self;
        if let Err(e) = tx.commit().await {
            tracing::error!(error = %e, %table, "postgres commit failed, rolled back");
            metrics::counter!("postgres_sink_errors_total").increment(1);
            return Err(sink_error(e));
        }

        metrics::counter!("consumption_rows_inserted_total").increment(rows);
        tracing::info!(%table, rows, "consumption rows inserted");
        Ok(rows)
    }
}

impl PostgresSink {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Insert every reading of the extraction without committing.
    pub async fn stage(&self, extraction: &Extraction) -> Result<StagedRows, PipelineError> {
        match self.insert_uncommitted(extraction).await {
            Ok(staged) => Ok(staged),
            Err(e) => {
                tracing::error!(error = %e, table = %self.table, "postgres sink insert failed");
                metrics::counter!("postgres_sink_errors_total").increment(1);
                Err(e)
            }
        }
    }

    async fn insert_uncommitted(&self, extraction: &Extraction) -> Result<StagedRows, PipelineError> {
        let records: Vec<NormalizedRecord> = extraction.normalized.iter().flatten().cloned().collect();
        let now = OffsetDateTime::now_utc();

        let mut tx = self.pool.begin().await.map_err(sink_error)?;
        let rows = db::insert_normalized(&mut tx, &self.table, &records, now)
            .await
            .map_err(sink_error)?;

        Ok(StagedRows {
            tx,
            table: self.table.clone(),
            rows,
        })
    }
}

fn sink_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Sink(e.to_string())
}

#[async_trait::async_trait]
impl Sink<Extraction> for PostgresSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Extraction>, PipelineError>> + Send + Unpin + 'static,
    {
        while let Some(item) = input.next().await {
            let env = item?;
            self.stage(&env.payload).await?.commit().await?;
            observability::record_latency(env.received_at);
        }

        Ok(())
    }
}
