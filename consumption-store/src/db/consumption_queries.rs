use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::domain::NormalizedRecord;
use crate::error::{validate_identifier, StoreResult};

// Three binds per row keeps each statement well under the 65535 parameter cap.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Insert normalized readings, stamping both audit columns with `now`.
///
/// Runs on a single connection so callers can wrap it in a transaction.
pub async fn insert_normalized(
    conn: &mut PgConnection,
    table: &str,
    records: &[NormalizedRecord],
    now: OffsetDateTime,
) -> StoreResult<u64> {
    let table = validate_identifier(table)?;
    let mut inserted = 0;

    for chunk in records.chunks(INSERT_CHUNK_ROWS) {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {table} (datetime, consumption, creation_date, modified_date) "
        ));
        builder.push_values(chunk, |mut b, rec| {
            b.push_bind(rec.datetime)
                .push_bind(rec.consumption)
                .push_bind(now)
                .push_bind(now);
        });

        let result = builder.build().execute(&mut *conn).await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

/// Fetch a time-ordered hourly profile in `[start, end)`.
pub async fn load_consumption(
    pool: &PgPool,
    table: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> StoreResult<Vec<NormalizedRecord>> {
    let table = validate_identifier(table)?;
    let sql = format!(
        r#"
        SELECT
            datetime,
            consumption
        FROM {table}
        WHERE datetime >= $1
          AND datetime <  $2
        ORDER BY datetime
        "#
    );

    let rows = sqlx::query_as::<_, NormalizedRecord>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
