use sqlx::PgPool;

use crate::error::{validate_identifier, StoreResult};

/// Which consumption tables to create, by name. `None` skips a table.
#[derive(Debug, Clone, Default)]
pub struct ConsumptionTables {
    /// Hourly UTC-stamped readings from the distribution provider.
    pub hourly: Option<String>,
    /// Daily consumption and cost from the retail supplier.
    pub daily_cost: Option<String>,
}

pub fn hourly_table_ddl(table: &str) -> StoreResult<String> {
    let table = validate_identifier(table)?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
         id BIGSERIAL PRIMARY KEY, \
         datetime TIMESTAMPTZ, \
         consumption FLOAT(8), \
         creation_date TIMESTAMPTZ, \
         modified_date TIMESTAMPTZ);"
    ))
}

pub fn daily_cost_table_ddl(table: &str) -> StoreResult<String> {
    let table = validate_identifier(table)?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
         id BIGSERIAL PRIMARY KEY, \
         date DATE, \
         consumption FLOAT(8), \
         cost FLOAT(8), \
         creation_date TIMESTAMPTZ, \
         modified_date TIMESTAMPTZ);"
    ))
}

/// DDL for the enabled tables, daily-cost table first.
pub fn schema_statements(tables: &ConsumptionTables) -> StoreResult<Vec<String>> {
    let mut statements = Vec::with_capacity(2);
    if let Some(name) = &tables.daily_cost {
        statements.push(daily_cost_table_ddl(name)?);
    }
    if let Some(name) = &tables.hourly {
        statements.push(hourly_table_ddl(name)?);
    }
    Ok(statements)
}

/// Create the enabled tables. Idempotent; stops at the first failing statement.
pub async fn init_schema(pool: &PgPool, tables: &ConsumptionTables) -> StoreResult<usize> {
    let statements = schema_statements(tables)?;
    for statement in &statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(statements.len())
}
