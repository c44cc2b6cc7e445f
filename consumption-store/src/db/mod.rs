pub mod consumption_queries;
pub mod schema;

pub use consumption_queries::{insert_normalized, load_consumption};
pub use schema::{init_schema, schema_statements, ConsumptionTables};
