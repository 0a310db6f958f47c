mod arrow_schemas;
mod export_parquet;
mod insert;
mod models;
mod open;
mod query;
mod schema;

pub use export_parquet::export_findings_parquet;
pub use models::StoreError;
pub use open::Db;
