use arrow::datatypes::{DataType, Field, Schema};

/// One row per finding, flattened out of `scan_records.findings_json`.
pub fn findings_schema() -> Schema {
    Schema::new(vec![
        Field::new("scan_id", DataType::Utf8, false),
        Field::new("connection_id", DataType::Utf8, false),
        Field::new("recorded_at", DataType::Utf8, false),
        Field::new("position", DataType::Int64, false),
        Field::new("finding", DataType::Utf8, false),
    ])
}
