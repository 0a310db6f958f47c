use anyhow::Result;
use arrow::array::{ArrayRef, Int64Builder, StringBuilder};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::info;
use uriscan_core::RecordId;

use crate::arrow_schemas;

const CHUNK: usize = 10_000;

/// Writes every finding (optionally only those of one registration) to a
/// ZSTD-compressed Parquet file. Returns the number of rows written.
pub fn export_findings_parquet(conn: &Connection, connection_id: Option<&RecordId>, out: &std::path::Path) -> Result<usize> {
    let schema = Arc::new(arrow_schemas::findings_schema());
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();
    let file = std::fs::File::create(out)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let mut stmt = conn.prepare(
        "SELECT scan_id, connection_id, recorded_at, findings_json FROM scan_records
         WHERE (?1 IS NULL OR connection_id = ?1) ORDER BY rowid",
    )?;
    let mut rows = stmt.query([connection_id.map(RecordId::as_str)])?;

    let mut batch = FindingBatch::default();
    let mut total = 0usize;
    while let Some(row) = rows.next()? {
        let scan_id: String = row.get(0)?;
        let connection: String = row.get(1)?;
        let recorded_at: String = row.get(2)?;
        let findings: Vec<String> = serde_json::from_str(&row.get::<_, String>(3)?)?;
        for (position, finding) in findings.iter().enumerate() {
            batch.push(&scan_id, &connection, &recorded_at, position as i64, finding);
            if batch.len == CHUNK {
                total += batch.len;
                writer.write(&batch.finish(&schema)?)?;
            }
        }
    }
    if batch.len > 0 {
        total += batch.len;
        writer.write(&batch.finish(&schema)?)?;
    }

    writer.close()?;
    info!(rows = total, path = %out.display(), "findings exported");
    Ok(total)
}

#[derive(Default)]
struct FindingBatch {
    scan_id: StringBuilder,
    connection_id: StringBuilder,
    recorded_at: StringBuilder,
    position: Int64Builder,
    finding: StringBuilder,
    len: usize,
}

impl FindingBatch {
    fn push(&mut self, scan_id: &str, connection_id: &str, recorded_at: &str, position: i64, finding: &str) {
        self.scan_id.append_value(scan_id);
        self.connection_id.append_value(connection_id);
        self.recorded_at.append_value(recorded_at);
        self.position.append_value(position);
        self.finding.append_value(finding);
        self.len += 1;
    }

    /// Drains the builders into a record batch, leaving them empty for reuse.
    fn finish(&mut self, schema: &Arc<arrow::datatypes::Schema>) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.scan_id.finish()),
            Arc::new(self.connection_id.finish()),
            Arc::new(self.recorded_at.finish()),
            Arc::new(self.position.finish()),
            Arc::new(self.finding.finish()),
        ];
        self.len = 0;
        Ok(RecordBatch::try_new(schema.clone(), columns)?)
    }
}
