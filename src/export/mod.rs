//! CSV export of crawl results.

use anyhow::{Context, Result};
use std::path::Path;

use crate::crawl_engine::CrawlRecord;

/// Write one row per crawled page, in crawl order.
///
/// Columns: `url,status,elapsed_ms,completed_at,links_found`. Pages that
/// never produced a status code get an empty status field.
pub async fn export_csv(records: &[CrawlRecord], path: &Path) -> Result<()> {
    let mut out = String::from("url,status,elapsed_ms,completed_at,links_found\n");

    for record in records {
        let status = record
            .envelope
            .status
            .map(|s| s.as_u16().to_string())
            .unwrap_or_default();
        let completed_at = record
            .envelope
            .completed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let elapsed_ms = record
            .envelope
            .elapsed
            .map(|d| d.as_millis())
            .unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_field(record.url()),
            status,
            elapsed_ms,
            completed_at,
            record.link_count(),
        ));
    }

    tokio::fs::write(path, out)
        .await
        .with_context(|| format!("failed to write CSV to {}", path.display()))
}

/// Quote a field when it contains a comma, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
