//! Text and JSON rendering of query results.

use crate::models::Record;
use crate::utils::truncate_for_log;
use std::fmt::Write;

const TITLE_WIDTH: usize = 200;

/// Render records as an aligned `collected_at | source_url | title` table.
pub fn render_table(records: &[Record]) -> String {
    let mut out = String::new();
    if records.is_empty() {
        out.push_str("(no results)\n");
        return out;
    }

    let stamps: Vec<String> = records
        .iter()
        .map(|r| r.collected_at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .collect();
    let url_width = records
        .iter()
        .map(|r| r.source_url.as_str().chars().count())
        .max()
        .unwrap_or(0)
        .max("source_url".len());
    let stamp_width = "collected_at".len().max(20);

    let _ = writeln!(
        out,
        "{:<stamp_width$}  {:<url_width$}  title",
        "collected_at", "source_url"
    );
    for (record, stamp) in records.iter().zip(&stamps) {
        let _ = writeln!(
            out,
            "{:<stamp_width$}  {:<url_width$}  {}",
            stamp,
            record.source_url.as_str(),
            truncate_for_log(&record.title, TITLE_WIDTH)
        );
    }
    out
}

/// Render records as a JSON array.
pub fn render_json(records: &[Record]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}
