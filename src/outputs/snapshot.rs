//! Daily snapshot files.
//!
//! A snapshot holds exactly the successes of the latest run on its date. The
//! path comes from a template with a `{date}` placeholder (ISO `%Y-%m-%d`) or
//! `{date:<strftime>}` for a custom layout, e.g. `data/daily/{date:%Y/%m/%d}.jsonl`.
//!
//! Files are replaced atomically: the new content is written and synced next
//! to the target, then renamed over it, so readers never see a half-written snapshot.

use crate::error::StoreFailure;
use crate::models::Record;
use crate::outputs::jsonl::encode_line;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

static DATE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{date(?::([^}]+))?\}").expect("static regex"));

const ISO_DATE: &str = "%Y-%m-%d";

fn valid_strftime(fmt: &str) -> bool {
    !StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error))
}

/// Whether `template` has at least one usable date placeholder.
pub fn has_date_placeholder(template: &str) -> bool {
    let mut found = false;
    for caps in DATE_PLACEHOLDER.captures_iter(template) {
        if let Some(fmt) = caps.get(1) {
            if !valid_strftime(fmt.as_str()) {
                return false;
            }
        }
        found = true;
    }
    found
}

/// Calendar date a run belongs to: the UTC date of its start time.
pub fn run_date(started_at: DateTime<Utc>) -> NaiveDate {
    started_at.date_naive()
}

/// Expand every placeholder in `template` for `date`.
pub fn snapshot_path(template: &str, date: NaiveDate) -> PathBuf {
    let expanded = DATE_PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let fmt = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|f| valid_strftime(f))
            .unwrap_or(ISO_DATE);
        let mut out = String::new();
        if write!(out, "{}", date.format(fmt)).is_err() {
            out = date.format(ISO_DATE).to_string();
        }
        out
    });
    PathBuf::from(expanded.into_owned())
}

/// Replace the snapshot at `path` with `records`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_snapshot(path: &Path, records: &[Record]) -> Result<(), StoreFailure> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreFailure::io(parent, e))?;
    }

    let mut body = Vec::new();
    for record in records {
        body.extend(encode_line(record).map_err(|e| StoreFailure::io(path, e.into()))?);
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp)
        .await
        .map_err(|e| StoreFailure::io(&tmp, e))?;
    file.write_all(&body)
        .await
        .map_err(|e| StoreFailure::io(&tmp, e))?;
    file.sync_all()
        .await
        .map_err(|e| StoreFailure::io(&tmp, e))?;
    drop(file);
    fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreFailure::io(path, e))?;

    info!("Wrote daily snapshot");
    Ok(())
}
