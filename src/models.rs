//! Data models for collected titles and run results.
//!
//! This module defines the core data structures used throughout the crate:
//! - [`SourceUrl`]: A validated page address from the source list
//! - [`Record`]: One collected title, the unit stored in the ledger
//! - [`DedupKey`]: The identity used to decide whether two records are the same
//! - [`RunStats`]: Counters reported by a single run

use crate::utils::{normalize_title, squash_whitespace};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// An absolute `http`/`https` page address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceUrl(String);

impl SourceUrl {
    /// Parse a candidate line, accepting only `http`/`https` URLs with a host.
    pub fn parse(s: &str) -> Option<Self> {
        let parsed = Url::parse(s).ok()?;
        match parsed.scheme() {
            "http" | "https" if parsed.host_str().is_some_and(|h| !h.is_empty()) => {
                Some(SourceUrl(s.to_string()))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A collected title.
///
/// Persisted as one JSON object per line with exactly these three fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The page the title was taken from.
    pub source_url: SourceUrl,
    /// Whitespace-squashed title text, never empty.
    pub title: String,
    /// Start time of the run that collected it.
    pub collected_at: DateTime<Utc>,
}

impl Record {
    pub fn new(source_url: SourceUrl, title: &str, collected_at: DateTime<Utc>) -> Self {
        Record {
            source_url,
            title: squash_whitespace(title),
            collected_at,
        }
    }

    pub fn key(&self) -> DedupKey {
        DedupKey::new(&self.title, &self.source_url)
    }
}

/// Record identity: normalized title paired with its source URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    title: String,
    source_url: SourceUrl,
}

impl DedupKey {
    pub fn new(title: &str, source_url: &SourceUrl) -> Self {
        DedupKey {
            title: normalize_title(title),
            source_url: source_url.clone(),
        }
    }

    pub fn normalized_title(&self) -> &str {
        &self.title
    }
}

/// Counters reported by one run.
///
/// `failed` includes `aborted`, the URLs still pending when the run-level
/// timeout fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: usize,
    pub duplicates_skipped: usize,
    pub new_records: usize,
    pub started_at: DateTime<Utc>,
    pub snapshot_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn url(s: &str) -> SourceUrl {
        SourceUrl::parse(s).unwrap()
    }

    #[test]
    fn test_source_url_parse() {
        assert!(SourceUrl::parse("https://example.com").is_some());
        assert!(SourceUrl::parse("http://ok.example/path?q=1").is_some());
        assert!(SourceUrl::parse("ftp://bad").is_none());
        assert!(SourceUrl::parse("https;//broken").is_none());
        assert!(SourceUrl::parse("not a url").is_none());
        assert!(SourceUrl::parse("file:///etc/passwd").is_none());
    }

    #[test]
    fn test_dedup_key_normalizes_title() {
        let u = url("https://example.com/a");
        assert_eq!(DedupKey::new("Hello World", &u), DedupKey::new(" HELLO   world ", &u));
        assert_ne!(
            DedupKey::new("Hello World", &u),
            DedupKey::new("Hello World", &url("https://example.com/b"))
        );
    }

    #[test]
    fn test_record_serialization_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let r = Record::new(url("https://ex.com/a"), "  Alpha \n Note ", ts);
        assert_eq!(r.title, "Alpha Note");

        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"source_url":"https://ex.com/a","title":"Alpha Note","collected_at":"2025-01-01T00:00:00Z"}"#
        );
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_record_key_ignores_timestamp() {
        let u = url("https://ex.com/a");
        let a = Record::new(u.clone(), "Title", Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let b = Record::new(u, "title", Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(a.key(), b.key());
    }
}
