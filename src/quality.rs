//! Data quality report over the cumulative store.
//!
//! Meant to run after a scheduled collection (e.g. as a CI step): it checks
//! that the run actually added something, that URLs are not repeating too
//! much, and that no stored title is blank, then renders a short Markdown
//! report suitable for a job summary.

use crate::models::Record;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;

/// Thresholds a healthy store must meet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rules {
    /// Minimum records collected today.
    pub min_new_rows: usize,
    /// Maximum share of records repeating a URL within one day.
    pub max_dup_rate: f64,
    pub allow_empty_title: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            min_new_rows: 1,
            max_dup_rate: 0.10,
            allow_empty_title: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub rows: usize,
    pub distinct_urls: usize,
    /// Share of records repeating a URL already collected on the same UTC
    /// day, 0 for an empty store. A URL whose headline changes from one day
    /// to the next does not count.
    pub dup_rate: f64,
    pub empty_titles: usize,
    /// Records whose `collected_at` falls on `today` (UTC).
    pub new_rows_today: usize,
}

impl Metrics {
    pub fn compute(records: &[Record], today: NaiveDate) -> Self {
        let rows = records.len();
        let distinct_urls = records
            .iter()
            .map(|r| r.source_url.as_str())
            .collect::<HashSet<_>>()
            .len();
        let distinct_url_days = records
            .iter()
            .map(|r| (r.source_url.as_str(), r.collected_at.date_naive()))
            .collect::<HashSet<_>>()
            .len();
        let dup_rate = if rows == 0 {
            0.0
        } else {
            1.0 - distinct_url_days as f64 / rows as f64
        };
        Metrics {
            rows,
            distinct_urls,
            dup_rate,
            empty_titles: records.iter().filter(|r| r.title.trim().is_empty()).count(),
            new_rows_today: records
                .iter()
                .filter(|r| r.collected_at.date_naive() == today)
                .count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub ok: bool,
    pub metrics: Metrics,
    pub rules: Rules,
    pub problems: Vec<String>,
}

/// Evaluate `records` against `rules`.
pub fn run_check(records: &[Record], rules: &Rules, today: NaiveDate) -> QualityReport {
    let m = Metrics::compute(records, today);

    let mut problems = Vec::new();
    if m.new_rows_today < rules.min_new_rows {
        problems.push(format!(
            "too few new rows: **{} < {}**",
            m.new_rows_today, rules.min_new_rows
        ));
    }
    if m.dup_rate > rules.max_dup_rate {
        problems.push(format!(
            "duplicate rate too high: **{:.1}% > {:.1}%**",
            m.dup_rate * 100.0,
            rules.max_dup_rate * 100.0
        ));
    }
    if !rules.allow_empty_title && m.empty_titles > 0 {
        problems.push(format!("empty titles: **{}**", m.empty_titles));
    }

    QualityReport {
        ok: problems.is_empty(),
        metrics: m,
        rules: rules.clone(),
        problems,
    }
}

impl QualityReport {
    pub fn to_markdown(&self) -> String {
        let m = &self.metrics;
        let badge = if self.ok { "✅" } else { "❌" };
        let mut md = String::new();
        let _ = writeln!(md, "### Data Quality Report {badge}");
        let _ = writeln!(md, "- rows: **{}**", m.rows);
        let _ = writeln!(md, "- distinct_urls: **{}**", m.distinct_urls);
        let _ = writeln!(md, "- dup_rate: **{:.1}%**", m.dup_rate * 100.0);
        let _ = writeln!(md, "- empty_titles: **{}**", m.empty_titles);
        let _ = writeln!(md, "- new_rows_today: **{}**", m.new_rows_today);
        let _ = writeln!(md);
        let _ = writeln!(md, "**Rules**");
        let _ = writeln!(md, "- min_new_rows: {}", self.rules.min_new_rows);
        let _ = writeln!(md, "- max_dup_rate: {:.2}", self.rules.max_dup_rate);
        let _ = writeln!(md, "- allow_empty_title: {}", self.rules.allow_empty_title);
        let _ = writeln!(md);
        if self.problems.is_empty() {
            md.push_str("No problems detected.\n");
        } else {
            for p in &self.problems {
                let _ = writeln!(md, "- {p}");
            }
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceUrl;
    use chrono::{TimeZone, Utc};

    fn rec(url: &str, title: &str, day: u32) -> Record {
        Record {
            source_url: SourceUrl::parse(url).unwrap(),
            title: title.to_string(),
            collected_at: Utc.with_ymd_and_hms(2025, 10, day, 8, 0, 0).unwrap(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn test_empty_store_fails_min_rows() {
        let report = run_check(&[], &Rules::default(), day(28));
        assert!(!report.ok);
        assert_eq!(report.metrics.rows, 0);
        assert_eq!(report.metrics.dup_rate, 0.0);
        assert_eq!(report.problems.len(), 1);
    }

    #[test]
    fn test_healthy_store_passes() {
        let records = vec![
            rec("https://ex.com/a", "Alpha", 27),
            rec("https://ex.com/b", "Beta", 28),
        ];
        let report = run_check(&records, &Rules::default(), day(28));
        assert!(report.ok, "{:?}", report.problems);
        assert_eq!(report.metrics.new_rows_today, 1);
        assert!(report.to_markdown().contains("No problems detected."));
    }

    #[test]
    fn test_dup_rate_and_empty_titles() {
        let records = vec![
            rec("https://ex.com/a", "Morning", 28),
            rec("https://ex.com/a", "Evening", 28),
            rec("https://ex.com/b", " ", 28),
        ];
        let report = run_check(&records, &Rules::default(), day(28));
        assert!(!report.ok);
        assert_eq!(report.metrics.distinct_urls, 2);
        assert!((report.metrics.dup_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.metrics.empty_titles, 1);
        assert_eq!(report.problems.len(), 2);

        let lenient = Rules {
            max_dup_rate: 0.5,
            allow_empty_title: true,
            ..Rules::default()
        };
        assert!(run_check(&records, &lenient, day(28)).ok);
    }

    #[test]
    fn test_markdown_lists_problems() {
        let md = run_check(&[], &Rules::default(), day(28)).to_markdown();
        assert!(md.starts_with("### Data Quality Report ❌"));
        assert!(md.contains("- too few new rows: **0 < 1**"));
        assert!(md.contains("- min_new_rows: 1"));
    }

    #[test]
    fn test_headline_changes_across_days_pass() {
        let mut records = Vec::new();
        for (i, url) in ["https://ex.com/a", "https://ex.com/b", "https://ex.com/c"].iter().enumerate() {
            records.push(rec(url, &format!("Monday story {i}"), 27));
            records.push(rec(url, &format!("Tuesday story {i}"), 28));
        }
        let report = run_check(&records, &Rules::default(), day(28));
        assert!(report.ok, "{:?}", report.problems);
        assert_eq!(report.metrics.rows, 6);
        assert_eq!(report.metrics.distinct_urls, 3);
        assert_eq!(report.metrics.dup_rate, 0.0);
        assert_eq!(report.metrics.new_rows_today, 3);
    }
}
