//! Merging one run's outcomes into the snapshot and the cumulative store.
//!
//! Every extracted title goes into the run's daily snapshot. Only titles whose
//! [`DedupKey`](crate::models::DedupKey) is new to the cumulative store are
//! appended to it. Because the decision depends only on the set of keys, the
//! order in which outcomes arrive does not change the result.

use crate::error::{PageFailure, StoreFailure};
use crate::models::{Record, RunStats, SourceUrl};
use crate::outputs::snapshot::write_snapshot;
use crate::store::StoreWriter;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// What happened to one URL during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOutcome {
    /// Position in the source list; fixes the snapshot order.
    pub position: usize,
    pub source_url: SourceUrl,
    /// Extracted title, or why there is none.
    pub result: Result<String, PageFailure>,
}

/// Single writer for one run.
#[derive(Debug)]
pub struct Accumulator<'a> {
    writer: StoreWriter<'a>,
    snapshot_path: PathBuf,
    started_at: DateTime<Utc>,
}

impl<'a> Accumulator<'a> {
    pub fn new(writer: StoreWriter<'a>, snapshot_path: PathBuf, started_at: DateTime<Utc>) -> Self {
        Self {
            writer,
            snapshot_path,
            started_at,
        }
    }

    /// Apply the outcomes of a run.
    ///
    /// `attempted` is the size of the source list; URLs with no outcome are
    /// reported as `aborted` and counted as failed.
    ///
    /// The snapshot is replaced first, then new records are appended one at a
    /// time. Each appended record is durable and visible before the next one
    /// is written.
    ///
    /// # Errors
    ///
    /// Any [`StoreFailure`] from the snapshot or the cumulative store.
    #[instrument(level = "info", skip_all, fields(snapshot = %self.snapshot_path.display(), attempted = attempted))]
    pub async fn merge(
        mut self,
        attempted: usize,
        mut outcomes: Vec<UrlOutcome>,
    ) -> Result<RunStats, StoreFailure> {
        outcomes.sort_by_key(|o| o.position);

        let mut snapshot = Vec::with_capacity(outcomes.len());
        let mut failed = 0usize;
        for outcome in outcomes {
            match outcome.result {
                Ok(title) => snapshot.push(Record::new(outcome.source_url, &title, self.started_at)),
                Err(e) => {
                    failed += 1;
                    warn!(url = %outcome.source_url, error = %e, "URL failed");
                }
            }
        }
        let succeeded = snapshot.len();
        let aborted = attempted.saturating_sub(succeeded + failed);

        let mut seen = HashSet::new();
        let mut fresh = Vec::new();
        let mut duplicates_skipped = 0usize;
        for record in &snapshot {
            let key = record.key();
            if self.writer.store().contains(&key) || !seen.insert(key) {
                duplicates_skipped += 1;
            } else {
                fresh.push(record.clone());
            }
        }

        write_snapshot(&self.snapshot_path, &snapshot).await?;

        let new_records = fresh.len();
        for record in fresh {
            self.writer.upsert(record).await?;
        }

        let stats = RunStats {
            attempted,
            succeeded,
            failed: failed + aborted,
            aborted,
            duplicates_skipped,
            new_records,
            started_at: self.started_at,
            snapshot_path: self.snapshot_path,
        };
        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            aborted = stats.aborted,
            duplicates_skipped = stats.duplicates_skipped,
            new_records = stats.new_records,
            "Merged run"
        );
        Ok(stats)
    }
}
