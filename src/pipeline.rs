//! One run of the fetch → extract → accumulate pipeline.
//!
//! URLs are processed concurrently, at most `concurrency` at a time. Each task
//! yields a tagged [`UrlOutcome`]; a failure stays inside its outcome and never
//! stops the other tasks. Once every task finished, or the run-level timeout
//! expired, the collected outcomes are handed to the [`Accumulator`].
//!
//! The store's writer slot is claimed before any fetch starts, so a second run
//! against the same store fails fast with a write conflict instead of racing.

use crate::accumulate::{Accumulator, UrlOutcome};
use crate::config::PipelineConfig;
use crate::error::{PageFailure, RunError, StoreFailure};
use crate::fetch::{FetchPage, HttpFetcher, RetryFetch};
use crate::models::{RunStats, SourceUrl};
use crate::outputs::snapshot::{run_date, snapshot_path};
use crate::scrapers::title::extract_title;
use crate::store::Store;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Fetch and extract a single URL.
async fn process_url<F: FetchPage>(fetcher: &F, url: &SourceUrl) -> Result<String, PageFailure> {
    let body = fetcher.fetch(url).await?;
    let title = extract_title(&body)?;
    Ok(title)
}

/// Run the pipeline once over `sources` with real HTTP.
///
/// The fetcher is built from `config` and wrapped in [`RetryFetch`].
///
/// # Errors
///
/// [`RunError::Client`] if the HTTP client cannot be built, and
/// [`RunError::Store`] if the snapshot or store cannot be written.
pub async fn run_once(
    sources: &[SourceUrl],
    config: &PipelineConfig,
    store: &Store,
) -> Result<RunStats, RunError> {
    let fetcher = RetryFetch::new(
        HttpFetcher::new(config)?,
        config.max_attempts,
        config.backoff.clone(),
    );
    Ok(run_once_with(&fetcher, sources, config, store, Utc::now()).await?)
}

/// Run the pipeline once with an explicit fetcher and start time.
///
/// `started_at` becomes the `collected_at` of every record this run adds,
/// and picks the daily snapshot file. Retries are the fetcher's concern;
/// pass a [`RetryFetch`] to get them.
#[instrument(level = "info", skip_all, fields(urls = sources.len(), started_at = %started_at))]
pub async fn run_once_with<F: FetchPage>(
    fetcher: &F,
    sources: &[SourceUrl],
    config: &PipelineConfig,
    store: &Store,
    started_at: DateTime<Utc>,
) -> Result<RunStats, StoreFailure> {
    let t0 = Instant::now();
    let writer = store.writer().await?;
    let snapshot = snapshot_path(&config.daily_snapshot_path_template, run_date(started_at));
    let concurrency = config.concurrency.max(1);

    info!(
        concurrency,
        run_timeout_ms = config.run_timeout_ms,
        snapshot = %snapshot.display(),
        "Starting run"
    );

    let deadline = async {
        match config.run_timeout() {
            Some(limit) => sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    let outcomes: Vec<UrlOutcome> = stream::iter(sources.iter().enumerate())
        .map(|(position, url)| async move {
            let result = process_url(fetcher, url).await;
            match &result {
                Ok(title) => debug!(%url, title = %truncate_for_log(title, 120), "Collected title"),
                Err(e) => debug!(%url, error = %e, "No title"),
            }
            UrlOutcome {
                position,
                source_url: url.clone(),
                result,
            }
        })
        .buffer_unordered(concurrency)
        .take_until(deadline)
        .collect()
        .await;

    if outcomes.len() < sources.len() {
        warn!(
            completed = outcomes.len(),
            pending = sources.len() - outcomes.len(),
            "Run timeout expired; dropping pending URLs"
        );
    }

    let stats = Accumulator::new(writer, snapshot, started_at)
        .merge(sources.len(), outcomes)
        .await?;

    info!(
        elapsed_ms = t0.elapsed().as_millis() as u64,
        attempted = stats.attempted,
        succeeded = stats.succeeded,
        failed = stats.failed,
        new_records = stats.new_records,
        total_records = store.len(),
        "Run complete"
    );
    Ok(stats)
}
