//! Title Ledger command-line entry point.
//!
//! ```sh
//! title_ledger run --sources automation/targets.txt
//! title_ledger search --fulltext "rate cut" --fmt json
//! title_ledger quality --max-dup-rate 0.2
//! ```

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;

use cli::{Cli, Command, OutputFormat, QualityArgs, RunArgs, SearchArgs};
use title_ledger::outputs::render::{render_json, render_table};
use title_ledger::quality::{self, Rules};
use title_ledger::utils::ensure_writable_dir;
use title_ledger::{load_source_list, run_once, PipelineConfig, Record, SearchQuery, Store};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path).await?,
        None => PipelineConfig::default(),
    };
    if let Some(store) = &args.store {
        config.cumulative_store_path = store.clone();
    }

    match args.command {
        Command::Run(run) => run_command(run, config).await,
        Command::Search(search) => search_command(search, &config).await,
        Command::Quality(qc) => quality_command(qc, &config).await,
    }
}

async fn run_command(args: RunArgs, mut config: PipelineConfig) -> Result<(), Box<dyn Error>> {
    args.apply(&mut config);
    config.validate()?;

    // Early check: the store directory must be writable before anything is fetched
    let store_dir = config
        .cumulative_store_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if let Err(e) = ensure_writable_dir(store_dir).await {
        error!(
            path = %store_dir.display(),
            error = %e,
            "Store directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let sources = load_source_list(&args.sources).await?;
    info!(count = sources.len(), path = %args.sources.display(), "Loaded source list");

    let store = Store::open(&config.cumulative_store_path).await?;
    let start_time = std::time::Instant::now();
    let stats = run_once(&sources, &config, &store).await?;

    info!(
        attempted = stats.attempted,
        succeeded = stats.succeeded,
        failed = stats.failed,
        new_records = stats.new_records,
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "Run finished"
    );
    if stats.succeeded == 0 {
        warn!("No page yielded a title this run");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "attempted={} succeeded={} failed={} aborted={} duplicates_skipped={} new_records={} snapshot={}",
            stats.attempted,
            stats.succeeded,
            stats.failed,
            stats.aborted,
            stats.duplicates_skipped,
            stats.new_records,
            stats.snapshot_path.display()
        );
    }
    Ok(())
}

async fn search_command(args: SearchArgs, config: &PipelineConfig) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.cumulative_store_path).await?;
    debug!(records = store.len(), "Store opened for search");

    let results = if let Some(text) = &args.exact {
        page(store.query_exact(text), &args)
    } else if let Some(text) = &args.fulltext {
        page(store.query_fulltext(text), &args)
    } else {
        store.search(&SearchQuery {
            q: args.q.clone(),
            date_from: args.date_from,
            date_to: args.date_to,
            limit: args.limit,
            offset: args.offset,
            order: args.order.into(),
        })
    };

    let out = match args.fmt {
        OutputFormat::Table => render_table(&results),
        OutputFormat::Json => render_json(&results)? + "\n",
    };
    print!("{out}");
    Ok(())
}

/// Date window and paging for exact and full-text results, which keep their
/// own relevance order.
fn page(results: Vec<Record>, args: &SearchArgs) -> Vec<Record> {
    results
        .into_iter()
        .filter(|r| args.date_from.is_none_or(|from| r.collected_at >= from))
        .filter(|r| args.date_to.is_none_or(|to| r.collected_at < to))
        .skip(args.offset)
        .take(args.limit)
        .collect()
}

async fn quality_command(args: QualityArgs, config: &PipelineConfig) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.cumulative_store_path).await?;
    let rules = Rules {
        min_new_rows: args.min_new_rows,
        max_dup_rate: args.max_dup_rate,
        allow_empty_title: args.allow_empty_title,
    };

    let report = quality::run_check(&store.records(), &rules, Utc::now().date_naive());
    print!("{}", report.to_markdown());

    if !report.ok {
        error!(problems = report.problems.len(), "Data quality check failed");
        std::process::exit(1);
    }
    info!("Data quality check passed");
    Ok(())
}
