//! # Title Ledger
//!
//! Collects article titles from a fixed list of pages on a recurring basis,
//! accumulates them into a deduplicated historical ledger, and makes the
//! ledger searchable.
//!
//! ## Architecture
//!
//! The crate follows a pipeline architecture:
//! 1. **Loading**: Read the source list ([`sources`])
//! 2. **Fetching**: Download each page with bounded retries ([`fetch`])
//! 3. **Extracting**: Pull the page title out of the HTML ([`scrapers`])
//! 4. **Accumulating**: Replace today's snapshot and append new titles to the
//!    cumulative store ([`accumulate`])
//! 5. **Querying**: Exact, substring, full-text and filtered lookups over the
//!    store ([`store`], [`index`])
//!
//! Steps 2 and 3 run concurrently per URL; step 4 is the single writer.
//!
//! ## Usage
//!
//! ```no_run
//! use title_ledger::{PipelineConfig, Store, load_source_list, run_once};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let store = Store::open(&config.cumulative_store_path).await?;
//! let sources = load_source_list("targets.txt".as_ref()).await?;
//!
//! let stats = run_once(&sources, &config, &store).await?;
//! println!("{} new titles", stats.new_records);
//!
//! for record in store.query_fulltext("election results") {
//!     println!("{} {}", record.collected_at, record.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod accumulate;
pub mod config;
pub mod error;
pub mod fetch;
pub mod index;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod quality;
pub mod scrapers;
pub mod sources;
pub mod store;
pub mod utils;

pub use config::{BackoffStrategy, PipelineConfig};
pub use error::{ExtractFailure, FetchFailure, PageFailure, RunError, StoreFailure};
pub use index::{Order, SearchQuery};
pub use models::{Record, RunStats, SourceUrl};
pub use pipeline::{run_once, run_once_with};
pub use sources::load_source_list;
pub use store::Store;
