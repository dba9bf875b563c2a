//! Persisted tables and result rendering.
//!
//! # Submodules
//!
//! - [`jsonl`]: The one-record-per-line codec shared by both tables
//! - [`snapshot`]: Daily snapshot path templating and atomic replacement
//! - [`render`]: Query results as a text table or JSON for the CLI
//!
//! # Output Structure
//!
//! ```text
//! data/
//! ├── titles.jsonl                 # cumulative store, append-only
//! └── daily/
//!     ├── titles-2025-05-06.jsonl  # one snapshot per run date
//!     └── titles-2025-05-07.jsonl
//! ```

pub mod jsonl;
pub mod render;
pub mod snapshot;
