//! Source list loading.
//!
//! The list is plain text, one URL per line:
//!
//! ```text
//! # national
//! https://www3.nhk.or.jp/news/
//!
//! https://example.com/blog
//! ```
//!
//! Blank lines and `#` comments are ignored; anything that is not an absolute
//! `http(s)` URL is logged and skipped. Repeated URLs keep their first
//! position.

use crate::error::SourceListError;
use crate::models::SourceUrl;
use itertools::Itertools;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Parse source list text into URLs, in file order.
pub fn parse_source_list(text: &str) -> Vec<SourceUrl> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let url = SourceUrl::parse(line);
            if url.is_none() {
                warn!(line, "Skipping invalid url format");
            }
            url
        })
        .unique()
        .collect()
}

/// Read and parse the source list at `path`.
///
/// # Errors
///
/// [`SourceListError::Read`] if the file cannot be read and
/// [`SourceListError::Empty`] if it holds no valid URL.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_source_list(path: &Path) -> Result<Vec<SourceUrl>, SourceListError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceListError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let urls = parse_source_list(&text);
    if urls.is_empty() {
        return Err(SourceListError::Empty(path.to_path_buf()));
    }
    info!(count = urls.len(), "Loaded source list");
    Ok(urls)
}
