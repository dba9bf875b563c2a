//! Text normalization, tokenization, and file system helpers.
//!
//! This module provides helper functions used throughout the crate:
//! - Whitespace squashing and title normalization for dedup keys
//! - Tokenization for the full-text index
//! - String truncation for logging
//! - File system validation for output directories

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Collapse every whitespace run to a single space and trim both ends.
///
/// # Examples
///
/// ```
/// use title_ledger::utils::squash_whitespace;
/// assert_eq!(squash_whitespace("  Hello \n\t World "), "Hello World");
/// ```
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a title for identity comparisons.
///
/// Squashes whitespace and lower-cases, so `"Hello World"`, `"hello   world"`
/// and `" HELLO WORLD "` all normalize to `"hello world"`.
///
/// The fold is `str::to_lowercase`, not full Unicode case folding:
/// `"STRASSE"` and `"straße"` stay distinct.
pub fn normalize_title(s: &str) -> String {
    squash_whitespace(s).to_lowercase()
}

/// Split text into lower-cased tokens on non-alphanumeric boundaries.
///
/// # Examples
///
/// ```
/// use title_ledger::utils::tokenize;
/// assert_eq!(tokenize("Local Election-Results, 2024!"), vec!["local", "election", "results", "2024"]);
/// ```
pub fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a byte count
/// indicator appended. Cuts on a char boundary, so multi-byte titles are safe.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then writes and removes a probe
/// file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let s = "日本語のタイトル";
        assert_eq!(truncate_for_log(s, 3), "日本語…(+15 bytes)");
    }

    #[test]
    fn test_normalize_title_equivalence() {
        let a = normalize_title("Hello World");
        let b = normalize_title("hello   world");
        let c = normalize_title(" HELLO WORLD ");
        assert_eq!(a, "hello world");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_normalize_title_uses_simple_lowercase() {
        assert_eq!(normalize_title("ÉCOLE  Ouverte"), "école ouverte");
        assert_eq!(normalize_title("ΑΘΗΝΑ"), normalize_title("αθηνα"));
        assert_ne!(normalize_title("STRASSE"), normalize_title("straße"));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("National Election Preview"), vec!["national", "election", "preview"]);
        assert_eq!(tokenize("  --  "), Vec::<String>::new());
        assert_eq!(tokenize("ÉLAN vital"), vec!["élan", "vital"]);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
