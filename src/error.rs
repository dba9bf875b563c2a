//! Error taxonomy for the ingestion pipeline.
//!
//! Per-URL failures ([`FetchFailure`], [`ExtractFailure`], wrapped together as
//! [`PageFailure`]) are recovered locally and only counted in
//! [`RunStats`](crate::models::RunStats). A [`StoreFailure`] means the durable
//! write path is broken and aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Why a page could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("HTTP status {0}")]
    HttpError(u16),

    #[error("gave up after {attempts} attempts (last error: {last})")]
    RetriesExhausted {
        attempts: u32,
        last: Box<FetchFailure>,
    },

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl FetchFailure {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Network-level errors, 5xx, 408 and 429 are transient; every other
    /// status and malformed URLs are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchFailure::Timeout | FetchFailure::ConnectionError(_) => true,
            FetchFailure::HttpError(status) => {
                (500..600).contains(status) || *status == 408 || *status == 429
            }
            FetchFailure::RetriesExhausted { .. } | FetchFailure::InvalidUrl(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchFailure::Timeout
        } else if let Some(status) = e.status() {
            FetchFailure::HttpError(status.as_u16())
        } else if e.is_builder() {
            FetchFailure::InvalidUrl(e.to_string())
        } else {
            FetchFailure::ConnectionError(e.to_string())
        }
    }
}

/// Why no title could be taken from a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractFailure {
    #[error("no title found")]
    NoTitleFound,

    #[error("body is not markup")]
    MalformedMarkup,
}

/// Outcome tag for a single URL that did not yield a title.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageFailure {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchFailure),

    #[error("extract failed: {0}")]
    Extract(#[from] ExtractFailure),
}

/// The durable write path is broken.
#[derive(Debug, Error)]
pub enum StoreFailure {
    #[error("write conflict: {0}")]
    WriteConflict(String),

    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record at {path}:{line}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreFailure {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreFailure::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a whole `run_once` call.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreFailure),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SourceListError {
    #[error("cannot read source list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no valid urls in {0}")]
    Empty(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchFailure::Timeout.is_transient());
        assert!(FetchFailure::ConnectionError("reset".into()).is_transient());
        assert!(FetchFailure::HttpError(503).is_transient());
        assert!(FetchFailure::HttpError(429).is_transient());
        assert!(FetchFailure::HttpError(408).is_transient());
        assert!(!FetchFailure::HttpError(404).is_transient());
        assert!(!FetchFailure::HttpError(403).is_transient());
        assert!(!FetchFailure::InvalidUrl("nope".into()).is_transient());
    }

    #[test]
    fn test_exhausted_is_terminal() {
        let e = FetchFailure::RetriesExhausted {
            attempts: 3,
            last: Box::new(FetchFailure::Timeout),
        };
        assert!(!e.is_transient());
        assert_eq!(e.to_string(), "gave up after 3 attempts (last error: request timed out)");
    }

    #[test]
    fn test_page_failure_from() {
        let p: PageFailure = ExtractFailure::NoTitleFound.into();
        assert_eq!(p, PageFailure::Extract(ExtractFailure::NoTitleFound));
        let p: PageFailure = FetchFailure::HttpError(500).into();
        assert_eq!(p.to_string(), "fetch failed: HTTP status 500");
    }
}
