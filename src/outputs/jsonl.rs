//! JSON-lines table codec.
//!
//! Both persisted tables hold one [`Record`] per line:
//!
//! ```text
//! {"source_url":"https://ex.com/a","title":"Alpha Note","collected_at":"2025-10-28T10:00:00Z"}
//! ```
//!
//! A record is only complete once its terminating newline is on disk. A
//! trailing fragment without one is the remnant of an interrupted append; it is
//! reported as torn rather than parsed.

use crate::error::StoreFailure;
use crate::models::Record;
use crate::utils::squash_whitespace;
use serde::de;
use std::io;
use std::path::Path;
use tokio::fs;

/// Result of decoding a table.
#[derive(Debug)]
pub struct Decoded {
    pub records: Vec<Record>,
    /// Byte length of the complete, newline-terminated prefix.
    pub complete_len: usize,
    /// Whether bytes follow the last newline.
    pub torn: bool,
}

/// Serialize one record as a newline-terminated line.
pub fn encode_line(record: &Record) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(line)
}

/// Decode every complete line of `bytes`. Blank lines are skipped.
///
/// Titles are whitespace-squashed; a record whose title is empty after that
/// is reported as corrupt.
///
/// `path` is only used for error reporting.
pub fn decode(path: &Path, bytes: &[u8]) -> Result<Decoded, StoreFailure> {
    let complete_len = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut records = Vec::new();
    for (i, line) in bytes[..complete_len].split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let corrupt = |source: serde_json::Error| StoreFailure::Corrupt {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        };
        let mut record = serde_json::from_slice::<Record>(line).map_err(corrupt)?;
        record.title = squash_whitespace(&record.title);
        if record.title.is_empty() {
            return Err(corrupt(<serde_json::Error as de::Error>::custom("empty title")));
        }
        records.push(record);
    }

    Ok(Decoded {
        records,
        complete_len,
        torn: complete_len < bytes.len(),
    })
}

/// Read all complete records from a table. A missing file is an empty table.
pub async fn read_records(path: &Path) -> Result<Vec<Record>, StoreFailure> {
    match fs::read(path).await {
        Ok(bytes) => Ok(decode(path, &bytes)?.records),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(StoreFailure::io(path, e)),
    }
}
