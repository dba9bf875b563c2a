//! Durable cumulative store with its search index.
//!
//! The store is a JSON-lines file (see [`outputs::jsonl`](crate::outputs::jsonl))
//! mirrored by an in-memory [`SearchIndex`]. Writes go through a single
//! [`StoreWriter`]: a record is appended and synced to disk first, then
//! inserted into the index, so a query never observes a record that is not
//! durable, and never a partial one.
//!
//! Readers share `&Store` and query under a read lock; they never wait for a
//! run, only for the instant a single record is inserted.

use crate::error::StoreFailure;
use crate::index::{SearchIndex, SearchQuery};
use crate::models::{DedupKey, Record};
use crate::outputs::jsonl::{self, encode_line};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    index: RwLock<SearchIndex>,
    writer: Mutex<()>,
}

impl Store {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty store. A trailing fragment left by an
    /// interrupted append is cut from the file. Records repeating an earlier
    /// key are skipped.
    ///
    /// # Errors
    ///
    /// [`StoreFailure::Io`] if the file cannot be read or repaired, and
    /// [`StoreFailure::Corrupt`] if a complete line does not decode.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreFailure> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreFailure::io(parent, e))?;
        }

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(StoreFailure::io(&path, e)),
        };
        let decoded = jsonl::decode(&path, &bytes)?;

        if decoded.torn {
            warn!(
                kept_bytes = decoded.complete_len,
                dropped_bytes = bytes.len() - decoded.complete_len,
                "Truncating torn trailing record"
            );
            let file = OpenOptions::new()
                .write(true)
                .open(&path)
                .await
                .map_err(|e| StoreFailure::io(&path, e))?;
            file.set_len(decoded.complete_len as u64)
                .await
                .map_err(|e| StoreFailure::io(&path, e))?;
            file.sync_all()
                .await
                .map_err(|e| StoreFailure::io(&path, e))?;
        }

        let mut index = SearchIndex::new();
        let mut skipped = 0usize;
        for record in decoded.records {
            if !index.insert(record) {
                skipped += 1;
            }
        }
        if skipped > 0 {
            warn!(skipped, "Skipped records with duplicate keys");
        }
        info!(records = index.len(), "Opened cumulative store");

        Ok(Store {
            path,
            index: RwLock::new(index),
            writer: Mutex::new(()),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, SearchIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.read().contains(key)
    }

    /// Copy of every record, in insertion order.
    pub fn records(&self) -> Vec<Record> {
        self.read().records().to_vec()
    }

    pub fn query_exact(&self, text: &str) -> Vec<Record> {
        self.read().query_exact(text)
    }

    pub fn query_fulltext(&self, text: &str) -> Vec<Record> {
        self.read().query_fulltext(text)
    }

    pub fn query_substring(&self, text: &str) -> Vec<Record> {
        self.read().query_substring(text)
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<Record> {
        self.read().search(query)
    }

    /// Claim the single writer slot.
    ///
    /// # Errors
    ///
    /// [`StoreFailure::WriteConflict`] if another writer is live, and
    /// [`StoreFailure::Io`] if the file cannot be opened for appending.
    pub async fn writer(&self) -> Result<StoreWriter<'_>, StoreFailure> {
        let guard = self.writer.try_lock().map_err(|_| {
            StoreFailure::WriteConflict(format!(
                "{} already has an active writer",
                self.path.display()
            ))
        })?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreFailure::io(&self.path, e))?;
        let committed = file
            .metadata()
            .await
            .map_err(|e| StoreFailure::io(&self.path, e))?
            .len();
        Ok(StoreWriter {
            store: self,
            file,
            committed,
            poisoned: false,
            _guard: guard,
        })
    }

    /// Append a single record through a short-lived writer.
    pub async fn upsert(&self, record: Record) -> Result<(), StoreFailure> {
        self.writer().await?.upsert(record).await
    }
}

/// Exclusive append handle on a [`Store`].
#[derive(Debug)]
pub struct StoreWriter<'a> {
    store: &'a Store,
    file: File,
    /// File length up to the last fully synced record.
    committed: u64,
    /// Set when a failed append could not be rolled back.
    poisoned: bool,
    _guard: MutexGuard<'a, ()>,
}

impl StoreWriter<'_> {
    pub fn store(&self) -> &Store {
        self.store
    }

    /// Persist `record` and make it visible to queries.
    ///
    /// A failed append is cut back to the last complete record, so the file
    /// never keeps a fragment that a later append would turn into a corrupt
    /// line.
    ///
    /// # Errors
    ///
    /// [`StoreFailure::WriteConflict`] if its key is already stored, and
    /// [`StoreFailure::Io`] if the append does not reach disk or the writer
    /// could not repair an earlier failure; in every case the record stays
    /// invisible.
    #[instrument(level = "debug", skip_all, fields(url = %record.source_url))]
    pub async fn upsert(&mut self, record: Record) -> Result<(), StoreFailure> {
        let store = self.store;
        let path = &store.path;
        if self.poisoned {
            return Err(StoreFailure::io(
                path,
                io::Error::other("writer poisoned by an unrepaired failed append; reopen the store"),
            ));
        }
        if store.contains(&record.key()) {
            return Err(StoreFailure::WriteConflict(format!(
                "record already stored: {} | {}",
                record.source_url, record.title
            )));
        }

        let line = encode_line(&record).map_err(|e| StoreFailure::io(path, e.into()))?;
        if let Err(e) = self.append(&line).await {
            self.rollback().await;
            return Err(StoreFailure::io(path, e));
        }
        self.committed += line.len() as u64;

        store
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record);
        debug!("Stored record");
        Ok(())
    }

    async fn append(&mut self, line: &[u8]) -> io::Result<()> {
        self.file.write_all(line).await?;
        self.file.flush().await?;
        self.file.sync_data().await
    }

    /// Cut the file back to `committed`, poisoning the writer if that fails.
    async fn rollback(&mut self) {
        let _ = self.file.flush().await;
        let repaired = match self.file.set_len(self.committed).await {
            Ok(()) => self.file.sync_data().await,
            Err(e) => Err(e),
        };
        match repaired {
            Ok(()) => warn!(len = self.committed, "Rolled back failed append"),
            Err(e) => {
                error!(error = %e, len = self.committed, "Cannot roll back failed append");
                self.poisoned = true;
            }
        }
    }
}
