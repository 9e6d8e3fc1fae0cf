use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fnv::FnvHashSet;
use log::{debug, warn};
use serde_json::Value;

use crate::record::NewsletterRecord;

/// An append only list of [`NewsletterRecord`]s stored as a json array.
///
/// Records are unique by `message_id`, the first record stored for an id
/// wins. The store assumes to be the only writer of its file.
#[derive(Debug, Clone)]
pub struct NewsletterStore {
    path: PathBuf,
    records: Vec<NewsletterRecord>,
    ids: FnvHashSet<String>,
}

impl NewsletterStore {
    /// A store without any records, that will be saved to `path`.
    pub fn new<T: AsRef<Path>>(path: T) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: Vec::new(),
            ids: FnvHashSet::default(),
        }
    }

    /// Loads the store at `path`.
    ///
    /// A missing file is an empty store, so is a file that can't be read as
    /// json array. Entries that aren't valid records are skipped.
    pub async fn open<T: AsRef<Path>>(path: T) -> Self {
        let mut store = NewsletterStore::new(path);

        let content = match tokio::fs::read(&store.path).await {
            Ok(content) => content,
            Err(err) => {
                debug!("No newsletters at {:?}: {}", store.path, err);
                return store;
            }
        };

        let entries: Vec<Value> = match serde_json::from_slice(&content) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "Starting with empty newsletter collection, {:?} is corrupt: {}",
                    store.path, err
                );
                return store;
            }
        };

        for (idx, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<NewsletterRecord>(entry) {
                Ok(record) => {
                    store.insert(record);
                }
                Err(err) => warn!("Skipping newsletter #{} in {:?}: {}", idx, store.path, err),
            }
        }
        debug!("Loaded {} newsletters from {:?}", store.len(), store.path);
        store
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn contains(&self, message_id: &str) -> bool {
        self.ids.contains(message_id)
    }

    /// Appends the record unless its `message_id` is already known.
    ///
    /// Returns whether the record was added.
    pub fn insert(&mut self, record: NewsletterRecord) -> bool {
        if !self.ids.insert(record.message_id.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// All records in insertion order.
    #[inline]
    pub fn records(&self) -> &[NewsletterRecord] {
        &self.records
    }

    /// The most recently added record.
    #[inline]
    pub fn latest(&self) -> Option<&NewsletterRecord> {
        self.records.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes all records as pretty printed json, creating missing parent
    /// directories.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}.", parent))?;
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write newsletters to {:?}.", self.path))?;
        Ok(())
    }
}
