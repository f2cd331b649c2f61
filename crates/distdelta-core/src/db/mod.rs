// crates/distdelta-core/src/db/mod.rs

pub mod format;
pub mod record;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{DeltaError, Result};

pub use record::DeltaRecord;

/// Ordered, file-backed collection of [`DeltaRecord`]s.
///
/// Insertion order survives reloads. The only mutation is [`upsert`], which
/// rewrites the whole file through a temporary sibling and a rename, so a
/// concurrent reader sees either the old or the new file. Callers that share
/// a database across threads must serialize upserts (the batch driver wraps
/// it in a `Mutex`).
///
/// [`upsert`]: DeltaDatabase::upsert
#[derive(Debug)]
pub struct DeltaDatabase {
    path: PathBuf,
    records: Vec<DeltaRecord>,
    by_delta: HashMap<String, usize>,
    by_destination: HashMap<String, Vec<usize>>,
}

impl DeltaDatabase {
    /// Parses the database at `path`. A missing file is an empty database.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            format::decode(&text)?
        } else {
            debug!(path = %path.display(), "delta database not found, starting empty");
            Vec::new()
        };

        let mut db = Self {
            path,
            records,
            by_delta: HashMap::new(),
            by_destination: HashMap::new(),
        };
        db.reindex();
        debug!(path = %db.path.display(), records = db.records.len(), "delta database loaded");
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DeltaRecord] {
        &self.records
    }

    pub fn contains(&self, delta_name: &str) -> bool {
        self.by_delta.contains_key(delta_name)
    }

    pub fn lookup_by_delta(&self, delta_name: &str) -> Option<&DeltaRecord> {
        self.by_delta.get(delta_name).map(|&i| &self.records[i])
    }

    /// Every record producing `dest_name`, in database order.
    pub fn lookup_by_destination(&self, dest_name: &str) -> Vec<&DeltaRecord> {
        self.by_destination
            .get(dest_name)
            .map(|ids| ids.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Replaces any record with the same delta basename, appends `record`, and
    /// rewrites the file. On a failed write the in-memory state is restored
    /// and the error is [`DeltaError::Database`].
    pub fn upsert(&mut self, record: DeltaRecord) -> Result<()> {
        let previous = self.records.clone();

        let before = self.records.len();
        self.records.retain(|r| r.delta_name() != record.delta_name());
        let replaced = before - self.records.len();

        let delta_name = record.delta_name().to_string();
        self.records.push(record);
        self.reindex();

        if let Err(e) = self.persist() {
            self.records = previous;
            self.reindex();
            return Err(DeltaError::Database(format!("{}: {e}", self.path.display())));
        }

        info!(
            delta = %delta_name,
            replaced,
            records = self.records.len(),
            "delta database updated"
        );
        Ok(())
    }

    fn reindex(&mut self) {
        self.by_delta.clear();
        self.by_destination.clear();
        for (i, r) in self.records.iter().enumerate() {
            self.by_delta.insert(r.delta_name().to_string(), i);
            self.by_destination
                .entry(r.destination().name().to_string())
                .or_default()
                .push(i);
        }
    }

    fn persist(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut tmp = NamedTempFile::new_in(&parent)?;
        tmp.write_all(format::encode(&self.records).as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
