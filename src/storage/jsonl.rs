//! JSONL (JSON Lines) collections.
//!
//! Each line is one document. Files are rewritten whole on update, through a
//! temporary file and a rename so readers never observe a half-written file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{StorageConfig, StoreError};

/// Document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Members,
    Equipment,
    Activity,
    Announcements,
    Events,
}

impl Collection {
    /// Get the filename for this collection.
    pub fn filename(&self) -> &'static str {
        match self {
            Collection::Members => "members.jsonl",
            Collection::Equipment => "equipment.jsonl",
            Collection::Activity => "activity.jsonl",
            Collection::Announcements => "announcements.jsonl",
            Collection::Events => "events.jsonl",
        }
    }
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for a collection.
    pub fn for_collection(config: &StorageConfig, collection: Collection) -> Self {
        Self::new(config.collection_path(collection))
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append documents to the end of the file.
    pub fn append_batch(&self, documents: &[T]) -> Result<usize, StoreError> {
        if documents.is_empty() {
            return Ok(0);
        }

        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        for doc in documents {
            let json = serde_json::to_string(doc)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        debug!("Appended {} documents to {:?}", documents.len(), self.path);
        Ok(documents.len())
    }

    /// Write documents, replacing the entire file.
    pub fn write_all(&self, documents: &[T]) -> Result<usize, StoreError> {
        self.ensure_dir()?;

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            for doc in documents {
                let json = serde_json::to_string(doc)?;
                writeln!(writer, "{}", json)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!("Wrote {} documents to {:?}", documents.len(), self.path);
        Ok(documents.len())
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for a collection.
    pub fn for_collection(config: &StorageConfig, collection: Collection) -> Self {
        Self::new(config.collection_path(collection))
    }

    /// Read all documents. A missing file reads as an empty collection and
    /// malformed lines are skipped.
    pub fn read_all(&self) -> Result<Vec<T>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        if !self.path.is_file() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a regular file",
                self.path.display()
            )));
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut documents = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", idx + 1, self.path, e);
                }
            }
        }

        debug!("Read {} documents from {:?}", documents.len(), self.path);
        Ok(documents)
    }

    /// Read documents matching a predicate.
    pub fn read_where<F>(&self, predicate: F) -> Result<Vec<T>, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        let all = self.read_all()?;
        Ok(all.into_iter().filter(predicate).collect())
    }
}
