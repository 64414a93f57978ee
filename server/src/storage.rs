//! Whole-document JSON files
//!
//! A document is always replaced as one unit: the new content is written to a
//! temporary file next to the target, synced, and renamed over it.

use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Instant,
};

#[derive(Debug, Error)]
pub enum FileError {
    #[error("cannot access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("{path} does not hold the expected document: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },

    #[error("deadline passed before {path} was replaced")]
    DeadlinePassed { path: PathBuf },
}

#[derive(Clone, Debug)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> FileError {
        FileError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Reads and parses the document, `None` if there is none yet.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, FileError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(self.io_error(error)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| FileError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Replaces the document.
    ///
    /// With a `deadline` the rename is skipped once it has passed and the previous content stays in place.
    pub fn persist<T: Serialize>(&self, value: &T, deadline: Option<Instant>) -> Result<(), FileError> {
        let directory = self.directory();
        fs::create_dir_all(directory).map_err(|error| self.io_error(error))?;

        let mut temp_file = NamedTempFile::new_in(directory).map_err(|error| self.io_error(error))?;

        serde_json::to_writer_pretty(&mut temp_file, value)
            .map_err(io::Error::from)
            .and_then(|()| temp_file.write_all(b"\n"))
            .and_then(|()| temp_file.as_file().sync_all())
            .map_err(|error| self.io_error(error))?;

        if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
            tracing::warn!("abandoning write to {}", self.path.display());
            return Err(FileError::DeadlinePassed {
                path: self.path.clone(),
            });
        }

        temp_file
            .persist(&self.path)
            .map_err(|error| self.io_error(error.error))?;
        tracing::trace!("replaced {}", self.path.display());
        Ok(())
    }

    /// Writes `initial` unless a document already exists.
    pub fn materialize<T: Serialize>(&self, initial: &T) -> Result<bool, FileError> {
        if self.path.exists() {
            return Ok(false);
        }
        tracing::info!("creating {}", self.path.display());
        self.persist(initial, None)?;
        Ok(true)
    }
}
