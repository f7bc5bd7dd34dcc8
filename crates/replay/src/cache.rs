//! Single-slot on-disk cache holding the last kept recording.

use std::fs;
use std::path::{Path, PathBuf};

use bevy::prelude::*;

use crate::atomic_write::atomic_write;
use crate::codec;
use crate::replay_error::ReplayError;
use crate::session::ReplayData;

#[derive(Resource, Debug, Clone)]
pub struct ReplayCache {
    path: PathBuf,
}

impl ReplayCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Encode `data` and replace the slot contents.
    pub fn write(&self, data: &ReplayData) -> Result<(), ReplayError> {
        let bytes = codec::encode(data);
        atomic_write(&self.path, &bytes)?;
        debug!(
            "Wrote replay cache {} ({} bytes)",
            self.path.display(),
            bytes.len()
        );
        Ok(())
    }

    /// Read and decode the slot. A missing file is `ReplayError::NoCache`.
    pub fn read(&self) -> Result<ReplayData, ReplayError> {
        let bytes = fs::read(&self.path)?;
        codec::decode(&bytes)
    }

    /// Remove the slot. Deleting an absent file is not an error.
    pub fn delete(&self) -> Result<(), ReplayError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReplayError::Io(e)),
        }
    }
}
