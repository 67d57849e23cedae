//! JSON dataset store
//!
//! The whole network is kept in one pretty-printed JSON file holding a
//! [`NetworkSnapshot`]: flat `waypoints`, `routes` and `route_waypoints` tables.
//! Saves go through a temporary file in the same directory which is then renamed over the
//! dataset, so an interrupted save leaves the previous dataset intact.

use air_network_lib::store::NetworkSnapshot;
use air_network_lib::{Network, NetworkError, NetworkStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No dataset at {0}, create one with `init`")]
    Missing(PathBuf),

    #[error("A dataset already exists at {0}")]
    Exists(PathBuf),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for NetworkError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Io(e) => NetworkError::Io(e),
            StorageError::Json(e) => NetworkError::Io(e.into()),
            other => NetworkError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

/// A network stored as a single JSON file
pub struct FileStore {
    /// Path to the backing JSON file.
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Create the dataset directory and an empty dataset
    pub fn init(&self, force: bool) -> StorageResult<()> {
        if self.exists() && !force {
            return Err(StorageError::Exists(self.path.clone()));
        }
        if let Some(parent) = self.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.write_snapshot(&NetworkSnapshot::default())?;
        tracing::info!("Created empty dataset at {}", self.path.display());
        Ok(())
    }

    pub fn read_snapshot(&self) -> StorageResult<NetworkSnapshot> {
        if !self.exists() {
            return Err(StorageError::Missing(self.path.clone()));
        }
        let data = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn write_snapshot(&self, snapshot: &NetworkSnapshot) -> StorageResult<()> {
        let directory = self.parent().unwrap_or(Path::new("."));
        let mut file = tempfile::NamedTempFile::new_in(directory)?;
        serde_json::to_writer_pretty(&mut file, snapshot)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn parent(&self) -> Option<&Path> {
        self.path.parent().filter(|parent| !parent.as_os_str().is_empty())
    }
}

impl NetworkStore for FileStore {
    fn load(&self) -> air_network_lib::Result<Network> {
        let snapshot = self.read_snapshot()?;
        let (network, warnings) = snapshot.into_network();
        tracing::debug!(
            "Loaded {} waypoint(s) and {} route(s) from {} with {} warning(s)",
            network.waypoints().len(),
            network.routes().len(),
            self.path.display(),
            warnings.len()
        );
        Ok(network)
    }

    fn save(&self, network: &Network) -> air_network_lib::Result<()> {
        self.write_snapshot(&NetworkSnapshot::from(network))?;
        tracing::debug!("Saved dataset to {}", self.path.display());
        Ok(())
    }
}
