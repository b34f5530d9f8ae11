//! Installed resource records
//!
//! Each installed resource has a JSON sidecar next to the store's
//! bookkeeping data describing what was installed and what it depends on.

use crate::id::ResourceId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during record operations
#[derive(Debug, Error)]
pub enum RecordError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Sidecar record of one installed resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledRecord {
    /// Installed identity
    pub id: ResourceId,

    /// Resolved dependencies, in manifest order
    #[serde(default)]
    pub dependencies: Vec<ResourceId>,

    /// Artifact path relative to the store root (`<kind>/<name>`)
    pub local_path: String,

    /// SHA-256 checksum of the artifact (hex-encoded)
    pub checksum: String,

    /// Timestamp when installed (Unix timestamp)
    pub installed_at: u64,
}

impl InstalledRecord {
    /// Create a record for freshly installed bytes
    pub fn new(id: ResourceId, dependencies: Vec<ResourceId>, checksum: String) -> Self {
        let local_path = format!("{}/{}", id.kind, id.name);
        Self {
            id,
            dependencies,
            local_path,
            checksum,
            installed_at: Self::current_timestamp(),
        }
    }

    /// Load a record from a JSON file
    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let contents = fs::read_to_string(path)?;
        let record = serde_json::from_str(&contents)?;
        Ok(record)
    }

    /// Write the record as JSON
    pub fn save(&self, path: &Path) -> Result<(), RecordError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn current_timestamp() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ResourceKind;
    use crate::semver::Version;

    fn record() -> InstalledRecord {
        let id = ResourceId::new(ResourceKind::Model, "model1.pmml", Version::new(1, 0, 0)).unwrap();
        let dep = ResourceId::new(ResourceKind::Data, "dataset.json", Version::new(1, 0, 0)).unwrap();
        InstalledRecord::new(id, vec![dep], "abc123".to_string())
    }

    #[test]
    fn test_record_creation() {
        let record = record();
        assert_eq!(record.local_path, "model/model1.pmml");
        assert_eq!(record.dependencies.len(), 1);
        assert!(record.installed_at > 0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model1.pmml.json");

        let record = record();
        record.save(&path).unwrap();

        let loaded = InstalledRecord::load(&path).unwrap();
        assert_eq!(loaded, record);
    }
}
