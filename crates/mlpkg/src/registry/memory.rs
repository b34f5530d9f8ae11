//! In-process registry
//!
//! Holds published resources in memory. Used to embed a registry in tools
//! and tests without a server.

use super::{Registry, RegistryError};
use crate::id::ResourceId;
use crate::kind::ResourceKind;
use crate::manifest::Manifest;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct State {
    published: BTreeMap<ResourceId, (Manifest, Vec<u8>)>,
    offline: bool,
    manifest_fetches: usize,
    artifact_fetches: usize,
}

/// Registry kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: Mutex<State>,
}

impl MemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a transport failure on every subsequent call
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Number of manifest fetches served so far
    pub fn manifest_fetches(&self) -> usize {
        self.state.lock().manifest_fetches
    }

    /// Number of artifact fetches served so far
    pub fn artifact_fetches(&self) -> usize {
        self.state.lock().artifact_fetches
    }

    fn ensure_online(state: &State) -> Result<(), RegistryError> {
        if state.offline {
            return Err(RegistryError::Unavailable("registry is offline".to_string()));
        }
        Ok(())
    }
}

impl Registry for MemoryRegistry {
    fn list_available(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceId>, RegistryError> {
        let state = self.state.lock();
        Self::ensure_online(&state)?;

        Ok(state
            .published
            .keys()
            .filter(|id| kind.map_or(true, |k| id.kind == k))
            .cloned()
            .collect())
    }

    fn fetch_manifest(&self, id: &ResourceId) -> Result<Manifest, RegistryError> {
        let mut state = self.state.lock();
        Self::ensure_online(&state)?;
        state.manifest_fetches += 1;

        state
            .published
            .get(id)
            .map(|(manifest, _)| manifest.clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    fn fetch_artifact(&self, id: &ResourceId) -> Result<Vec<u8>, RegistryError> {
        let mut state = self.state.lock();
        Self::ensure_online(&state)?;
        state.artifact_fetches += 1;

        state
            .published
            .get(id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    fn publish(&self, manifest: &Manifest, bytes: &[u8]) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        Self::ensure_online(&state)?;

        if state.published.contains_key(&manifest.id) {
            return Err(RegistryError::VersionConflict(manifest.id.to_string()));
        }

        state
            .published
            .insert(manifest.id.clone(), (manifest.clone(), bytes.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semver::Version;

    fn manifest(kind: ResourceKind, name: &str, version: &str) -> Manifest {
        Manifest::new(ResourceId::new(kind, name, Version::parse(version).unwrap()).unwrap())
    }

    #[test]
    fn test_publish_is_write_once() {
        let registry = MemoryRegistry::new();
        let m = manifest(ResourceKind::Data, "dataset.json", "1.0.0");

        registry.publish(&m, b"one").unwrap();
        assert!(matches!(
            registry.publish(&m, b"two"),
            Err(RegistryError::VersionConflict(_))
        ));
        assert_eq!(registry.fetch_artifact(&m.id).unwrap(), b"one");
    }

    #[test]
    fn test_versions_sorted() {
        let registry = MemoryRegistry::new();
        for v in ["1.10.0", "1.2.0", "1.9.3"] {
            registry
                .publish(&manifest(ResourceKind::Code, "train.py", v), b"")
                .unwrap();
        }

        let versions = registry.versions(ResourceKind::Code, "train.py").unwrap();
        assert_eq!(
            versions,
            vec![Version::new(1, 2, 0), Version::new(1, 9, 3), Version::new(1, 10, 0)]
        );
        assert!(matches!(
            registry.versions(ResourceKind::Data, "train.py"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_offline() {
        let registry = MemoryRegistry::new();
        registry.set_offline(true);
        assert!(matches!(
            registry.list_available(None),
            Err(RegistryError::Unavailable(_))
        ));
    }
}
