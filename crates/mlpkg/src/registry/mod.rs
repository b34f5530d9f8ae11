//! Remote registry access
//!
//! The [`Registry`] trait is the boundary to wherever published resources
//! live. [`HttpRegistry`] talks to a registry server over HTTP;
//! [`MemoryRegistry`] keeps everything in process.

mod api;
mod client;
mod memory;

pub use api::{ErrorBody, ResourceEntry};
pub use client::{HttpRegistry, DEFAULT_REGISTRY};
pub use memory::MemoryRegistry;

use crate::id::ResourceId;
use crate::kind::ResourceKind;
use crate::manifest::Manifest;
use crate::semver::Version;
use thiserror::Error;

/// Errors that can occur during registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Resource or version absent
    #[error("Not found on registry: {0}")]
    NotFound(String),

    /// Publishing an id that already exists
    #[error("{0} is already published (versions are write-once)")]
    VersionConflict(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Registry unavailable or answered with something unusable
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

/// Access to published manifests and artifacts
///
/// Every call is blocking and is attempted exactly once.
pub trait Registry {
    /// Every published version of every resource, optionally of one kind
    fn list_available(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceId>, RegistryError>;

    /// Manifest of an exact id
    fn fetch_manifest(&self, id: &ResourceId) -> Result<Manifest, RegistryError>;

    /// Artifact bytes of an exact id
    fn fetch_artifact(&self, id: &ResourceId) -> Result<Vec<u8>, RegistryError>;

    /// Upload a new resource; fails if its id already exists
    fn publish(&self, manifest: &Manifest, bytes: &[u8]) -> Result<(), RegistryError>;

    /// Published versions of one name, ascending
    ///
    /// Fails with [`RegistryError::NotFound`] when nothing is published
    /// under the name.
    fn versions(&self, kind: ResourceKind, name: &str) -> Result<Vec<Version>, RegistryError> {
        let mut versions: Vec<Version> = self
            .list_available(Some(kind))?
            .into_iter()
            .filter(|id| id.kind == kind && id.name == name)
            .map(|id| id.version)
            .collect();

        if versions.is_empty() {
            return Err(RegistryError::NotFound(format!("{} {}", kind, name)));
        }

        versions.sort();
        versions.dedup();
        Ok(versions)
    }
}

impl<R: Registry + ?Sized> Registry for &R {
    fn list_available(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceId>, RegistryError> {
        (**self).list_available(kind)
    }

    fn fetch_manifest(&self, id: &ResourceId) -> Result<Manifest, RegistryError> {
        (**self).fetch_manifest(id)
    }

    fn fetch_artifact(&self, id: &ResourceId) -> Result<Vec<u8>, RegistryError> {
        (**self).fetch_artifact(id)
    }

    fn publish(&self, manifest: &Manifest, bytes: &[u8]) -> Result<(), RegistryError> {
        (**self).publish(manifest, bytes)
    }

    fn versions(&self, kind: ResourceKind, name: &str) -> Result<Vec<Version>, RegistryError> {
        (**self).versions(kind, name)
    }
}

impl<R: Registry + ?Sized> Registry for Box<R> {
    fn list_available(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceId>, RegistryError> {
        (**self).list_available(kind)
    }

    fn fetch_manifest(&self, id: &ResourceId) -> Result<Manifest, RegistryError> {
        (**self).fetch_manifest(id)
    }

    fn fetch_artifact(&self, id: &ResourceId) -> Result<Vec<u8>, RegistryError> {
        (**self).fetch_artifact(id)
    }

    fn publish(&self, manifest: &Manifest, bytes: &[u8]) -> Result<(), RegistryError> {
        (**self).publish(manifest, bytes)
    }

    fn versions(&self, kind: ResourceKind, name: &str) -> Result<Vec<Version>, RegistryError> {
        (**self).versions(kind, name)
    }
}
