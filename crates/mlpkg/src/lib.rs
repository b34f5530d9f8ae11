//! mlpkg Package Manager Library
//!
//! Manages versioned machine-learning resources of three kinds (code, data
//! and model), including:
//! - Version parsing and ordering
//! - Resource identity and manifests with typed dependencies
//! - A local store of installed resources
//! - Registry access (HTTP and in-memory)
//! - Dependency closure resolution with conflict and cycle detection
//! - The package manager operations built on top

pub mod config;
pub mod error;
pub mod id;
pub mod kind;
pub mod logging;
pub mod manager;
pub mod manifest;
pub mod registry;
pub mod resolver;
pub mod semver;
pub mod store;

pub use config::{Config, ConfigError, Overrides};
pub use error::{ErrorKind, PmError};
pub use id::{IdError, ResourceId};
pub use kind::{infer_kind, KindError, ResourceKind};
pub use manager::{Outcome, PackageManager};
pub use manifest::{DependencyEdge, Manifest, ManifestError};
pub use registry::{HttpRegistry, MemoryRegistry, Registry, RegistryError};
pub use resolver::{DependencyResolver, Resolution, ResolverError};
pub use semver::{SemverError, Version};
pub use store::{InstalledRecord, LocalStore, StoreError};
