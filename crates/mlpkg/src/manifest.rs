//! Resource manifests
//!
//! A manifest is the published identity of a resource plus its dependency
//! edges. Edge order is meaningful: it drives the resolver's traversal order.

use crate::id::{IdError, ResourceId};
use crate::kind::ResourceKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building or decoding manifests
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A dependency specifier did not parse
    #[error("Invalid {kind} dependency: {source}")]
    InvalidDependency {
        kind: ResourceKind,
        #[source]
        source: IdError,
    },

    /// A resource listed itself as a dependency
    #[error("{0} cannot depend on itself")]
    SelfDependency(String),

    /// Failed to parse JSON
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A directed dependency edge between two resources
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge<'a> {
    pub from: &'a ResourceId,
    pub to: &'a ResourceId,
}

/// Published metadata of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Identity of the resource this manifest describes
    pub id: ResourceId,

    /// Outgoing dependencies, in declaration order
    #[serde(default)]
    pub dependencies: Vec<ResourceId>,
}

impl Manifest {
    /// Manifest without dependencies
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            dependencies: Vec::new(),
        }
    }

    /// Build a manifest from `name@version` lists, one per dependency kind
    ///
    /// Dependencies keep the order code, data, model and, within a kind, the
    /// order given. Exact duplicates are dropped.
    pub fn from_specs<S: AsRef<str>>(
        id: ResourceId,
        code_deps: &[S],
        data_deps: &[S],
        model_deps: &[S],
    ) -> Result<Self, ManifestError> {
        let mut manifest = Self::new(id);

        let groups = [
            (ResourceKind::Code, code_deps),
            (ResourceKind::Data, data_deps),
            (ResourceKind::Model, model_deps),
        ];

        for (kind, specs) in groups {
            for spec in specs {
                let dep = ResourceId::parse_spec(kind, spec.as_ref())
                    .map_err(|source| ManifestError::InvalidDependency { kind, source })?;
                manifest.add_dependency(dep)?;
            }
        }

        Ok(manifest)
    }

    /// Append a dependency, ignoring exact duplicates
    pub fn add_dependency(&mut self, dep: ResourceId) -> Result<(), ManifestError> {
        if dep == self.id {
            return Err(ManifestError::SelfDependency(self.id.spec()));
        }
        if !self.dependencies.contains(&dep) {
            self.dependencies.push(dep);
        }
        Ok(())
    }

    /// Builder form of [`Manifest::add_dependency`]
    pub fn with_dependency(mut self, dep: ResourceId) -> Result<Self, ManifestError> {
        self.add_dependency(dep)?;
        Ok(self)
    }

    /// Dependencies of one kind, in declaration order
    pub fn dependencies_of(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceId> {
        self.dependencies.iter().filter(move |d| d.kind == kind)
    }

    /// Outgoing edges of this manifest
    pub fn edges(&self) -> impl Iterator<Item = DependencyEdge<'_>> {
        self.dependencies.iter().map(move |to| DependencyEdge { from: &self.id, to })
    }

    /// Parse a manifest from JSON
    pub fn from_json(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(content)?;
        if manifest.dependencies.contains(&manifest.id) {
            return Err(ManifestError::SelfDependency(manifest.id.spec()));
        }
        Ok(manifest)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
