//! Dependency resolution
//!
//! Computes the transitive closure of a resource by walking manifests
//! breadth-first, then checks it for cycles and derives a dependency-first
//! install order.
//!
//! Manifests pin exact versions, so there is nothing to choose: two versions
//! of the same (kind, name) anywhere in a closure is a conflict.

use crate::id::{IdError, ResourceId};
use crate::kind::ResourceKind;
use crate::registry::{Registry, RegistryError};
use crate::semver::{self, SemverError, Version};
use crate::store::{LocalStore, StoreError};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during dependency resolution
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Two versions of one resource in the same closure
    #[error("Conflicting versions of {kind} {name}: {first} and {second}")]
    VersionConflict {
        kind: ResourceKind,
        name: String,
        first: Version,
        second: Version,
    },

    /// Circular dependency detected
    #[error("Circular dependency detected: {0}")]
    CyclicDependency(String),

    /// Version could not be parsed or selected
    #[error(transparent)]
    Semver(#[from] SemverError),

    /// Invalid resource name
    #[error(transparent)]
    InvalidName(#[from] IdError),

    /// Registry failure
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Local store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A resolved dependency closure
///
/// Nodes are indexed in first-discovery order; the root is node 0.
#[derive(Debug, Clone)]
pub struct Resolution {
    nodes: Vec<ResourceId>,
    edges: Vec<Vec<usize>>,
    install_order: Vec<usize>,
}

impl Resolution {
    /// The resource the closure was computed for
    pub fn root(&self) -> &ResourceId {
        &self.nodes[0]
    }

    /// Every node, root first, in breadth-first discovery order
    pub fn nodes(&self) -> &[ResourceId] {
        &self.nodes
    }

    /// The closure without its root, in discovery order
    pub fn dependencies(&self) -> &[ResourceId] {
        &self.nodes[1..]
    }

    /// Direct dependencies of a node, in manifest order
    pub fn direct_dependencies(&self, id: &ResourceId) -> Vec<ResourceId> {
        self.nodes
            .iter()
            .position(|n| n == id)
            .map(|i| self.edges[i].iter().map(|&j| self.nodes[j].clone()).collect())
            .unwrap_or_default()
    }

    /// Nodes ordered so that every node follows its dependencies
    pub fn install_order(&self) -> impl Iterator<Item = &ResourceId> {
        self.install_order.iter().map(move |&i| &self.nodes[i])
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a closure contains at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// DFS marker for cycle detection
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Dependency resolver
///
/// Dependencies of an id that is already installed are read from its local
/// record; everything else comes from registry manifests. Fetches are
/// sequential, one per newly discovered node.
pub struct DependencyResolver<'a, R: Registry + ?Sized> {
    registry: &'a R,
    store: &'a LocalStore,
}

impl<'a, R: Registry + ?Sized> DependencyResolver<'a, R> {
    /// Create a new resolver
    pub fn new(registry: &'a R, store: &'a LocalStore) -> Self {
        Self { registry, store }
    }

    /// Turn a name and optional version into an exact id
    ///
    /// Without a version, the highest version published on the registry is
    /// selected.
    pub fn resolve_id(
        &self,
        kind: ResourceKind,
        name: &str,
        version: Option<&str>,
    ) -> Result<ResourceId, ResolverError> {
        let version = match version {
            Some(v) => Version::parse(v)?,
            None => {
                let available = self.registry.versions(kind, name)?;
                let latest = semver::latest(&available)?;
                debug!(%kind, name, %latest, "selected latest published version");
                latest
            }
        };

        Ok(ResourceId::new(kind, name, version)?)
    }

    /// Compute the closure of `root`
    ///
    /// Fails on version conflicts and cycles; nothing is installed.
    pub fn resolve(&self, root: &ResourceId) -> Result<Resolution, ResolverError> {
        let mut nodes = vec![root.clone()];
        let mut edges: Vec<Vec<usize>> = vec![Vec::new()];
        let mut index: HashMap<ResourceId, usize> = HashMap::from([(root.clone(), 0)]);
        let mut by_key: HashMap<(ResourceKind, String), usize> =
            HashMap::from([((root.kind, root.name.clone()), 0)]);
        let mut queue = VecDeque::from([0usize]);

        while let Some(current) = queue.pop_front() {
            let dependencies = self.dependencies_of(&nodes[current])?;

            for dep in dependencies {
                let next = match index.get(&dep) {
                    Some(&i) => i,
                    None => {
                        if let Some(&other) = by_key.get(&(dep.kind, dep.name.clone())) {
                            return Err(ResolverError::VersionConflict {
                                kind: dep.kind,
                                name: dep.name,
                                first: nodes[other].version,
                                second: dep.version,
                            });
                        }

                        let i = nodes.len();
                        debug!(resource = %dep, via = %nodes[current], "discovered dependency");
                        by_key.insert((dep.kind, dep.name.clone()), i);
                        index.insert(dep.clone(), i);
                        nodes.push(dep);
                        edges.push(Vec::new());
                        queue.push_back(i);
                        i
                    }
                };

                if !edges[current].contains(&next) {
                    edges[current].push(next);
                }
            }
        }

        let install_order = topological_order(&nodes, &edges)?;

        Ok(Resolution {
            nodes,
            edges,
            install_order,
        })
    }

    /// Resolve `root` and install every node not yet present, dependencies
    /// first
    ///
    /// Returns the ids installed by this call. A failure part way leaves the
    /// nodes installed before it in place.
    pub fn install(&self, root: &ResourceId) -> Result<Vec<ResourceId>, ResolverError> {
        let resolution = self.resolve(root)?;
        let mut installed = Vec::new();

        for id in resolution.install_order() {
            if self.store.contains(id)? {
                debug!(resource = %id, "already present");
                continue;
            }

            let bytes = self.registry.fetch_artifact(id)?;
            let dependencies = resolution.direct_dependencies(id);
            self.store.install(id, &bytes, &dependencies)?;
            installed.push(id.clone());
        }

        Ok(installed)
    }

    fn dependencies_of(&self, id: &ResourceId) -> Result<Vec<ResourceId>, ResolverError> {
        if let Some(record) = self.store.record(id.kind, &id.name)? {
            if record.id == *id {
                debug!(resource = %id, "using installed record");
                return Ok(record.dependencies);
            }
        }

        let manifest = self.registry.fetch_manifest(id)?;
        Ok(manifest.dependencies)
    }
}

/// Post-order DFS from the root; a node reached again while still on the
/// current path closes a cycle
fn topological_order(nodes: &[ResourceId], edges: &[Vec<usize>]) -> Result<Vec<usize>, ResolverError> {
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    // (node, index of the next edge to follow)
    let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
    marks[0] = Mark::OnPath;

    while let Some(top) = stack.len().checked_sub(1) {
        let (node, next_edge) = stack[top];

        let Some(&child) = edges[node].get(next_edge) else {
            marks[node] = Mark::Done;
            order.push(node);
            stack.pop();
            continue;
        };
        stack[top].1 += 1;

        match marks[child] {
            Mark::Unvisited => {
                marks[child] = Mark::OnPath;
                stack.push((child, 0));
            }
            Mark::OnPath => {
                let start = stack.iter().position(|&(n, _)| n == child).unwrap_or(0);
                let mut cycle: Vec<String> =
                    stack[start..].iter().map(|&(n, _)| nodes[n].spec()).collect();
                cycle.push(nodes[child].spec());
                return Err(ResolverError::CyclicDependency(cycle.join(" -> ")));
            }
            Mark::Done => {}
        }
    }

    Ok(order)
}
