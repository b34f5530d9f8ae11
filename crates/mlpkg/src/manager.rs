//! Package manager operations
//!
//! [`PackageManager`] is the single entry point used by the command line.
//! Each operation comes in two forms: a plain method returning data and a
//! `*_package` / `*_resource(s)` / `list_*` method that prints results to
//! the configured output and reports failures as a single log line.

use crate::error::{ErrorKind, PmError, Result};
use crate::id::ResourceId;
use crate::kind::ResourceKind;
use crate::manifest::Manifest;
use crate::registry::Registry;
use crate::resolver::DependencyResolver;
use crate::semver::Version;
use crate::store::LocalStore;
use std::io::{self, Write};
use tracing::{error, info};

/// Result of a reported operation: the failure was already logged
pub type Outcome = std::result::Result<(), ErrorKind>;

/// Orchestrates the local store and the registry
pub struct PackageManager<R, W = io::Stdout> {
    store: LocalStore,
    registry: R,
    out: W,
}

impl<R: Registry> PackageManager<R, io::Stdout> {
    /// Create a manager printing to standard output
    pub fn new(store: LocalStore, registry: R) -> Self {
        Self::with_output(store, registry, io::stdout())
    }
}

impl<R: Registry, W: Write> PackageManager<R, W> {
    /// Create a manager printing to `out`
    pub fn with_output(store: LocalStore, registry: R, out: W) -> Self {
        Self {
            store,
            registry,
            out,
        }
    }

    /// Local store this manager installs into
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Registry this manager resolves against
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Consume the manager, returning its output sink
    pub fn into_output(self) -> W {
        self.out
    }

    fn resolver(&self) -> DependencyResolver<'_, R> {
        DependencyResolver::new(&self.registry, &self.store)
    }

    /// Install a resource and its closure
    ///
    /// Without a version the latest published version is installed. Returns
    /// the ids newly installed, dependencies first.
    pub fn add(
        &self,
        kind: ResourceKind,
        name: &str,
        version: Option<&str>,
    ) -> Result<Vec<ResourceId>> {
        let resolver = self.resolver();
        let root = resolver.resolve_id(kind, name, version)?;
        let installed = resolver.install(&root)?;

        if installed.is_empty() {
            info!(resource = %root, "already installed");
        } else {
            for id in &installed {
                info!(resource = %id, "installed");
            }
        }

        Ok(installed)
    }

    /// Remove the installed version of a name
    ///
    /// Local only; dependents and dependencies are left alone.
    pub fn remove(&self, kind: ResourceKind, name: &str) -> Result<ResourceId> {
        let removed = self.store.uninstall(kind, name)?;
        info!(resource = %removed, "removed");
        Ok(removed)
    }

    /// Installed resources, sorted by kind then name
    pub fn resources(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceId>> {
        Ok(self.store.list(kind)?)
    }

    /// Published resources, sorted by kind, name, then version
    pub fn available(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceId>> {
        let mut ids = self.registry.list_available(kind)?;
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Closure of a resource without the resource itself, in discovery order
    ///
    /// Without a version, the installed version is used when there is one
    /// and the latest published version otherwise.
    pub fn dependencies(
        &self,
        kind: ResourceKind,
        name: &str,
        version: Option<&str>,
    ) -> Result<Vec<ResourceId>> {
        let resolver = self.resolver();

        let root = match version {
            Some(v) => ResourceId::new(kind, name, Version::parse(v)?)?,
            None => match self.store.get(kind, name)? {
                Some(installed) => installed,
                None => resolver.resolve_id(kind, name, None)?,
            },
        };

        let resolution = resolver.resolve(&root)?;
        Ok(resolution.dependencies().to_vec())
    }

    /// Publish the workspace copy of a resource
    ///
    /// Dependencies are `name@version` strings grouped by kind. Nothing is
    /// installed locally.
    pub fn publish<S: AsRef<str>>(
        &self,
        kind: ResourceKind,
        name: &str,
        version: &str,
        code_deps: &[S],
        data_deps: &[S],
        model_deps: &[S],
    ) -> Result<Manifest> {
        let id = ResourceId::new(kind, name, Version::parse(version)?)?;
        let manifest = Manifest::from_specs(id, code_deps, data_deps, model_deps)?;
        let bytes = self.store.read_workspace_file(kind, name)?;

        self.registry.publish(&manifest, &bytes)?;
        info!(
            resource = %manifest.id,
            dependencies = manifest.dependencies.len(),
            size = bytes.len(),
            "published"
        );

        Ok(manifest)
    }

    /// `add`, reporting failures
    pub fn add_package(&mut self, kind: ResourceKind, name: &str, version: Option<&str>) -> Outcome {
        let result = self.add(kind, name, version).map(drop);
        self.report("add", result)
    }

    /// `remove`, reporting failures
    pub fn remove_package(&mut self, kind: ResourceKind, name: &str) -> Outcome {
        let result = self.remove(kind, name).map(drop);
        self.report("remove", result)
    }

    /// Print installed resources as `<kind> <name>@<version>`
    pub fn list_resources(&mut self, kind: Option<ResourceKind>) -> Outcome {
        let result = self.resources(kind).and_then(|ids| self.print_with_kind(&ids));
        self.report("list", result)
    }

    /// Print published resources as `<kind> <name>@<version>`
    pub fn list_available_resources(&mut self, kind: Option<ResourceKind>) -> Outcome {
        let result = self.available(kind).and_then(|ids| self.print_with_kind(&ids));
        self.report("available", result)
    }

    /// Print the closure of a resource as `<name>@<version>` lines
    pub fn list_dependencies(
        &mut self,
        kind: ResourceKind,
        name: &str,
        version: Option<&str>,
    ) -> Outcome {
        let result = self.dependencies(kind, name, version).and_then(|ids| {
            for id in &ids {
                writeln!(self.out, "{}", id.spec())?;
            }
            self.out.flush()?;
            Ok(())
        });
        self.report("dependencies", result)
    }

    /// `publish`, reporting failures
    pub fn publish_resource<S: AsRef<str>>(
        &mut self,
        kind: ResourceKind,
        name: &str,
        version: &str,
        code_deps: &[S],
        data_deps: &[S],
        model_deps: &[S],
    ) -> Outcome {
        let result = self
            .publish(kind, name, version, code_deps, data_deps, model_deps)
            .map(drop);
        self.report("publish", result)
    }

    fn print_with_kind(&mut self, ids: &[ResourceId]) -> Result<()> {
        for id in ids {
            writeln!(self.out, "{} {}", id.kind, id.spec())?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn report(&self, operation: &str, result: Result<()>) -> Outcome {
        result.map_err(|e: PmError| {
            let kind = e.kind();
            error!(operation, %kind, "{}", e);
            kind
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use tempfile::TempDir;

    fn manager(temp: &TempDir) -> PackageManager<MemoryRegistry, Vec<u8>> {
        let store = LocalStore::init(temp.path()).unwrap();
        PackageManager::with_output(store, MemoryRegistry::new(), Vec::new())
    }

    #[test]
    fn test_list_empty_prints_nothing() {
        let temp = TempDir::new().unwrap();
        let mut pm = manager(&temp);

        assert_eq!(pm.list_resources(None), Ok(()));
        assert!(pm.into_output().is_empty());
    }

    #[test]
    fn test_remove_missing_reports_not_installed() {
        let temp = TempDir::new().unwrap();
        let mut pm = manager(&temp);

        assert_eq!(
            pm.remove_package(ResourceKind::Code, "train.py"),
            Err(ErrorKind::NotInstalled)
        );
    }

    #[test]
    fn test_publish_missing_file() {
        let temp = TempDir::new().unwrap();
        let mut pm = manager(&temp);
        let none: [&str; 0] = [];

        assert_eq!(
            pm.publish_resource(ResourceKind::Code, "train.py", "1.0.0", &none, &none, &none),
            Err(ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_add_invalid_version() {
        let temp = TempDir::new().unwrap();
        let mut pm = manager(&temp);

        assert_eq!(
            pm.add_package(ResourceKind::Data, "d.csv", Some("one")),
            Err(ErrorKind::InvalidVersion)
        );
    }
}
