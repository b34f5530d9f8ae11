//! Local resource store
//!
//! Keeps installed artifacts in the workspace, one directory per kind, and a
//! sidecar record per installed resource.

mod record;

pub use record::{InstalledRecord, RecordError};

use crate::id::{validate_name, IdError, ResourceId};
use crate::kind::ResourceKind;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the bookkeeping directory inside the workspace
pub const STATE_DIR: &str = ".mlpkg";

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error (file operations)
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Workspace layout is missing
    #[error("{0} is not an initialized workspace (run `mlpkg init`)")]
    NotInitialized(PathBuf),

    /// No installed record for the name
    #[error("{kind} resource {name} is not installed")]
    NotInstalled { kind: ResourceKind, name: String },

    /// Workspace file to read is absent
    #[error("File not found: {0}")]
    MissingFile(PathBuf),

    /// A file with no record sits where an artifact would be installed
    #[error("{0} exists but is not an installed resource; move it away first")]
    Untracked(PathBuf),

    /// Installed bytes no longer match their record
    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// Sidecar record could not be read or written
    #[error("Record error for {path}: {source}")]
    RecordError {
        path: PathBuf,
        #[source]
        source: RecordError,
    },

    /// Resource name unusable as a file name
    #[error(transparent)]
    InvalidName(#[from] IdError),
}

/// On-disk store of installed resources
///
/// Directory structure:
/// ```text
/// <root>/
/// ├── code/<name>
/// ├── data/<name>
/// ├── model/<name>
/// └── .mlpkg/
///     ├── records/<kind>/<name>.json
///     └── tmp/
/// ```
///
/// There is no locking: two processes changing the same store at once is
/// not supported.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create the workspace layout under `root` and open it
    ///
    /// Idempotent.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { root: root.into() };

        for kind in ResourceKind::ALL {
            fs::create_dir_all(store.kind_dir(kind))?;
            fs::create_dir_all(store.records_dir(kind))?;
        }
        fs::create_dir_all(store.tmp_dir())?;

        debug!(root = %store.root.display(), "initialized workspace");
        Ok(store)
    }

    /// Open an existing workspace
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { root: root.into() };
        if !store.root.join(STATE_DIR).is_dir() {
            return Err(StoreError::NotInitialized(store.root));
        }
        Ok(store)
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding artifacts of one kind
    pub fn kind_dir(&self, kind: ResourceKind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    /// Path of the artifact file for a name
    pub fn artifact_path(&self, kind: ResourceKind, name: &str) -> PathBuf {
        self.kind_dir(kind).join(name)
    }

    fn records_dir(&self, kind: ResourceKind) -> PathBuf {
        self.root.join(STATE_DIR).join("records").join(kind.as_str())
    }

    fn record_path(&self, kind: ResourceKind, name: &str) -> PathBuf {
        self.records_dir(kind).join(format!("{}.json", name))
    }

    fn tmp_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR).join("tmp")
    }

    /// Install artifact bytes with their resolved dependencies
    ///
    /// Replaces whatever version of the same (kind, name) was installed.
    /// Installing the exact id that is already present does nothing. A
    /// workspace file at the target path without a record is left alone
    /// and fails the install with [`StoreError::Untracked`].
    ///
    /// Bytes and record are staged first and moved into place artifact
    /// first, record last; a failure before the record lands restores the
    /// previous artifact, so a half-written install is never recorded.
    pub fn install(
        &self,
        id: &ResourceId,
        bytes: &[u8],
        dependencies: &[ResourceId],
    ) -> Result<(), StoreError> {
        validate_name(&id.name)?;

        let artifact_path = self.artifact_path(id.kind, &id.name);
        match self.record(id.kind, &id.name)? {
            Some(existing) if existing.id == *id => {
                debug!(resource = %id, "already installed");
                return Ok(());
            }
            Some(existing) => {
                debug!(resource = %id, previous = %existing.id.version, "superseding installed version");
            }
            // an unrecorded file is a working copy, never overwrite it
            None if artifact_path.exists() => return Err(StoreError::Untracked(artifact_path)),
            None => {}
        }

        let tmp_dir = self.tmp_dir();
        fs::create_dir_all(&tmp_dir)?;
        fs::create_dir_all(self.kind_dir(id.kind))?;
        fs::create_dir_all(self.records_dir(id.kind))?;

        let stem = format!("{}-{}-{}", id.kind, id.name, std::process::id());
        let staged = Staged {
            artifact: tmp_dir.join(format!("{}.artifact", stem)),
            record: tmp_dir.join(format!("{}.record", stem)),
            backup: tmp_dir.join(format!("{}.backup", stem)),
        };

        let checksum = hex::encode(Sha256::digest(bytes));
        let record = InstalledRecord::new(id.clone(), dependencies.to_vec(), checksum);

        let written = write_synced(&staged.artifact, bytes).and_then(|()| {
            record
                .save(&staged.record)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
        });
        if let Err(e) = written {
            staged.discard();
            return Err(e.into());
        }

        if let Err(e) = staged.commit(&artifact_path, &self.record_path(id.kind, &id.name)) {
            warn!(resource = %id, error = %e, "install failed, rolled back");
            return Err(e.into());
        }

        debug!(resource = %id, path = %artifact_path.display(), "installed");
        Ok(())
    }

    /// Remove the installed version of a name, whatever version it is
    ///
    /// The artifact goes first, so a failure keeps the record.
    pub fn uninstall(&self, kind: ResourceKind, name: &str) -> Result<ResourceId, StoreError> {
        let record = self
            .record(kind, name)?
            .ok_or_else(|| StoreError::NotInstalled {
                kind,
                name: name.to_string(),
            })?;

        match fs::remove_file(self.artifact_path(kind, name)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(resource = %record.id, "artifact already missing");
            }
            Err(e) => return Err(e.into()),
        }

        fs::remove_file(self.record_path(kind, name))?;

        debug!(resource = %record.id, "uninstalled");
        Ok(record.id)
    }

    /// Installed record for a name, if any
    pub fn record(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<InstalledRecord>, StoreError> {
        validate_name(name)?;

        let path = self.record_path(kind, name);
        if !path.exists() {
            return Ok(None);
        }

        InstalledRecord::load(&path)
            .map(Some)
            .map_err(|source| StoreError::RecordError { path, source })
    }

    /// Currently installed version of a name
    pub fn get(&self, kind: ResourceKind, name: &str) -> Result<Option<ResourceId>, StoreError> {
        Ok(self.record(kind, name)?.map(|r| r.id))
    }

    /// Whether this exact id is installed
    pub fn contains(&self, id: &ResourceId) -> Result<bool, StoreError> {
        Ok(self.get(id.kind, &id.name)?.as_ref() == Some(id))
    }

    /// All installed records, sorted by kind then name
    pub fn records(&self, kind: Option<ResourceKind>) -> Result<Vec<InstalledRecord>, StoreError> {
        let kinds: Vec<ResourceKind> = match kind {
            Some(k) => vec![k],
            None => ResourceKind::ALL.to_vec(),
        };

        let mut records = Vec::new();
        for kind in kinds {
            let dir = self.records_dir(kind);
            if !dir.is_dir() {
                continue;
            }

            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().map_or(true, |e| e != "json") {
                    continue;
                }

                let record = InstalledRecord::load(&path)
                    .map_err(|source| StoreError::RecordError { path, source })?;
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.id.key().cmp(&b.id.key()));
        Ok(records)
    }

    /// All installed ids, sorted by kind then name
    pub fn list(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceId>, StoreError> {
        Ok(self.records(kind)?.into_iter().map(|r| r.id).collect())
    }

    /// Read installed bytes, verifying them against the record
    pub fn read_artifact(&self, kind: ResourceKind, name: &str) -> Result<Vec<u8>, StoreError> {
        let record = self
            .record(kind, name)?
            .ok_or_else(|| StoreError::NotInstalled {
                kind,
                name: name.to_string(),
            })?;

        let bytes = fs::read(self.artifact_path(kind, name))?;
        let actual = hex::encode(Sha256::digest(&bytes));
        if actual != record.checksum {
            return Err(StoreError::ChecksumMismatch {
                name: name.to_string(),
                expected: record.checksum,
                actual,
            });
        }

        Ok(bytes)
    }

    /// Read a workspace file, installed or not
    pub fn read_workspace_file(&self, kind: ResourceKind, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_name(name)?;

        let path = self.artifact_path(kind, name);
        if !path.is_file() {
            return Err(StoreError::MissingFile(path));
        }
        Ok(fs::read(&path)?)
    }
}

/// Files of one install waiting in the tmp directory
struct Staged {
    artifact: PathBuf,
    record: PathBuf,
    backup: PathBuf,
}

impl Staged {
    /// Move the artifact, then the record, into place
    ///
    /// On failure nothing staged is left behind and a previous artifact at
    /// `artifact_path` is put back.
    fn commit(&self, artifact_path: &Path, record_path: &Path) -> io::Result<()> {
        let had_previous = artifact_path.exists();
        if had_previous {
            if let Err(e) = fs::rename(artifact_path, &self.backup) {
                self.discard();
                return Err(e);
            }
        }

        let moved = fs::rename(&self.artifact, artifact_path)
            .and_then(|()| fs::rename(&self.record, record_path));

        if let Err(e) = moved {
            self.discard();
            remove_if_exists(artifact_path);
            if had_previous {
                if let Err(restore) = fs::rename(&self.backup, artifact_path) {
                    warn!(
                        path = %artifact_path.display(),
                        error = %restore,
                        "failed to restore previous artifact"
                    );
                }
            }
            return Err(e);
        }

        if had_previous {
            remove_if_exists(&self.backup);
        }
        Ok(())
    }

    fn discard(&self) {
        remove_if_exists(&self.artifact);
        remove_if_exists(&self.record);
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn remove_if_exists(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to clean up");
        }
    }
}
