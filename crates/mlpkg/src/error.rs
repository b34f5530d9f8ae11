//! Error types for package manager operations

use crate::id::IdError;
use crate::kind::KindError;
use crate::manifest::ManifestError;
use crate::registry::RegistryError;
use crate::resolver::ResolverError;
use crate::semver::SemverError;
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Result type alias for package manager operations
pub type Result<T> = std::result::Result<T, PmError>;

/// Error raised by a [`PackageManager`](crate::PackageManager) operation
#[derive(Debug, Error)]
pub enum PmError {
    #[error(transparent)]
    Semver(#[from] SemverError),

    #[error(transparent)]
    Kind(#[from] KindError),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Writing command output failed
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Category of a failure, independent of which layer raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidVersion,
    EmptySet,
    NotInstalled,
    NotFound,
    VersionConflict,
    CyclicDependency,
    RegistryUnavailable,
    /// Malformed names, specifiers or kinds
    InvalidInput,
    /// Local filesystem trouble
    Io,
}

impl PmError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PmError::Semver(e) => semver_kind(e),
            PmError::Kind(_) => ErrorKind::InvalidInput,
            PmError::Id(e) => id_kind(e),
            PmError::Manifest(e) => match e {
                ManifestError::InvalidDependency { source, .. } => id_kind(source),
                ManifestError::SelfDependency(_) => ErrorKind::CyclicDependency,
                ManifestError::ParseError(_) => ErrorKind::InvalidInput,
            },
            PmError::Store(e) => store_kind(e),
            PmError::Registry(e) => registry_kind(e),
            PmError::Resolver(e) => match e {
                ResolverError::VersionConflict { .. } => ErrorKind::VersionConflict,
                ResolverError::CyclicDependency(_) => ErrorKind::CyclicDependency,
                ResolverError::Semver(e) => semver_kind(e),
                ResolverError::InvalidName(e) => id_kind(e),
                ResolverError::Registry(e) => registry_kind(e),
                ResolverError::Store(e) => store_kind(e),
            },
            PmError::Output(_) => ErrorKind::Io,
        }
    }
}

fn semver_kind(e: &SemverError) -> ErrorKind {
    match e {
        SemverError::InvalidVersion(_) => ErrorKind::InvalidVersion,
        SemverError::EmptySet => ErrorKind::EmptySet,
    }
}

fn id_kind(e: &IdError) -> ErrorKind {
    match e {
        IdError::Version(e) => semver_kind(e),
        IdError::InvalidName(_) | IdError::InvalidSpecifier(_) => ErrorKind::InvalidInput,
    }
}

fn store_kind(e: &StoreError) -> ErrorKind {
    match e {
        StoreError::NotInstalled { .. } => ErrorKind::NotInstalled,
        StoreError::MissingFile(_) => ErrorKind::NotFound,
        StoreError::InvalidName(e) => id_kind(e),
        StoreError::IoError(_)
        | StoreError::NotInitialized(_)
        | StoreError::Untracked(_)
        | StoreError::ChecksumMismatch { .. }
        | StoreError::RecordError { .. } => ErrorKind::Io,
    }
}

fn registry_kind(e: &RegistryError) -> ErrorKind {
    match e {
        RegistryError::NotFound(_) => ErrorKind::NotFound,
        RegistryError::VersionConflict(_) => ErrorKind::VersionConflict,
        RegistryError::InvalidUrl(_) => ErrorKind::InvalidInput,
        RegistryError::HttpError(_) | RegistryError::Unavailable(_) => {
            ErrorKind::RegistryUnavailable
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidVersion => "invalid version",
            ErrorKind::EmptySet => "empty set",
            ErrorKind::NotInstalled => "not installed",
            ErrorKind::NotFound => "not found",
            ErrorKind::VersionConflict => "version conflict",
            ErrorKind::CyclicDependency => "cyclic dependency",
            ErrorKind::RegistryUnavailable => "registry unavailable",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ResourceKind;

    #[test]
    fn test_kind_through_layers() {
        let err: PmError = ResolverError::Registry(RegistryError::Unavailable("down".into())).into();
        assert_eq!(err.kind(), ErrorKind::RegistryUnavailable);

        let err: PmError = ResolverError::Semver(SemverError::EmptySet).into();
        assert_eq!(err.kind(), ErrorKind::EmptySet);

        let err: PmError = StoreError::NotInstalled {
            kind: ResourceKind::Code,
            name: "a.py".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotInstalled);

        let err: PmError = IdError::Version(SemverError::InvalidVersion("x".into())).into();
        assert_eq!(err.kind(), ErrorKind::InvalidVersion);
    }

    #[test]
    fn test_message_is_one_line() {
        let err: PmError = ResolverError::CyclicDependency("a@1.0.0 -> b@1.0.0 -> a@1.0.0".into()).into();
        let message = err.to_string();
        assert!(!message.contains('\n'));
        assert!(message.contains("a@1.0.0 -> b@1.0.0"));
    }
}
