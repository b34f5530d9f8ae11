//! Resource identity
//!
//! A [`ResourceId`] names one immutable published artifact: its kind, its
//! file name and its exact version.

use crate::kind::ResourceKind;
use crate::semver::{SemverError, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when building identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Invalid resource name
    #[error("Invalid resource name: {0}")]
    InvalidName(String),

    /// Malformed `name@version` specifier
    #[error("Invalid resource specifier: {0}")]
    InvalidSpecifier(String),

    /// Version part did not parse
    #[error(transparent)]
    Version(#[from] SemverError),
}

/// Identity of a resource: (kind, name, version)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub name: String,
    pub version: Version,
}

impl ResourceId {
    /// Create an identifier, validating the name
    pub fn new(kind: ResourceKind, name: impl Into<String>, version: Version) -> Result<Self, IdError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            kind,
            name,
            version,
        })
    }

    /// Parse a `name@version` specifier for a known kind
    ///
    /// The last `@` separates the version, so names may contain `@`.
    pub fn parse_spec(kind: ResourceKind, spec: &str) -> Result<Self, IdError> {
        let spec = spec.trim();

        let (name, version) = spec
            .rsplit_once('@')
            .ok_or_else(|| IdError::InvalidSpecifier(format!("missing '@version' in '{}'", spec)))?;

        if name.is_empty() {
            return Err(IdError::InvalidSpecifier(format!(
                "empty resource name in '{}'",
                spec
            )));
        }

        if version.is_empty() {
            return Err(IdError::InvalidSpecifier(format!("empty version in '{}'", spec)));
        }

        Self::new(kind, name, Version::parse(version)?)
    }

    /// Key used to detect two versions of the same resource
    pub fn key(&self) -> (ResourceKind, &str) {
        (self.kind, self.name.as_str())
    }

    /// `name@version`, the form used in listings and on the command line
    pub fn spec(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Check that a resource name is usable as a single file name
pub fn validate_name(name: &str) -> Result<(), IdError> {
    if name.is_empty() {
        return Err(IdError::InvalidName("name cannot be empty".to_string()));
    }

    if name == "." || name == ".." || name.starts_with('.') {
        return Err(IdError::InvalidName(format!("'{}' may not start with '.'", name)));
    }

    if name.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(IdError::InvalidName(format!(
            "'{}' must be a plain file name",
            name
        )));
    }

    Ok(())
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}", self.kind, self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spec() {
        let id = ResourceId::parse_spec(ResourceKind::Data, "dataset.json@1.0.0").unwrap();
        assert_eq!(id.kind, ResourceKind::Data);
        assert_eq!(id.name, "dataset.json");
        assert_eq!(id.version, Version::new(1, 0, 0));
        assert_eq!(id.spec(), "dataset.json@1.0.0");
    }

    #[test]
    fn test_parse_spec_name_with_at() {
        let id = ResourceId::parse_spec(ResourceKind::Code, "user@host.py@2.1.0").unwrap();
        assert_eq!(id.name, "user@host.py");
        assert_eq!(id.version, Version::new(2, 1, 0));
    }

    #[test]
    fn test_parse_spec_errors() {
        assert!(matches!(
            ResourceId::parse_spec(ResourceKind::Code, "train.py"),
            Err(IdError::InvalidSpecifier(_))
        ));
        assert!(matches!(
            ResourceId::parse_spec(ResourceKind::Code, "@1.0.0"),
            Err(IdError::InvalidSpecifier(_))
        ));
        assert!(matches!(
            ResourceId::parse_spec(ResourceKind::Code, "train.py@"),
            Err(IdError::InvalidSpecifier(_))
        ));
        assert!(matches!(
            ResourceId::parse_spec(ResourceKind::Code, "train.py@1.x.0"),
            Err(IdError::Version(SemverError::InvalidVersion(_)))
        ));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("model1.pmml").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("dir/file.py").is_err());
        assert!(validate_name("dir\\file.py").is_err());
    }

    #[test]
    fn test_same_name_different_kind_is_distinct() {
        let v = Version::new(1, 0, 0);
        let a = ResourceId::new(ResourceKind::Code, "x.json", v).unwrap();
        let b = ResourceId::new(ResourceKind::Data, "x.json", v).unwrap();
        assert_ne!(a, b);
        assert_ne!(a.key(), b.key());
    }
}
