//! Registry API types
//!
//! Bodies exchanged with the registry server. Manifests travel as
//! [`Manifest`](crate::manifest::Manifest) JSON directly.

use crate::id::{IdError, ResourceId};
use crate::kind::ResourceKind;
use crate::semver::Version;
use serde::{Deserialize, Serialize};

/// One published resource version
///
/// Response element of GET /resources. The version is kept as the exact
/// string the registry sent until it is parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Resource kind
    pub kind: ResourceKind,

    /// Resource name
    pub name: String,

    /// Version string
    pub version: String,
}

impl ResourceEntry {
    /// Convert to a validated identifier
    pub fn into_id(self) -> Result<ResourceId, IdError> {
        let version = Version::parse(&self.version)?;
        ResourceId::new(self.kind, self.name, version)
    }
}

impl From<&ResourceId> for ResourceEntry {
    fn from(id: &ResourceId) -> Self {
        Self {
            kind: id.kind,
            name: id.name.clone(),
            version: id.version.to_string(),
        }
    }
}

/// Error body returned by the registry on failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable reason
    pub error: String,
}
