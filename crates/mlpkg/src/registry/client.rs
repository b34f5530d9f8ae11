//! Registry HTTP client
//!
//! Provides a blocking HTTP client for the registry server.
//!
//! Routes, relative to the base URL:
//! - `GET  resources[?kind=<kind>]`
//! - `GET  resources/<kind>/<name>/<version>/manifest`
//! - `GET  resources/<kind>/<name>/<version>/artifact`
//! - `POST resources/<kind>/<name>/<version>` (multipart: `manifest`, `artifact`)

use super::api::{ErrorBody, ResourceEntry};
use super::{Registry, RegistryError};
use crate::id::ResourceId;
use crate::kind::ResourceKind;
use crate::manifest::Manifest;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default registry URL
pub const DEFAULT_REGISTRY: &str = "http://localhost:7000/api/v1";

/// Registry client speaking HTTP
pub struct HttpRegistry {
    /// HTTP client
    client: Client,

    /// Base URL for the registry
    base_url: Url,
}

impl HttpRegistry {
    /// Create a client for the default URL with default timeouts
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_url(DEFAULT_REGISTRY)
    }

    /// Create a client for a custom URL with default timeouts
    pub fn with_url(base_url: &str) -> Result<Self, RegistryError> {
        Self::with_timeouts(base_url, Duration::from_secs(30), Duration::from_secs(10))
    }

    /// Create a client with explicit request and connect timeouts
    pub fn with_timeouts(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let base_url =
            Url::parse(base_url).map_err(|e| RegistryError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RegistryError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(format!("mlpkg/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Registry base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `<base>/<segments...>` with each segment escaped
    fn url(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RegistryError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn resource_url(&self, id: &ResourceId, tail: Option<&str>) -> Result<Url, RegistryError> {
        let version = id.version.to_string();
        let mut segments = vec!["resources", id.kind.as_str(), id.name.as_str(), version.as_str()];
        segments.extend(tail);
        self.url(&segments)
    }
}

/// Map a response status onto the error taxonomy
fn check_status(response: Response, subject: &str) -> Result<Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = response
        .json::<ErrorBody>()
        .map(|body| body.error)
        .unwrap_or_else(|_| status.to_string());

    match status {
        StatusCode::NOT_FOUND => Err(RegistryError::NotFound(subject.to_string())),
        StatusCode::CONFLICT => Err(RegistryError::VersionConflict(subject.to_string())),
        _ => Err(RegistryError::Unavailable(format!(
            "Registry returned status {} for {}: {}",
            status, subject, reason
        ))),
    }
}

impl Registry for HttpRegistry {
    fn list_available(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceId>, RegistryError> {
        let mut url = self.url(&["resources"])?;
        if let Some(kind) = kind {
            url.query_pairs_mut().append_pair("kind", kind.as_str());
        }
        debug!(%url, "listing available resources");

        let response = check_status(self.client.get(url).send()?, "resource list")?;
        let entries: Vec<ResourceEntry> = response.json()?;

        let ids = entries
            .into_iter()
            .filter_map(|entry| {
                let shown = format!("{} {}@{}", entry.kind, entry.name, entry.version);
                match entry.into_id() {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!(entry = %shown, error = %e, "skipping invalid registry entry");
                        None
                    }
                }
            })
            .filter(|id| kind.map_or(true, |k| id.kind == k))
            .collect();

        Ok(ids)
    }

    fn fetch_manifest(&self, id: &ResourceId) -> Result<Manifest, RegistryError> {
        let url = self.resource_url(id, Some("manifest"))?;
        debug!(%url, "fetching manifest");

        let response = check_status(self.client.get(url).send()?, &id.to_string())?;
        let manifest: Manifest = response.json()?;

        if manifest.id != *id {
            return Err(RegistryError::Unavailable(format!(
                "Registry answered with manifest of {} when asked for {}",
                manifest.id, id
            )));
        }

        Ok(manifest)
    }

    fn fetch_artifact(&self, id: &ResourceId) -> Result<Vec<u8>, RegistryError> {
        let url = self.resource_url(id, Some("artifact"))?;
        debug!(%url, "fetching artifact");

        let response = check_status(self.client.get(url).send()?, &id.to_string())?;
        Ok(response.bytes()?.to_vec())
    }

    fn publish(&self, manifest: &Manifest, bytes: &[u8]) -> Result<(), RegistryError> {
        let url = self.resource_url(&manifest.id, None)?;
        debug!(%url, size = bytes.len(), "publishing");

        let manifest_json = serde_json::to_string(manifest)
            .map_err(|e| RegistryError::Unavailable(format!("Failed to encode manifest: {}", e)))?;

        let form = Form::new()
            .part("manifest", Part::text(manifest_json).mime_str("application/json")?)
            .part(
                "artifact",
                Part::bytes(bytes.to_vec())
                    .file_name(manifest.id.name.clone())
                    .mime_str("application/octet-stream")?,
            );

        check_status(self.client.post(url).multipart(form).send()?, &manifest.id.to_string())?;
        Ok(())
    }
}
