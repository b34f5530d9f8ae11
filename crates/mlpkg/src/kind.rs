//! Resource kinds
//!
//! Every resource is one of code, data or model. The kind partitions the
//! namespace: the same file name may exist once per kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while classifying resources
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KindError {
    /// Unknown kind name (`--kind foo`)
    #[error("Invalid resource type \"{0}\"")]
    UnknownKind(String),

    /// File extension maps to no kind
    #[error("Could not infer resource type from extension of {0}")]
    UnknownExtension(String),
}

/// Kind of a resource
///
/// Declaration order is the listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Code,
    Data,
    Model,
}

const CODE_EXTENSIONS: &[&str] = &[
    "py", "ipynb", "r", "jl", "scala", "java", "js", "ts", "sh", "rs", "c", "cpp", "go", "m",
    "sql",
];

const DATA_EXTENSIONS: &[&str] = &[
    "json", "csv", "tsv", "txt", "xml", "parquet", "xlsx", "xls", "npy", "npz", "arrow",
    "feather", "avro",
];

const MODEL_EXTENSIONS: &[&str] = &[
    "pmml", "onnx", "pkl", "pickle", "joblib", "pt", "pth", "h5", "hdf5", "pb", "tflite", "sav",
    "mlmodel",
];

impl ResourceKind {
    /// All kinds, in listing order
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Code, ResourceKind::Data, ResourceKind::Model];

    /// Lowercase name, also used as the directory name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Code => "code",
            ResourceKind::Data => "data",
            ResourceKind::Model => "model",
        }
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Code => CODE_EXTENSIONS,
            ResourceKind::Data => DATA_EXTENSIONS,
            ResourceKind::Model => MODEL_EXTENSIONS,
        }
    }
}

/// Classify a resource file name by its extension
///
/// Matching is case-insensitive. Names without an extension are rejected.
pub fn infer_kind(name: &str) -> Result<ResourceKind, KindError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| KindError::UnknownExtension(name.to_string()))?;

    ResourceKind::ALL
        .into_iter()
        .find(|kind| kind.extensions().contains(&ext.as_str()))
        .ok_or_else(|| KindError::UnknownExtension(name.to_string()))
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "code" => Ok(ResourceKind::Code),
            "data" => Ok(ResourceKind::Data),
            "model" => Ok(ResourceKind::Model),
            _ => Err(KindError::UnknownKind(s.to_string())),
        }
    }
}
