//! Dynamic client abstraction
//!
//! Resources talk to the API server through [`DynamicClient`], which works on arbitrary
//! resource types identified by their group/version/resource triple. The `kube`-backed
//! implementation lives in [`crate::kube_client`]; tests use [`crate::mock`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Group/version/resource triple plus the kind served under it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    /// Plural resource name (`dnszones`)
    pub resource: String,
    pub kind: String,
}

impl GroupVersionResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
            kind: kind.into(),
        }
    }

    /// `hive.openshift.io/v1`, or just `v1` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}/{}", self.resource, self.group, self.version)
    }
}

/// Server-side apply options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyParams {
    pub field_manager: String,
    /// Take ownership of fields managed by someone else
    pub force: bool,
}

/// Propagation policy for dependents on DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPropagation {
    Background,
    Foreground,
    Orphan,
}

impl DeletionPropagation {
    pub const VALUES: [&'static str; 3] = ["Background", "Foreground", "Orphan"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "Background",
            Self::Foreground => "Foreground",
            Self::Orphan => "Orphan",
        }
    }
}

impl fmt::Display for DeletionPropagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a dynamic client
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The API server answered with an error status
    #[error("{message} ({reason}, HTTP {code})")]
    Status {
        code: u16,
        reason: String,
        message: String,
    },

    /// The request never got an answer
    #[error("transport error: {0}")]
    Transport(String),

    /// The answer could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn not_found(name: &str) -> Self {
        Self::Status {
            code: 404,
            reason: "NotFound".to_string(),
            message: format!("\"{}\" not found", name),
        }
    }

    /// Check if this is a 404 Not Found
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { code: 404, .. })
    }

    /// Check if this is a 409 Conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Status { code: 409, .. })
    }
}

/// Namespaced PATCH/GET/DELETE on arbitrary resource types
#[async_trait]
pub trait DynamicClient: Send + Sync {
    /// Server-side apply `object` and return the object stored by the server
    async fn apply(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
        name: &str,
        object: &JsonValue,
        params: &ApplyParams,
    ) -> Result<JsonValue, ClientError>;

    /// Fetch an object by name
    async fn get(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
        name: &str,
    ) -> Result<JsonValue, ClientError>;

    /// Delete an object by name
    async fn delete(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
        name: &str,
        propagation: Option<DeletionPropagation>,
    ) -> Result<(), ClientError>;
}
