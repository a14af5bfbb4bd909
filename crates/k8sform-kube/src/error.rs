//! Error types for k8sform-kube

use k8sform_core::{AttributePath, CoreError, Diagnostic, Diagnostics, ValidationFailure};
use miette::Diagnostic as MietteDiagnostic;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::client::ClientError;

/// Result type for k8sform-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// API verb of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Patch,
    Get,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Patch => "PATCH",
            Self::Get => "GET",
            Self::Delete => "DELETE",
        })
    }
}

/// Errors that can occur while serving a resource or data source
#[derive(Debug, Error, MietteDiagnostic)]
#[non_exhaustive]
pub enum KubeError {
    /// Network operations are disabled for this provider
    #[error("cannot manage {type_name}: the provider is configured offline")]
    #[diagnostic(
        code(k8sform::kube::offline),
        help("unset `offline` in the provider configuration (or K8SFORM_OFFLINE)")
    )]
    Offline { type_name: String },

    /// A CRUD call arrived before the provider was configured
    #[error("the provider has not been configured with a Kubernetes client")]
    #[diagnostic(code(k8sform::kube::not_configured))]
    NotConfigured,

    /// Configure received data of the wrong type
    #[error("expected provider data of type ProviderData, got an unexpected type")]
    #[diagnostic(code(k8sform::kube::provider_data))]
    UnexpectedProviderData,

    /// Configuration failed schema validation
    #[error("configuration is invalid ({} error(s))", .failures.len())]
    #[diagnostic(code(k8sform::kube::validation))]
    Validation { failures: Vec<ValidationFailure> },

    /// Model could not be serialized
    #[error("failed to marshal {kind}: {message}")]
    #[diagnostic(code(k8sform::kube::marshal))]
    Marshal { kind: String, message: String },

    /// Server response could not be parsed into the model
    #[error("failed to unmarshal {kind}: {message}")]
    #[diagnostic(code(k8sform::kube::unmarshal))]
    Unmarshal { kind: String, message: String },

    /// YAML rendering failed
    #[error("failed to render YAML: {0}")]
    #[diagnostic(code(k8sform::kube::yaml))]
    Yaml(#[from] serde_yaml::Error),

    /// API or transport failure
    #[error("{verb} {kind} {namespace}/{name} failed: {source}")]
    #[diagnostic(code(k8sform::kube::request))]
    Request {
        verb: Verb,
        kind: String,
        namespace: String,
        name: String,
        #[source]
        source: ClientError,
    },

    /// A wait condition was not met in time
    #[error("timed out after {} waiting for {jsonpath}", format_timeout(.timeout))]
    #[diagnostic(code(k8sform::kube::wait_timeout))]
    WaitTimeout { jsonpath: String, timeout: Duration },

    /// A wait condition names an unparsable JSONPath
    #[error("invalid JSONPath '{expression}': {message}")]
    #[diagnostic(code(k8sform::kube::jsonpath))]
    InvalidJsonPath { expression: String, message: String },

    /// Invalid provider configuration
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(k8sform::kube::config))]
    InvalidConfig(String),

    /// Kubernetes client could not be built
    #[error("failed to build Kubernetes client: {0}")]
    #[diagnostic(code(k8sform::kube::client))]
    Client(String),

    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(k8sform::kube::io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(k8sform::kube::core))]
    Core(#[from] CoreError),
}

impl KubeError {
    pub fn request(
        verb: Verb,
        kind: &str,
        namespace: &str,
        name: &str,
        source: ClientError,
    ) -> Self {
        Self::Request {
            verb,
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Request { source, .. } if source.is_not_found())
    }

    /// One-line summary used as the diagnostic title
    pub fn summary(&self) -> String {
        match self {
            Self::Offline { .. } | Self::NotConfigured | Self::UnexpectedProviderData => {
                "Provider Configuration Error".to_string()
            }
            Self::Validation { .. } => "Invalid Attribute Value".to_string(),
            Self::Marshal { .. } | Self::Yaml(_) => "Marshal Error".to_string(),
            Self::Unmarshal { .. } => "Unmarshal Error".to_string(),
            Self::Request { verb, .. } => format!("Unable to {} resource", verb),
            Self::WaitTimeout { .. } => "Wait Condition Not Met".to_string(),
            Self::InvalidJsonPath { .. } => "Invalid Wait Condition".to_string(),
            Self::Core(CoreError::InvalidImportId { .. }) => "Unexpected Import Identifier".to_string(),
            _ => "Internal Error".to_string(),
        }
    }

    /// Convert into protocol diagnostics
    ///
    /// Validation errors expand to one diagnostic per failing attribute.
    pub fn into_diagnostics(self) -> Diagnostics {
        match self {
            Self::Validation { failures } => failures
                .into_iter()
                .map(|f| {
                    let detail = if f.constraint == "required" {
                        format!("The attribute {} is required", f.path)
                    } else {
                        format!("Attribute {} {}: {}", f.path, f.constraint, f.message)
                    };
                    Diagnostic::error("Invalid Attribute Value", detail).at(f.path)
                })
                .collect(),
            Self::InvalidJsonPath { .. } => {
                let summary = self.summary();
                Diagnostic::error(summary, self.to_string())
                    .at(AttributePath::attribute("wait_for"))
                    .into()
            }
            other => Diagnostic::error(other.summary(), other.to_string()).into(),
        }
    }
}

fn format_timeout(timeout: &Duration) -> String {
    humantime_serde::re::humantime::format_duration(*timeout).to_string()
}

impl From<KubeError> for Diagnostics {
    fn from(err: KubeError) -> Self {
        err.into_diagnostics()
    }
}
