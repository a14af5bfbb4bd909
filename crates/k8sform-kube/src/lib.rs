//! k8sform Kube - Kubernetes custom resources as provider resources and data sources
//!
//! This crate provides:
//! - `DynamicClient`: PATCH (server-side apply), GET and DELETE on arbitrary resource types,
//!   backed by `kube` or by an in-memory mock
//! - `ProviderConfig` / `ProviderData`: provider-wide settings injected into resources
//! - `Resource<C>`: the full managed-resource lifecycle for any `CustomResourceType`
//! - `ManifestDataSource<C>`: YAML rendering without a cluster
//! - Wait conditions evaluated with a small JSONPath subset

pub mod client;
pub mod crd;
pub mod error;
pub mod jsonpath;
pub mod kube_client;
pub mod logging;
pub mod manifest;
pub mod mock;
pub mod provider;
pub mod resource;
pub mod wait;

/// Provider type name, the prefix of every resource and data source type name
pub const PROVIDER_TYPE_NAME: &str = "k8s";

pub use client::{
    ApplyParams, ClientError, DeletionPropagation, DynamicClient, GroupVersionResource,
};
pub use crd::{CustomResourceType, metadata_attribute};
pub use error::{KubeError, Result, Verb};
pub use jsonpath::JsonPath;
pub use kube_client::KubeDynamicClient;
pub use logging::init_logging;
pub use manifest::{ManifestDataSource, ManifestModel, manifest_schema, render_yaml};
pub use mock::{MockDynamicClient, MockVerb, OperationCounts};
pub use provider::{DEFAULT_FIELD_MANAGER, ProviderConfig, ProviderData};
pub use resource::{Resource, ResourceModel, resource_schema};
pub use wait::{DEFAULT_WAIT_TIMEOUT, WaitCondition};
