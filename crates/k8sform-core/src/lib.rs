//! k8sform Core - Core types for exposing Kubernetes custom resources through a provider
//!
//! This crate provides the foundational types used throughout k8sform:
//! - `Schema`: Attribute declarations with validators, compiled to JSON Schema
//! - `Diagnostics`: Errors and warnings reported back to the host
//! - `ObjectMetadata` / `Manifest`: Building blocks of the typed models
//! - `ResourceId`: The `<namespace>/<name>` identity
//! - `protocol`: Typed requests, responses and the resource/data source traits

pub mod diagnostics;
pub mod error;
pub mod identity;
pub mod model;
pub mod path;
pub mod protocol;
pub mod schema;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::CoreError;
pub use identity::ResourceId;
pub use model::{Attr, Manifest, ObjectMetadata, ObservedObject};
pub use path::{AttributePath, PathStep};
pub use protocol::{DataSourceService, ProviderHandle, ResourceService, StateResponse};
pub use schema::{
    Attribute, AttributeType, Attributes, ReplaceTrigger, Schema, SchemaValidator,
    ValidationFailure, ValidationResult, Validator, attributes,
};
