//! Descriptor of a custom resource type served through the generic adapters

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

use k8sform_core::{Attribute, ValidationFailure, Validator, attributes};

use crate::client::GroupVersionResource;

/// A custom resource definition as the adapters see it
///
/// Implementors only declare constants and the spec schema; [`crate::Resource`] and
/// [`crate::ManifestDataSource`] provide every operation on top.
pub trait CustomResourceType: Send + Sync + 'static {
    /// Typed `spec`, camelCase on the wire
    type Spec: Serialize
        + DeserializeOwned
        + Clone
        + Debug
        + Default
        + PartialEq
        + Send
        + Sync
        + 'static;

    const GROUP: &'static str;
    const VERSION: &'static str;
    const KIND: &'static str;
    /// Plural resource name
    const PLURAL: &'static str;

    /// Schema of the `spec` attribute
    fn spec_attribute() -> Attribute;

    /// Rules spanning several `spec` fields, checked after schema validation
    fn validate_spec(_spec: &Self::Spec) -> Vec<ValidationFailure> {
        Vec::new()
    }

    fn description() -> String {
        format!("{} ({})", Self::KIND, Self::api_version())
    }

    fn gvr() -> GroupVersionResource {
        GroupVersionResource::new(Self::GROUP, Self::VERSION, Self::PLURAL, Self::KIND)
    }

    fn api_version() -> String {
        format!("{}/{}", Self::GROUP, Self::VERSION)
    }

    /// `hive_openshift_io_dns_zone_v1`
    fn type_name_suffix() -> String {
        format!(
            "{}_{}_{}",
            Self::GROUP.replace(['.', '-'], "_"),
            snake_case(Self::KIND),
            Self::VERSION
        )
    }
}

/// Schema of the `metadata` attribute shared by every custom resource
pub fn metadata_attribute() -> Attribute {
    Attribute::required_object(attributes([
        (
            "name",
            Attribute::required_string()
                .with_description("Name of the object, unique within its namespace")
                .requires_replace()
                .with_validator(Validator::not_empty()),
        ),
        (
            "namespace",
            Attribute::required_string()
                .with_description("Namespace of the object")
                .requires_replace()
                .with_validator(Validator::not_empty()),
        ),
        (
            "labels",
            Attribute::optional_string_map()
                .with_description("Map of string keys and values used to organize and select objects"),
        ),
        (
            "annotations",
            Attribute::optional_string_map()
                .with_description("Unstructured key/value map stored with the object"),
        ),
    ]))
    .with_description("Standard object metadata")
}

/// `DNSZone` -> `dns_zone`, `MachinePool` -> `machine_pool`
pub fn snake_case(kind: &str) -> String {
    let chars: Vec<char> = kind.chars().collect();
    let mut out = String::with_capacity(kind.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev_lower || (chars[i - 1].is_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
