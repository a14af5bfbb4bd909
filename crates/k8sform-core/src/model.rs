//! Building blocks of the typed models handed over by the host

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Value of an attribute as planned by the host
///
/// Distinguishes an attribute the user did not set (`Null`) from one whose value is not known
/// until apply (`Unknown`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Attr<T> {
    #[default]
    Null,
    Unknown,
    Known(T),
}

impl<T> Attr<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// The known value, or `default` when null or unknown
    pub fn known_or(&self, default: T) -> T
    where
        T: Clone,
    {
        self.known().cloned().unwrap_or(default)
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Known(v),
            None => Self::Null,
        }
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => v.serialize(serializer),
            Self::Null | Self::Unknown => serializer.serialize_none(),
        }
    }
}

/// Object metadata managed through the provider
///
/// Only the fields users configure are modelled; server-populated metadata such as `uid` or
/// `managedFields` is dropped when a response is parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl ObjectMetadata {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Full object as sent to the API server or rendered as YAML
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest<'a, S> {
    pub api_version: &'a str,
    pub kind: &'a str,
    pub metadata: &'a ObjectMetadata,
    pub spec: &'a S,
}

/// Object as returned by the API server
#[derive(Debug, Deserialize)]
#[serde(bound = "S: DeserializeOwned + Default")]
pub struct ObservedObject<S> {
    #[serde(default)]
    pub metadata: ObjectMetadata,
    #[serde(default)]
    pub spec: S,
}
