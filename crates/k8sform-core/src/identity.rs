//! Resource identity: `<namespace>/<name>`

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::model::ObjectMetadata;

/// Identity of a namespaced object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_metadata(metadata: &ObjectMetadata) -> Self {
        Self::new(metadata.namespace.clone(), metadata.name.clone())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ResourceId {
    type Err = CoreError;

    /// Parse `<namespace>/<name>`: exactly one `/`, both parts non-empty
    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = id.split('/').collect();
        match parts.as_slice() {
            [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(*namespace, *name))
            }
            _ => Err(CoreError::InvalidImportId { id: id.to_string() }),
        }
    }
}
