//! Types shared by several Hive resources

use serde::{Deserialize, Serialize};

use k8sform_core::{Attribute, Validator, attributes};

/// Reference to an object in the same namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectReference {
    #[serde(default)]
    pub name: String,
}

impl LocalObjectReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Schema of a `LocalObjectReference`
pub fn local_object_reference() -> Attribute {
    Attribute::optional_object(attributes([(
        "name",
        Attribute::required_string()
            .with_description("Name of the referent")
            .with_validator(Validator::not_empty()),
    )]))
}

/// Schema of a credentials secret reference, required within its parent
pub fn credentials_secret_ref() -> Attribute {
    local_object_reference()
        .required()
        .with_description("Secret holding the cloud credentials")
}
