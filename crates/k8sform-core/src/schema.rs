//! Schema declarations for resources and data sources
//!
//! A [`Schema`] describes every attribute a resource accepts: its name as the host sees it
//! (snake_case), its name on the wire (the CRD's camelCase JSON field), its type, its
//! required/optional/computed flags and its validators.
//!
//! Validation compiles the schema into a JSON Schema document and checks the configuration
//! document (wire names) with `jsonschema`. Failures are mapped back to attribute paths so
//! the host can point at the offending attribute.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::path::{AttributePath, PathStep};

/// Attributes in declaration order
pub type Attributes = IndexMap<String, Attribute>;

/// Regular expression accepted for base64-encoded strings (standard alphabet, padded)
pub const BASE64_PATTERN: &str =
    r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$";

/// Type of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Bool,
    Int64,
    Float64,
    /// String-keyed map of the inner type
    Map(Box<AttributeType>),
    /// Ordered list of the inner type
    List(Box<AttributeType>),
    /// Nested object with its own attributes
    Object(Attributes),
}

impl AttributeType {
    fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "boolean",
            Self::Int64 => "integer",
            Self::Float64 => "number",
            Self::Map(_) | Self::Object(_) => "object",
            Self::List(_) => "array",
        }
    }
}

/// Declarative constraint checked before any API call
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// String length at least N (`LengthAtLeast(1)` is "not empty")
    LengthAtLeast(usize),
    /// String length at most N
    LengthAtMost(usize),
    /// Standard padded base64
    Base64,
    /// One of an enumerated set of strings
    OneOf(Vec<String>),
    /// Integer at least N
    AtLeast(i64),
    /// Integer at most N
    AtMost(i64),
    /// Integer within [min, max]
    Between(i64, i64),
    /// String matching a regular expression
    Matches { pattern: String, message: String },
}

impl Validator {
    pub fn not_empty() -> Self {
        Self::LengthAtLeast(1)
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn matches(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Matches {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// JSON Schema keywords this validator compiles to
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::LengthAtLeast(_) => &["minLength"],
            Self::LengthAtMost(_) => &["maxLength"],
            Self::Base64 | Self::Matches { .. } => &["pattern"],
            Self::OneOf(_) => &["enum"],
            Self::AtLeast(_) => &["minimum"],
            Self::AtMost(_) => &["maximum"],
            Self::Between(_, _) => &["minimum", "maximum"],
        }
    }

    fn apply(&self, json: &mut serde_json::Map<String, JsonValue>) {
        match self {
            Self::LengthAtLeast(n) => {
                json.insert("minLength".into(), JsonValue::from(*n));
            }
            Self::LengthAtMost(n) => {
                json.insert("maxLength".into(), JsonValue::from(*n));
            }
            Self::Base64 => {
                json.insert("pattern".into(), JsonValue::String(BASE64_PATTERN.into()));
            }
            Self::OneOf(values) => {
                json.insert(
                    "enum".into(),
                    JsonValue::Array(values.iter().cloned().map(JsonValue::String).collect()),
                );
            }
            Self::AtLeast(min) => {
                json.insert("minimum".into(), JsonValue::from(*min));
            }
            Self::AtMost(max) => {
                json.insert("maximum".into(), JsonValue::from(*max));
            }
            Self::Between(min, max) => {
                json.insert("minimum".into(), JsonValue::from(*min));
                json.insert("maximum".into(), JsonValue::from(*max));
            }
            Self::Matches { pattern, .. } => {
                json.insert("pattern".into(), JsonValue::String(pattern.clone()));
            }
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthAtLeast(n) => write!(f, "string length must be at least {}", n),
            Self::LengthAtMost(n) => write!(f, "string length must be at most {}", n),
            Self::Base64 => f.write_str("value must be a base64 encoded string"),
            Self::OneOf(values) => write!(f, "value must be one of: {}", values.join(", ")),
            Self::AtLeast(min) => write!(f, "value must be at least {}", min),
            Self::AtMost(max) => write!(f, "value must be at most {}", max),
            Self::Between(min, max) => write!(f, "value must be between {} and {}", min, max),
            Self::Matches { message, .. } => f.write_str(message),
        }
    }
}

/// Declaration of a single attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub attr_type: AttributeType,
    pub description: String,
    /// JSON field name when it differs from the camelCase form of the attribute name
    pub wire_name: Option<String>,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value forces the resource to be replaced
    pub requires_replace: bool,
    pub validators: Vec<Validator>,
}

impl Attribute {
    pub fn new(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            description: String::new(),
            wire_name: None,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            requires_replace: false,
            validators: Vec::new(),
        }
    }

    pub fn required_string() -> Self {
        Self::new(AttributeType::String).required()
    }

    pub fn optional_string() -> Self {
        Self::new(AttributeType::String).optional()
    }

    pub fn computed_string() -> Self {
        Self::new(AttributeType::String).computed()
    }

    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool).optional()
    }

    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64).required()
    }

    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64).optional()
    }

    pub fn optional_string_map() -> Self {
        Self::new(AttributeType::Map(Box::new(AttributeType::String))).optional()
    }

    pub fn optional_string_list() -> Self {
        Self::new(AttributeType::List(Box::new(AttributeType::String))).optional()
    }

    pub fn required_object(attributes: Attributes) -> Self {
        Self::new(AttributeType::Object(attributes)).required()
    }

    pub fn optional_object(attributes: Attributes) -> Self {
        Self::new(AttributeType::Object(attributes)).optional()
    }

    pub fn optional_object_list(attributes: Attributes) -> Self {
        Self::new(AttributeType::List(Box::new(AttributeType::Object(attributes)))).optional()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    /// The provider or server may compute the value
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Override the JSON field name (`clusterID`, `roleARN`, ...)
    pub fn wire(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    /// JSON field name for an attribute declared as `name`
    pub fn wire_name_for(&self, name: &str) -> String {
        self.wire_name.clone().unwrap_or_else(|| camel_case(name))
    }

    /// Whether the attribute is part of the user configuration
    pub fn is_configurable(&self) -> bool {
        self.required || self.optional
    }
}

/// Build an attribute map from `(name, attribute)` pairs
pub fn attributes<const N: usize>(items: [(&str, Attribute); N]) -> Attributes {
    items
        .into_iter()
        .map(|(name, attr)| (name.to_string(), attr))
        .collect()
}

/// `cluster_deployment_ref` -> `clusterDeploymentRef`
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Attribute whose change forces replacement, with its location in the configuration document
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceTrigger {
    pub path: AttributePath,
    /// JSON pointer into the configuration document
    pub pointer: String,
}

/// Schema of a resource or data source
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub description: String,
    pub version: i64,
    pub attributes: Attributes,
}

impl Schema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            version: 0,
            attributes: Attributes::new(),
        }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Look up an attribute by dotted path (`spec.cluster_deployment_ref.name`)
    ///
    /// List and map steps are transparent: `spec.taints.effect` addresses the `effect`
    /// attribute of every taint.
    pub fn attribute(&self, dotted: &str) -> Option<&Attribute> {
        let mut scope = &self.attributes;
        let mut found: Option<&Attribute> = None;
        for segment in dotted.split('.') {
            let attr = scope.get(segment)?;
            found = Some(attr);
            if let Some(nested) = nested_attributes(&attr.attr_type) {
                scope = nested;
            }
        }
        found
    }

    /// Convert to a JSON Schema document over the configuration document
    pub fn to_json_schema(&self) -> JsonValue {
        let mut schema = serde_json::Map::new();
        schema.insert(
            "$schema".into(),
            JsonValue::String("http://json-schema.org/draft-07/schema#".into()),
        );
        if !self.description.is_empty() {
            schema.insert(
                "description".into(),
                JsonValue::String(self.description.clone()),
            );
        }
        object_schema(&self.attributes, &mut schema);
        JsonValue::Object(schema)
    }

    /// Attributes flagged requires-replace
    pub fn replace_triggers(&self) -> Vec<ReplaceTrigger> {
        let mut out = Vec::new();
        collect_replace_triggers(&self.attributes, &AttributePath::root(), "", &mut out);
        out
    }

    /// Check the declaration itself for inconsistencies
    pub fn check(&self) -> Result<()> {
        check_attributes(&self.attributes, &AttributePath::root())
    }

    /// Compile the schema for validation
    pub fn validator(&self) -> Result<SchemaValidator> {
        SchemaValidator::new(self.clone())
    }

    /// Map a JSON pointer into the configuration document to an attribute path
    pub fn resolve_pointer(&self, pointer: &str) -> AttributePath {
        let mut path = AttributePath::root();
        let mut scope = Scope::Attributes(&self.attributes);
        for raw in pointer.split('/').skip(1) {
            let segment = raw.replace("~1", "/").replace("~0", "~");
            scope = match scope {
                Scope::Attributes(attrs) => step_into(attrs, &segment, &mut path),
                Scope::Value(AttributeType::Object(attrs)) => step_into(attrs, &segment, &mut path),
                Scope::Value(AttributeType::List(inner)) => match segment.parse::<usize>() {
                    Ok(idx) => {
                        path = path.with_index(idx);
                        Scope::Value(inner.as_ref())
                    }
                    Err(_) => {
                        path = path.with_attribute(segment);
                        Scope::Opaque
                    }
                },
                Scope::Value(AttributeType::Map(inner)) => {
                    path = path.with_key(segment);
                    Scope::Value(inner.as_ref())
                }
                Scope::Value(_) | Scope::Opaque => {
                    path = path.with_attribute(segment);
                    Scope::Opaque
                }
            };
        }
        path
    }

    /// Find the attribute addressed by a resolved path
    pub fn attribute_at(&self, path: &AttributePath) -> Option<&Attribute> {
        let mut scope = &self.attributes;
        let mut current: Option<&Attribute> = None;
        let mut current_type: Option<&AttributeType> = None;
        for step in path.steps() {
            match step {
                PathStep::Attribute(name) => {
                    if let Some(AttributeType::Object(attrs)) = current_type {
                        scope = attrs;
                    }
                    let attr = scope.get(name)?;
                    current = Some(attr);
                    current_type = Some(&attr.attr_type);
                }
                PathStep::Index(_) | PathStep::Key(_) => {
                    current_type = match current_type {
                        Some(AttributeType::List(inner)) | Some(AttributeType::Map(inner)) => {
                            Some(inner.as_ref())
                        }
                        _ => return None,
                    };
                }
            }
        }
        current
    }
}

enum Scope<'a> {
    Attributes(&'a Attributes),
    Value(&'a AttributeType),
    Opaque,
}

fn step_into<'a>(attrs: &'a Attributes, wire: &str, path: &mut AttributePath) -> Scope<'a> {
    match attrs
        .iter()
        .find(|(name, attr)| attr.wire_name_for(name) == wire)
    {
        Some((name, attr)) => {
            *path = std::mem::take(path).with_attribute(name.clone());
            Scope::Value(&attr.attr_type)
        }
        None => {
            *path = std::mem::take(path).with_attribute(wire);
            Scope::Opaque
        }
    }
}

fn nested_attributes(attr_type: &AttributeType) -> Option<&Attributes> {
    match attr_type {
        AttributeType::Object(attrs) => Some(attrs),
        AttributeType::List(inner) | AttributeType::Map(inner) => nested_attributes(inner),
        _ => None,
    }
}

fn object_schema(attrs: &Attributes, json: &mut serde_json::Map<String, JsonValue>) {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for (name, attr) in attrs {
        // Computed-only attributes are never part of the configuration
        if !attr.is_configurable() {
            continue;
        }
        let wire = attr.wire_name_for(name);
        properties.insert(wire.clone(), attribute_schema(attr));
        if attr.required {
            required.push(JsonValue::String(wire));
        }
    }

    json.insert("type".into(), JsonValue::String("object".into()));
    json.insert("properties".into(), JsonValue::Object(properties));
    if !required.is_empty() {
        json.insert("required".into(), JsonValue::Array(required));
    }
}

fn attribute_schema(attr: &Attribute) -> JsonValue {
    let mut json = type_schema(&attr.attr_type);
    if let JsonValue::Object(obj) = &mut json {
        if !attr.description.is_empty() {
            obj.insert(
                "description".into(),
                JsonValue::String(attr.description.clone()),
            );
        }
        for validator in &attr.validators {
            validator.apply(obj);
        }
    }
    json
}

fn type_schema(attr_type: &AttributeType) -> JsonValue {
    let mut json = serde_json::Map::new();
    match attr_type {
        AttributeType::Object(attrs) => object_schema(attrs, &mut json),
        AttributeType::List(inner) => {
            json.insert("type".into(), JsonValue::String("array".into()));
            json.insert("items".into(), type_schema(inner));
        }
        AttributeType::Map(inner) => {
            json.insert("type".into(), JsonValue::String("object".into()));
            json.insert("additionalProperties".into(), type_schema(inner));
        }
        scalar => {
            json.insert("type".into(), JsonValue::String(scalar.json_type().into()));
        }
    }
    JsonValue::Object(json)
}

fn collect_replace_triggers(
    attrs: &Attributes,
    path: &AttributePath,
    pointer: &str,
    out: &mut Vec<ReplaceTrigger>,
) {
    for (name, attr) in attrs {
        let attr_path = path.clone().with_attribute(name.clone());
        let attr_pointer = format!("{}/{}", pointer, attr.wire_name_for(name));
        if attr.requires_replace {
            out.push(ReplaceTrigger {
                path: attr_path.clone(),
                pointer: attr_pointer.clone(),
            });
        }
        if let AttributeType::Object(nested) = &attr.attr_type {
            collect_replace_triggers(nested, &attr_path, &attr_pointer, out);
        }
    }
}

fn check_attributes(attrs: &Attributes, path: &AttributePath) -> Result<()> {
    for (name, attr) in attrs {
        let attr_path = path.clone().with_attribute(name.clone());
        let invalid = |message: &str| CoreError::InvalidSchema {
            message: format!("{}: {}", attr_path, message),
        };

        if attr.required && attr.optional {
            return Err(invalid("cannot be both required and optional"));
        }
        if attr.required && attr.computed {
            return Err(invalid("cannot be both required and computed"));
        }
        if !attr.required && !attr.optional && !attr.computed {
            return Err(invalid("must be required, optional or computed"));
        }

        for validator in &attr.validators {
            match validator {
                Validator::Matches { pattern, .. } => {
                    regex::Regex::new(pattern)
                        .map_err(|e| invalid(&format!("invalid pattern: {}", e)))?;
                }
                Validator::OneOf(values) if values.is_empty() => {
                    return Err(invalid("one-of validator needs at least one value"));
                }
                Validator::Between(min, max) if min > max => {
                    return Err(invalid("between validator has min greater than max"));
                }
                _ => {}
            }
        }

        if let Some(nested) = nested_attributes(&attr.attr_type) {
            check_attributes(nested, &attr_path)?;
        }
    }
    Ok(())
}

/// A single failed constraint
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    /// Attribute that failed
    pub path: AttributePath,
    /// Constraint that failed (`required`, `type`, or the validator description)
    pub constraint: String,
    /// Raw message from the validator
    pub message: String,
}

/// Result of schema validation
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether the configuration is valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ValidationFailure>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    /// Create a failed validation result with errors
    pub fn failure(errors: Vec<ValidationFailure>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Schema validator with cached compiled schema
pub struct SchemaValidator {
    /// The original schema
    schema: Schema,

    /// Compiled JSON Schema validator
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Create a new validator from a schema
    pub fn new(schema: Schema) -> Result<Self> {
        schema.check()?;
        let json_schema = schema.to_json_schema();

        let compiled =
            jsonschema::validator_for(&json_schema).map_err(|e| CoreError::InvalidSchema {
                message: format!("Invalid schema: {}", e),
            })?;

        Ok(Self { schema, compiled })
    }

    /// Validate a configuration document (wire names) against the schema
    pub fn validate(&self, document: &JsonValue) -> ValidationResult {
        if self.compiled.is_valid(document) {
            return ValidationResult::success();
        }

        let errors = self
            .compiled
            .iter_errors(document)
            .map(|e| {
                let keyword = e
                    .schema_path
                    .to_string()
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let mut path = self.schema.resolve_pointer(&e.instance_path.to_string());

                if let jsonschema::error::ValidationErrorKind::Required { property } = &e.kind {
                    if let Some(missing) = property.as_str() {
                        let child = format!("{}/{}", e.instance_path, escape_pointer(missing));
                        path = self.schema.resolve_pointer(&child);
                    }
                }

                let constraint = self.constraint_for(&path, &keyword);
                ValidationFailure {
                    path,
                    constraint,
                    message: format_validation_error(&e),
                }
            })
            .collect();

        ValidationResult::failure(errors)
    }

    /// Get the original schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn constraint_for(&self, path: &AttributePath, keyword: &str) -> String {
        self.schema
            .attribute_at(path)
            .and_then(|attr| {
                attr.validators
                    .iter()
                    .find(|v| v.keywords().contains(&keyword))
            })
            .map(|v| v.to_string())
            .unwrap_or_else(|| keyword.to_string())
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Format a validation error into a user-friendly message
fn format_validation_error(error: &jsonschema::ValidationError) -> String {
    let msg = error.to_string();

    // Clean up common patterns for better readability
    msg.replace("\"", "'")
}
