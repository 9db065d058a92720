//! Attribute trees describing a custom resource's `spec`
//!
//! Every CRD kind is described by one [`Attribute`] tree rather than a
//! dedicated struct. Leaves carry declarative [`Validator`]s; the whole tree
//! compiles to JSON Schema for validation and doubles as a projection that
//! trims server responses down to the declared shape.
//!
//! ```yaml
//! type: object
//! attributes:
//!   replicas:
//!     type: integer
//!     optional: true
//!     default: 1
//!     validators:
//!       - between: { min: 0, max: 10 }
//!   mode:
//!     type: string
//!     required: true
//!     validators:
//!       - oneOf: [Active, Passive]
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result, ValidationErrorInfo};

/// Value type of an attribute
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// String-keyed map with homogeneous values described by `items`
    Map,
    /// Free-form value, kept verbatim
    #[default]
    Any,
}

/// Declarative constraint attached to an attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Validator {
    /// String must be one of the listed values
    OneOf(Vec<String>),

    /// String must match the regular expression
    Regex(String),

    /// String length bounds
    LengthBetween {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },

    /// Numeric bounds (inclusive)
    Between {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },

    /// Number of elements of an array or entries of a map
    SizeBetween {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
}

/// One node of a schema tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    #[serde(rename = "type", default)]
    pub attr_type: AttrType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,

    /// Set by the server; user input is rejected unless also `optional`
    #[serde(default, skip_serializing_if = "is_false")]
    pub computed: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,

    /// Written as single-key maps, e.g. `- oneOf: [a, b]`
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        with = "serde_yaml::with::singleton_map_recursive"
    )]
    pub validators: Vec<Validator>,

    /// Nested attributes of an `object`
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, Attribute>,

    /// Element schema of an `array`, value schema of a `map`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Attribute>>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Attribute {
    pub fn new(attr_type: AttrType) -> Self {
        Self {
            attr_type,
            ..Default::default()
        }
    }

    /// Free-form object accepting anything
    pub fn any() -> Self {
        Self::new(AttrType::Any)
    }

    pub fn object(attributes: impl IntoIterator<Item = (String, Attribute)>) -> Self {
        Self {
            attr_type: AttrType::Object,
            attributes: attributes.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_items(mut self, items: Attribute) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Computed and not settable by the user
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    /// Check flag combinations and shape consistency of the whole tree
    pub fn check(&self) -> Result<()> {
        self.check_at("(root)")
    }

    fn check_at(&self, path: &str) -> Result<()> {
        let invalid = |message: String| CoreError::InvalidSchema {
            message: format!("{}: {}", path, message),
        };

        if self.required && (self.optional || self.computed) {
            return Err(invalid(
                "'required' cannot be combined with 'optional' or 'computed'".to_string(),
            ));
        }
        if !self.attributes.is_empty() && self.attr_type != AttrType::Object {
            return Err(invalid(format!(
                "nested attributes are only allowed on objects, found {:?}",
                self.attr_type
            )));
        }
        if self.items.is_some() && !matches!(self.attr_type, AttrType::Array | AttrType::Map) {
            return Err(invalid(format!(
                "'items' is only allowed on arrays and maps, found {:?}",
                self.attr_type
            )));
        }

        for (name, child) in &self.attributes {
            child.check_at(&format!("{}/{}", path.trim_start_matches("(root)"), name))?;
        }
        if let Some(items) = &self.items {
            items.check_at(&format!("{}/*", path.trim_start_matches("(root)")))?;
        }
        Ok(())
    }

    /// Convert to a JSON Schema document
    pub fn to_json_schema(&self) -> JsonValue {
        let mut json = serde_json::Map::new();

        let type_str = match self.attr_type {
            AttrType::String => Some("string"),
            AttrType::Integer => Some("integer"),
            AttrType::Number => Some("number"),
            AttrType::Boolean => Some("boolean"),
            AttrType::Array => Some("array"),
            AttrType::Object | AttrType::Map => Some("object"),
            AttrType::Any => None,
        };
        if let Some(t) = type_str {
            json.insert("type".into(), JsonValue::String(t.into()));
        }

        if let Some(desc) = &self.description {
            json.insert("description".into(), JsonValue::String(desc.clone()));
        }

        for validator in &self.validators {
            self.insert_validator(&mut json, validator);
        }

        match self.attr_type {
            AttrType::Object if !self.attributes.is_empty() => {
                let mut properties = serde_json::Map::new();
                let mut required = Vec::new();
                for (name, child) in &self.attributes {
                    properties.insert(name.clone(), child.to_json_schema());
                    if child.required {
                        required.push(JsonValue::String(name.clone()));
                    }
                }
                json.insert("properties".into(), JsonValue::Object(properties));
                json.insert("additionalProperties".into(), JsonValue::Bool(false));
                if !required.is_empty() {
                    json.insert("required".into(), JsonValue::Array(required));
                }
            }
            AttrType::Array => {
                if let Some(items) = &self.items {
                    json.insert("items".into(), items.to_json_schema());
                }
            }
            AttrType::Map => {
                if let Some(items) = &self.items {
                    json.insert("additionalProperties".into(), items.to_json_schema());
                }
            }
            _ => {}
        }

        JsonValue::Object(json)
    }

    fn insert_validator(&self, json: &mut serde_json::Map<String, JsonValue>, validator: &Validator) {
        match validator {
            Validator::OneOf(values) => {
                json.insert(
                    "enum".into(),
                    JsonValue::Array(values.iter().cloned().map(JsonValue::String).collect()),
                );
            }
            Validator::Regex(pattern) => {
                json.insert("pattern".into(), JsonValue::String(pattern.clone()));
            }
            Validator::LengthBetween { min, max } => {
                if let Some(min) = min {
                    json.insert("minLength".into(), JsonValue::from(*min));
                }
                if let Some(max) = max {
                    json.insert("maxLength".into(), JsonValue::from(*max));
                }
            }
            Validator::Between { min, max } => {
                if let Some(min) = min {
                    json.insert("minimum".into(), JsonValue::from(*min));
                }
                if let Some(max) = max {
                    json.insert("maximum".into(), JsonValue::from(*max));
                }
            }
            Validator::SizeBetween { min, max } => {
                let (min_key, max_key) = if self.attr_type == AttrType::Array {
                    ("minItems", "maxItems")
                } else {
                    ("minProperties", "maxProperties")
                };
                if let Some(min) = min {
                    json.insert(min_key.into(), JsonValue::from(*min));
                }
                if let Some(max) = max {
                    json.insert(max_key.into(), JsonValue::from(*max));
                }
            }
        }
    }

    /// Keep only the declared parts of `value`
    ///
    /// Server responses carry fields the schema does not know about
    /// (status, defaulted internals). Dropping them keeps the tracked state
    /// in the declared shape.
    pub fn project(&self, value: &JsonValue) -> JsonValue {
        match (self.attr_type, value) {
            (AttrType::Object, JsonValue::Object(map)) if !self.attributes.is_empty() => {
                let projected = self
                    .attributes
                    .iter()
                    .filter_map(|(name, child)| {
                        map.get(name).map(|v| (name.clone(), child.project(v)))
                    })
                    .collect();
                JsonValue::Object(projected)
            }
            (AttrType::Array, JsonValue::Array(items)) => match &self.items {
                Some(schema) => JsonValue::Array(items.iter().map(|v| schema.project(v)).collect()),
                None => value.clone(),
            },
            (AttrType::Map, JsonValue::Object(map)) => match &self.items {
                Some(schema) => JsonValue::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), schema.project(v)))
                        .collect(),
                ),
                None => value.clone(),
            },
            _ => value.clone(),
        }
    }

    /// Fill in declared defaults for absent attributes
    pub fn apply_defaults(&self, value: &mut JsonValue) {
        let JsonValue::Object(map) = value else {
            return;
        };

        for (name, child) in &self.attributes {
            match map.get_mut(name) {
                Some(existing) => child.apply_defaults(existing),
                None => {
                    if let Some(default) = &child.default {
                        map.insert(name.clone(), default.clone());
                    }
                }
            }
        }
    }

    /// Paths of computed-only attributes that were set in `value`
    fn computed_only_violations(&self, value: &JsonValue, path: &str, out: &mut Vec<ValidationErrorInfo>) {
        match (self.attr_type, value) {
            (AttrType::Object, JsonValue::Object(map)) => {
                for (name, child) in &self.attributes {
                    let Some(v) = map.get(name) else { continue };
                    let child_path = format!("{}/{}", path, name);
                    if child.is_computed_only() && !v.is_null() {
                        out.push(ValidationErrorInfo {
                            path: child_path,
                            message: "attribute is computed and cannot be set".to_string(),
                        });
                    } else {
                        child.computed_only_violations(v, &child_path, out);
                    }
                }
            }
            (AttrType::Array, JsonValue::Array(items)) => {
                if let Some(schema) = &self.items {
                    for (i, item) in items.iter().enumerate() {
                        schema.computed_only_violations(item, &format!("{}/{}", path, i), out);
                    }
                }
            }
            (AttrType::Map, JsonValue::Object(map)) => {
                if let Some(schema) = &self.items {
                    for (key, item) in map {
                        schema.computed_only_violations(item, &format!("{}/{}", path, key), out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Result of schema validation
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationErrorInfo>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<ValidationErrorInfo>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Schema validator with cached compiled schema
pub struct SchemaValidator {
    root: Attribute,
    compiled: jsonschema::Validator,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    pub fn new(root: Attribute) -> Result<Self> {
        root.check()?;

        let json_schema = root.to_json_schema();
        let compiled =
            jsonschema::validator_for(&json_schema).map_err(|e| CoreError::InvalidSchema {
                message: format!("Invalid schema: {}", e),
            })?;

        Ok(Self { root, compiled })
    }

    /// Validate user-supplied values against the schema
    pub fn validate(&self, values: &JsonValue) -> ValidationResult {
        let mut errors = Vec::new();
        self.root.computed_only_violations(values, "", &mut errors);

        if !self.compiled.is_valid(values) {
            errors.extend(self.compiled.iter_errors(values).map(|e| {
                let path = e.instance_path.to_string();
                ValidationErrorInfo {
                    path: if path.is_empty() {
                        "(root)".to_string()
                    } else {
                        path
                    },
                    message: format_validation_error(&e),
                }
            }));
        }

        if errors.is_empty() {
            ValidationResult::success()
        } else {
            ValidationResult::failure(errors)
        }
    }

    pub fn root(&self) -> &Attribute {
        &self.root
    }
}

fn format_validation_error(error: &jsonschema::ValidationError) -> String {
    error.to_string().replace('"', "'")
}
