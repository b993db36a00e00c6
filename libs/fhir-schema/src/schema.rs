//! Declarative schema tables
//!
//! A [`ResourceSchema`] describes one resource, complex datatype, or backbone
//! component: its field list in wire order, each field's cardinality, declared
//! type alternatives, and optional value-set binding. Tables are loaded from
//! packaged JSON data files; nothing here is generated per resource.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// FHIR R4 primitive type codes.
///
/// Fields declared with one of these hold a JSON scalar; everything else
/// resolves to another registered schema and nests.
const PRIMITIVE_TYPES: &[&str] = &[
    "base64Binary",
    "boolean",
    "canonical",
    "code",
    "date",
    "dateTime",
    "decimal",
    "id",
    "instant",
    "integer",
    "markdown",
    "oid",
    "positiveInt",
    "string",
    "time",
    "unsignedInt",
    "uri",
    "url",
    "uuid",
    "xhtml",
];

/// Whether a type code names a FHIR primitive.
pub fn is_primitive(code: &str) -> bool {
    PRIMITIVE_TYPES.contains(&code)
}

/// Schema for one resource, complex datatype, or backbone component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    /// Type name. Backbone components use dotted names ("Observation.component").
    pub name: String,

    /// What kind of structure this describes.
    pub kind: SchemaKind,

    /// Short documentation extracted from the specification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Fields in declared wire order. The order is preserved on encode.
    pub fields: Vec<FieldSchema>,
}

/// Structure classification, mirroring StructureDefinition.kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaKind {
    Resource,
    ComplexType,
    Backbone,
}

/// Schema for a single field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// Base field name. For a choice group this is the stem ("value" for
    /// `value[x]`); concrete wire names are derived per alternative.
    pub name: String,

    /// Declared type alternatives. A singleton for normal fields, several
    /// for a choice group.
    pub types: Vec<TypeRef>,

    /// Minimum occurrences (0 or 1).
    #[serde(default)]
    pub min: u32,

    /// True when the field repeats (max = *). False means max = 1.
    #[serde(default)]
    pub array: bool,

    /// Value-set binding for coded fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,

    /// Short documentation extracted from the specification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
}

/// One declared type of a field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    /// Primitive type code or the name of another registered schema.
    pub code: String,

    /// Allowed target profiles when `code` is "Reference".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_profiles: Option<Vec<String>>,
}

impl TypeRef {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            target_profiles: None,
        }
    }
}

/// Value-set binding for a coded field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Binding strength (required | extensible | preferred | example).
    pub strength: BindingStrength,

    /// Canonical URL of the bound value set.
    pub value_set: String,
}

/// How strictly a coded value must come from the bound value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

impl BindingStrength {
    /// Only required-strength bindings reject out-of-set codes.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

impl FieldSchema {
    /// Check if the field must be present (min > 0).
    pub fn is_required(&self) -> bool {
        self.min > 0
    }

    /// Check if this is a choice group (`value[x]` style, several types).
    pub fn is_choice(&self) -> bool {
        self.types.len() > 1
    }

    /// Display name: the stem plus `[x]` for choice groups.
    pub fn display_name(&self) -> String {
        if self.is_choice() {
            format!("{}[x]", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Wire name for one alternative: the stem for plain fields, the stem
    /// plus the capitalized type code for choice groups ("valueQuantity").
    pub fn wire_name(&self, type_code: &str) -> String {
        if self.is_choice() {
            format!("{}{}", self.name, capitalize(type_code))
        } else {
            self.name.clone()
        }
    }

    /// All wire names this field may appear under, in declared type order.
    pub fn wire_names(&self) -> Vec<String> {
        self.types.iter().map(|t| self.wire_name(&t.code)).collect()
    }

    /// Resolve a wire key back to the declared alternative it selects.
    pub fn alternative_for(&self, wire_key: &str) -> Option<&TypeRef> {
        self.types.iter().find(|t| self.wire_name(&t.code) == wire_key)
    }

    /// Resolve a type code to its declared alternative.
    pub fn type_named(&self, type_code: &str) -> Option<&TypeRef> {
        self.types.iter().find(|t| t.code == type_code)
    }

    /// Cardinality as a string ("0..1", "1..*").
    pub fn cardinality_string(&self) -> String {
        let max = if self.array { "*" } else { "1" };
        format!("{}..{}", self.min, max)
    }
}

impl ResourceSchema {
    /// Look up a field by its base name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Structural sanity check, run once when the registry loads a table.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidSchema {
                name: "<unnamed>".to_string(),
                reason: "type name is empty".to_string(),
            });
        }

        for field in &self.fields {
            if field.name.is_empty() {
                return Err(self.invalid("field with empty name"));
            }
            if field.types.is_empty() {
                return Err(self.invalid(format!("field '{}' declares no types", field.name)));
            }
            if field.min > 1 {
                return Err(self.invalid(format!(
                    "field '{}' has min {}, only 0 and 1 are allowed",
                    field.name, field.min
                )));
            }
            if field.is_choice() && field.array {
                return Err(self.invalid(format!(
                    "choice group '{}' cannot repeat",
                    field.display_name()
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(self.invalid(format!("duplicate field '{}'", field.name)));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::InvalidSchema {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ResourceSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} fields)", self.name, self.fields.len())
    }
}

fn capitalize(code: &str) -> String {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
