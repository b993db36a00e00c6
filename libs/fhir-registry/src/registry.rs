//! Schema registry construction and lookup

use std::collections::HashMap;

use argentum_schema::ResourceSchema;

use crate::error::{Error, Result};
use crate::value_set::{CodeSet, ValueSetDef};

/// Packaged schema tables, one file per resource type plus the shared
/// datatype table.
const SCHEMA_TABLES: &[&str] = &[
    include_str!("../data/datatypes.json"),
    include_str!("../data/observation.json"),
    include_str!("../data/questionnaire.json"),
    include_str!("../data/risk_assessment.json"),
    include_str!("../data/substance_specification.json"),
    include_str!("../data/value_set.json"),
];

/// Packaged terminology table backing required/extensible bindings.
const TERMINOLOGY: &str = include_str!("../data/terminology.json");

/// Immutable lookup table: type name → schema, value-set URL → code set.
///
/// Built once at startup; shared freely afterwards.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, ResourceSchema>,
    value_sets: HashMap<String, CodeSet>,
}

impl SchemaRegistry {
    /// Load the schema pack shipped with this crate.
    pub fn from_embedded() -> Result<Self> {
        Self::from_sources(SCHEMA_TABLES.iter().copied(), TERMINOLOGY)
    }

    /// Build a registry from raw table JSON. Each schema source is a JSON
    /// array of schema objects; the terminology source is a JSON array of
    /// value-set definitions.
    pub fn from_sources<'a>(
        schema_sources: impl IntoIterator<Item = &'a str>,
        terminology_source: &str,
    ) -> Result<Self> {
        let mut schemas = HashMap::new();
        for source in schema_sources {
            let table: Vec<ResourceSchema> = serde_json::from_str(source)?;
            for schema in table {
                schema.validate()?;
                if schemas.contains_key(&schema.name) {
                    return Err(Error::DuplicateType(schema.name));
                }
                schemas.insert(schema.name.clone(), schema);
            }
        }

        let mut value_sets = HashMap::new();
        let defs: Vec<ValueSetDef> = serde_json::from_str(terminology_source)?;
        for def in defs {
            let set = CodeSet::from(def);
            if value_sets.contains_key(set.url()) {
                return Err(Error::DuplicateValueSet(set.url().to_string()));
            }
            value_sets.insert(set.url().to_string(), set);
        }

        tracing::debug!(
            schemas = schemas.len(),
            value_sets = value_sets.len(),
            "schema registry loaded"
        );

        Ok(Self {
            schemas,
            value_sets,
        })
    }

    /// Look up a schema; unknown names are a fatal error for the caller.
    pub fn get(&self, type_name: &str) -> Result<&ResourceSchema> {
        self.schemas
            .get(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    /// Look up a schema without an error value.
    pub fn resolve(&self, type_name: &str) -> Option<&ResourceSchema> {
        self.schemas.get(type_name)
    }

    pub fn contains_type(&self, type_name: &str) -> bool {
        self.schemas.contains_key(type_name)
    }

    /// Registered type names, in no particular order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Look up a value set by canonical URL.
    pub fn value_set(&self, url: &str) -> Option<&CodeSet> {
        self.value_sets.get(url)
    }

    /// Membership check. `None` means the value set is not in the pack and
    /// the caller cannot evaluate the binding.
    pub fn contains_code(&self, url: &str, code: &str) -> Option<bool> {
        self.value_sets.get(url).map(|set| set.contains(code))
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    pub fn value_set_count(&self) -> usize {
        self.value_sets.len()
    }
}
