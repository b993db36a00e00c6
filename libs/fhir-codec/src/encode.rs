//! Table-driven encode
//!
//! Emits fields in schema-declared order, omits unset fields, writes the
//! populated choice alternative under its specific wire name, and re-emits
//! retained unknown keys after the schema fields.

use serde_json::{Map, Value};

use argentum_registry::SchemaRegistry;
use argentum_schema::{DataValue, FieldValue, Instance, SchemaKind};

use crate::error::EncodeError;

/// Schema-driven encoder. Stateless apart from its registry handle.
pub struct Encoder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Encoder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Encode an instance as a wire tree.
    pub fn encode(&self, instance: &Instance) -> Result<Value, EncodeError> {
        let schema = self
            .registry
            .get(instance.type_name())
            .map_err(|_| EncodeError::UnknownType(instance.type_name().to_string()))?;

        let mut obj = Map::new();
        if schema.kind == SchemaKind::Resource {
            obj.insert(
                "resourceType".to_string(),
                Value::String(schema.name.clone()),
            );
        }

        for field in &schema.fields {
            let Some(entry) = instance.get(&field.name) else {
                continue;
            };

            let wire_key = if field.is_choice() {
                let Some(chosen) = entry.chosen_type.as_deref() else {
                    return Err(EncodeError::UntaggedChoice {
                        type_name: schema.name.clone(),
                        field: field.display_name(),
                    });
                };
                if field.type_named(chosen).is_none() {
                    return Err(EncodeError::UnknownAlternative {
                        type_name: schema.name.clone(),
                        field: field.display_name(),
                        type_code: chosen.to_string(),
                    });
                }
                field.wire_name(chosen)
            } else {
                field.name.clone()
            };

            let value = match &entry.value {
                FieldValue::One(v) => self.encode_value(v)?,
                FieldValue::Many(items) => {
                    if items.is_empty() {
                        continue;
                    }
                    Value::Array(
                        items
                            .iter()
                            .map(|v| self.encode_value(v))
                            .collect::<Result<_, _>>()?,
                    )
                }
            };
            obj.insert(wire_key, value);
        }

        for (key, value) in instance.extra() {
            obj.insert(key.clone(), value.clone());
        }

        Ok(Value::Object(obj))
    }

    /// Encode an instance as a FHIR XML document.
    pub fn encode_xml(&self, instance: &Instance) -> Result<String, EncodeError> {
        let node = self.encode(instance)?;
        Ok(argentum_format::write_xml(&node)?)
    }

    fn encode_value(&self, value: &DataValue) -> Result<Value, EncodeError> {
        match value {
            DataValue::Primitive(v) => Ok(v.clone()),
            DataValue::Node(nested) => self.encode(nested),
        }
    }
}
