//! Table-driven decode
//!
//! Walks a wire tree against the schema's declared fields: choice groups are
//! resolved by scanning every alternative wire name, repeating fields demand
//! arrays, nested component types recurse, and wire keys the schema does not
//! know are retained on the instance's extra-data side channel instead of
//! being dropped or rejected.

use std::collections::HashSet;

use serde_json::{Map, Value};

use argentum_registry::SchemaRegistry;
use argentum_schema::{is_primitive, DataValue, FieldSchema, Instance, ResourceSchema, TypeRef};

use crate::error::DecodeError;

/// How strictly content-level problems are treated during decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Fail on the first structural or content error.
    #[default]
    Strict,
    /// Best effort: missing required fields and out-of-set codes are left to
    /// the validator, and a field whose shape cannot be represented is
    /// retained raw on the side channel while its siblings still decode.
    Lenient,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub mode: DecodeMode,
}

/// Schema-driven decoder. Stateless apart from its registry handle; one
/// decoder may serve any number of calls concurrently.
pub struct Decoder<'a> {
    registry: &'a SchemaRegistry,
    options: DecodeOptions,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            options: DecodeOptions::default(),
        }
    }

    pub fn with_options(registry: &'a SchemaRegistry, options: DecodeOptions) -> Self {
        Self { registry, options }
    }

    /// A decoder in [`DecodeMode::Lenient`].
    pub fn lenient(registry: &'a SchemaRegistry) -> Self {
        Self::with_options(
            registry,
            DecodeOptions {
                mode: DecodeMode::Lenient,
            },
        )
    }

    /// Decode a wire tree against a named schema.
    pub fn decode(&self, type_name: &str, node: &Value) -> Result<Instance, DecodeError> {
        let schema = self
            .registry
            .get(type_name)
            .map_err(|_| DecodeError::UnknownType(type_name.to_string()))?;
        let obj = node.as_object().ok_or_else(|| DecodeError::ExpectedObject {
            path: type_name.to_string(),
        })?;
        tracing::trace!(type_name, "decoding");
        self.decode_object(schema, obj, type_name)
    }

    /// Decode a wire tree whose type is taken from its `resourceType` key.
    pub fn decode_resource(&self, node: &Value) -> Result<Instance, DecodeError> {
        let obj = node.as_object().ok_or_else(|| DecodeError::ExpectedObject {
            path: "resource".to_string(),
        })?;
        let resource_type = obj
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::MissingResourceType {
                path: "resource".to_string(),
            })?;
        self.decode(resource_type, node)
    }

    /// Decode a FHIR XML document through the shared wire-tree layer.
    pub fn decode_xml(&self, input: &str) -> Result<Instance, DecodeError> {
        let node = argentum_format::parse_xml(input)?;
        self.decode_resource(&node)
    }

    fn decode_object(
        &self,
        schema: &ResourceSchema,
        obj: &Map<String, Value>,
        path: &str,
    ) -> Result<Instance, DecodeError> {
        let mut instance = Instance::new(&schema.name);
        let mut consumed: HashSet<String> = HashSet::new();

        for field in &schema.fields {
            if field.is_choice() {
                self.decode_choice(field, obj, path, &mut instance, &mut consumed)?;
            } else {
                self.decode_plain(field, obj, path, &mut instance, &mut consumed)?;
            }
        }

        // Everything the schema did not claim is retained verbatim, so
        // valid-but-newer data survives a round trip.
        for (key, value) in obj {
            if key != "resourceType" && !consumed.contains(key.as_str()) {
                instance.insert_extra(key.clone(), value.clone());
            }
        }

        Ok(instance)
    }

    fn decode_choice(
        &self,
        field: &FieldSchema,
        obj: &Map<String, Value>,
        path: &str,
        instance: &mut Instance,
        consumed: &mut HashSet<String>,
    ) -> Result<(), DecodeError> {
        let present: Vec<(&TypeRef, String)> = field
            .types
            .iter()
            .filter_map(|t| {
                let key = field.wire_name(&t.code);
                obj.contains_key(&key).then_some((t, key))
            })
            .collect();

        if present.len() > 1 {
            return Err(DecodeError::AmbiguousChoice {
                path: path.to_string(),
                field: field.display_name(),
            });
        }

        let Some((tref, key)) = present.into_iter().next() else {
            if field.is_required() && self.options.mode == DecodeMode::Strict {
                return Err(DecodeError::MissingRequiredField {
                    path: path.to_string(),
                    field: field.display_name(),
                });
            }
            return Ok(());
        };

        let raw = &obj[&key];
        let field_path = format!("{path}.{key}");
        if raw.is_array() {
            return self.recover(
                DecodeError::UnexpectedArray { path: field_path },
            );
        }

        match self.decode_value(field, tref, raw, &field_path) {
            Ok(value) => {
                instance.set_choice(&field.name, &tref.code, value);
                consumed.insert(key);
                Ok(())
            }
            Err(err) => self.recover(err),
        }
    }

    fn decode_plain(
        &self,
        field: &FieldSchema,
        obj: &Map<String, Value>,
        path: &str,
        instance: &mut Instance,
        consumed: &mut HashSet<String>,
    ) -> Result<(), DecodeError> {
        let Some(raw) = obj.get(&field.name) else {
            if field.is_required() && self.options.mode == DecodeMode::Strict {
                return Err(DecodeError::MissingRequiredField {
                    path: path.to_string(),
                    field: field.name.clone(),
                });
            }
            return Ok(());
        };

        let field_path = format!("{path}.{}", field.name);
        let tref = &field.types[0];

        if field.array {
            let Some(items) = raw.as_array() else {
                return self.recover(DecodeError::ExpectedArray { path: field_path });
            };
            match self.decode_elements(field, tref, items, &field_path) {
                Ok(values) => {
                    for value in values {
                        instance.push(&field.name, value);
                    }
                    consumed.insert(field.name.clone());
                    Ok(())
                }
                Err(err) => self.recover(err),
            }
        } else {
            if raw.is_array() {
                return self.recover(DecodeError::UnexpectedArray { path: field_path });
            }
            match self.decode_value(field, tref, raw, &field_path) {
                Ok(value) => {
                    instance.set(&field.name, value);
                    consumed.insert(field.name.clone());
                    Ok(())
                }
                Err(err) => self.recover(err),
            }
        }
    }

    fn decode_elements(
        &self,
        field: &FieldSchema,
        tref: &TypeRef,
        items: &[Value],
        field_path: &str,
    ) -> Result<Vec<DataValue>, DecodeError> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let item_path = format!("{field_path}[{idx}]");
                self.decode_value(field, tref, item, &item_path)
            })
            .collect()
    }

    fn decode_value(
        &self,
        field: &FieldSchema,
        tref: &TypeRef,
        raw: &Value,
        path: &str,
    ) -> Result<DataValue, DecodeError> {
        if is_primitive(&tref.code) {
            self.check_primitive_shape(&tref.code, raw, path)?;
            if self.options.mode == DecodeMode::Strict {
                self.check_required_binding(field, tref, raw, path)?;
            }
            return Ok(DataValue::Primitive(raw.clone()));
        }

        // Polymorphic slot (contained resources): the wire node names its own
        // type.
        if tref.code == "Resource" {
            let obj = raw.as_object().ok_or_else(|| DecodeError::ExpectedObject {
                path: path.to_string(),
            })?;
            let resource_type = obj
                .get("resourceType")
                .and_then(Value::as_str)
                .ok_or_else(|| DecodeError::MissingResourceType {
                    path: path.to_string(),
                })?;
            let schema = self
                .registry
                .get(resource_type)
                .map_err(|_| DecodeError::UnknownType(resource_type.to_string()))?;
            return Ok(DataValue::Node(self.decode_object(schema, obj, path)?));
        }

        let schema = self
            .registry
            .get(&tref.code)
            .map_err(|_| DecodeError::UnknownType(tref.code.clone()))?;
        let obj = raw.as_object().ok_or_else(|| DecodeError::ExpectedObject {
            path: path.to_string(),
        })?;
        Ok(DataValue::Node(self.decode_object(schema, obj, path)?))
    }

    fn check_primitive_shape(
        &self,
        code: &str,
        raw: &Value,
        path: &str,
    ) -> Result<(), DecodeError> {
        let ok = match code {
            "boolean" => raw.is_boolean(),
            "integer" => raw.as_i64().is_some(),
            "unsignedInt" | "positiveInt" => raw.as_u64().is_some(),
            // XML primitives arrive as strings; numeric strings are accepted
            // for decimals.
            "decimal" => {
                raw.is_number()
                    || raw
                        .as_str()
                        .is_some_and(|s| s.parse::<f64>().is_ok())
            }
            _ => raw.is_string(),
        };

        if ok {
            Ok(())
        } else {
            Err(DecodeError::ExpectedPrimitive {
                path: path.to_string(),
                expected: code.to_string(),
            })
        }
    }

    fn check_required_binding(
        &self,
        field: &FieldSchema,
        tref: &TypeRef,
        raw: &Value,
        path: &str,
    ) -> Result<(), DecodeError> {
        if tref.code != "code" {
            return Ok(());
        }
        let Some(binding) = &field.binding else {
            return Ok(());
        };
        if !binding.strength.is_required() {
            return Ok(());
        }
        let Some(code) = raw.as_str() else {
            return Ok(());
        };

        // A value set missing from the pack cannot be evaluated; membership
        // is only enforced for sets the registry knows.
        if self.registry.contains_code(&binding.value_set, code) == Some(false) {
            return Err(DecodeError::UnboundCode {
                path: path.to_string(),
                code: code.to_string(),
                value_set: binding.value_set.clone(),
            });
        }
        Ok(())
    }

    /// In lenient mode a field whose shape cannot be represented is skipped
    /// (and later retained raw on the side channel); ambiguous choice groups
    /// stay fatal in every mode.
    fn recover(&self, err: DecodeError) -> Result<(), DecodeError> {
        let recoverable = self.options.mode == DecodeMode::Lenient
            && !matches!(
                err,
                DecodeError::AmbiguousChoice { .. } | DecodeError::MissingRequiredField { .. }
            );
        if recoverable {
            tracing::debug!(error = %err, "skipping undecodable field");
            Ok(())
        } else {
            Err(err)
        }
    }
}
