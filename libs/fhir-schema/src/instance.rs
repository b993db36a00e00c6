//! Generic resource instances
//!
//! An [`Instance`] is the in-memory shape of any FHIR resource, complex
//! datatype, or backbone component: a map from field name to populated value.
//! One representation serves every type; the matching [`ResourceSchema`]
//! supplies wire names, order, and constraints.
//!
//! Unknown wire keys met during decode are retained verbatim on the
//! instance's extra-data side channel so newer-than-schema content survives a
//! round trip instead of being dropped.
//!
//! [`ResourceSchema`]: crate::schema::ResourceSchema

use serde_json::{Map, Value};
use std::collections::HashMap;

/// One in-memory resource, datatype, or component value.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_name: String,
    fields: HashMap<String, FieldEntry>,
    extra: Map<String, Value>,
}

/// A populated field on an [`Instance`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    /// Selected alternative for choice groups (the type code), None for
    /// plain fields. A choice field holds exactly one alternative by
    /// construction; the slot is keyed by the group's stem name.
    pub chosen_type: Option<String>,

    /// The value(s).
    pub value: FieldValue,
}

/// Single or repeating field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    One(DataValue),
    /// Repeating field. Insertion order is preserved.
    Many(Vec<DataValue>),
}

/// A leaf scalar or a nested structure.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Primitive leaf, held as its wire JSON value.
    Primitive(Value),
    /// Nested complex type or backbone component.
    Node(Instance),
}

impl Instance {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: HashMap::new(),
            extra: Map::new(),
        }
    }

    /// The schema type name this instance mirrors.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Set a single-valued field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<DataValue>) {
        self.fields.insert(
            name.into(),
            FieldEntry {
                chosen_type: None,
                value: FieldValue::One(value.into()),
            },
        );
    }

    /// Set a choice-group field to one alternative, replacing any previous
    /// alternative. The entry is keyed by the group stem ("value"), not the
    /// wire name ("valueQuantity"), so a group can never hold two
    /// alternatives at once.
    pub fn set_choice(
        &mut self,
        name: impl Into<String>,
        type_code: impl Into<String>,
        value: impl Into<DataValue>,
    ) {
        self.fields.insert(
            name.into(),
            FieldEntry {
                chosen_type: Some(type_code.into()),
                value: FieldValue::One(value.into()),
            },
        );
    }

    /// Append to a repeating field, creating it when absent.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<DataValue>) {
        let entry = self.fields.entry(name.into()).or_insert(FieldEntry {
            chosen_type: None,
            value: FieldValue::Many(Vec::new()),
        });
        let mut items =
            match std::mem::replace(&mut entry.value, FieldValue::Many(Vec::new())) {
                FieldValue::Many(items) => items,
                FieldValue::One(first) => vec![first],
            };
        items.push(value.into());
        entry.value = FieldValue::Many(items);
    }

    /// Get a populated field by its base name.
    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.get(name)
    }

    /// Single value of a field, if populated with exactly one.
    pub fn get_single(&self, name: &str) -> Option<&DataValue> {
        match &self.get(name)?.value {
            FieldValue::One(v) => Some(v),
            FieldValue::Many(items) if items.len() == 1 => items.first(),
            FieldValue::Many(_) => None,
        }
    }

    /// String value of a primitive field, if present.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get_single(name)? {
            DataValue::Primitive(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldEntry> {
        self.fields.remove(name)
    }

    /// Names of populated fields, in no particular order. Encode walks the
    /// schema, not this set, so ordering lives there.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.extra.is_empty()
    }

    /// Unknown wire keys retained from decode, in first-seen order.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    /// Retain an unrecognized wire key verbatim.
    pub fn insert_extra(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
    }
}

impl FieldEntry {
    /// Occurrence count, as the validator sees it.
    pub fn count(&self) -> usize {
        match &self.value {
            FieldValue::One(_) => 1,
            FieldValue::Many(items) => items.len(),
        }
    }

    /// Iterate the value(s) uniformly.
    pub fn values(&self) -> impl Iterator<Item = &DataValue> {
        match &self.value {
            FieldValue::One(v) => std::slice::from_ref(v).iter(),
            FieldValue::Many(items) => items.iter(),
        }
    }
}

impl DataValue {
    pub fn as_primitive(&self) -> Option<&Value> {
        match self {
            Self::Primitive(v) => Some(v),
            Self::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Instance> {
        match self {
            Self::Node(i) => Some(i),
            Self::Primitive(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_primitive().and_then(Value::as_str)
    }
}

impl From<Value> for DataValue {
    fn from(value: Value) -> Self {
        Self::Primitive(value)
    }
}

impl From<Instance> for DataValue {
    fn from(instance: Instance) -> Self {
        Self::Node(instance)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::Primitive(Value::String(value.to_string()))
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Primitive(Value::Bool(value))
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Primitive(Value::Number(value.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_and_get() {
        let mut obs = Instance::new("Observation");
        obs.set("status", "final");
        assert_eq!(obs.get_str("status"), Some("final"));
        assert_eq!(obs.get("status").unwrap().count(), 1);
        assert!(obs.get("code").is_none());
    }

    #[test]
    fn choice_slot_holds_one_alternative() {
        let mut obs = Instance::new("Observation");
        obs.set_choice("value", "string", "5 mg");
        obs.set_choice("value", "boolean", true);

        let entry = obs.get("value").unwrap();
        assert_eq!(entry.chosen_type.as_deref(), Some("boolean"));
        assert_eq!(entry.count(), 1);
    }

    #[test]
    fn push_preserves_order() {
        let mut concept = Instance::new("CodeableConcept");
        let mut first = Instance::new("Coding");
        first.set("code", "a");
        let mut second = Instance::new("Coding");
        second.set("code", "b");
        concept.push("coding", first);
        concept.push("coding", second);

        let entry = concept.get("coding").unwrap();
        let codes: Vec<_> = entry
            .values()
            .map(|v| v.as_node().unwrap().get_str("code").unwrap())
            .collect();
        assert_eq!(codes, vec!["a", "b"]);
    }

    #[test]
    fn extra_keys_round_trip_in_order() {
        let mut obs = Instance::new("Observation");
        obs.insert_extra("zeta", json!({"nested": [1, 2]}));
        obs.insert_extra("alpha", json!("later"));

        let keys: Vec<_> = obs.extra().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn structural_equality() {
        let mut a = Instance::new("Coding");
        a.set("code", "final");
        let mut b = Instance::new("Coding");
        b.set("code", "final");
        assert_eq!(a, b);

        b.set("system", "http://hl7.org/fhir/observation-status");
        assert_ne!(a, b);
    }
}
