//! Schema walk
//!
//! Checks run in order per field (cardinality, choice exclusivity, code
//! bindings), then descend into nested components with the field path
//! prefixed ("component[1].code"). All problems are accumulated; nothing
//! short-circuits.

use argentum_registry::SchemaRegistry;
use argentum_schema::{
    Binding, BindingStrength, DataValue, FieldEntry, FieldSchema, Instance, ResourceSchema,
    TypeRef,
};

use crate::issue::{IssueCode, ValidationIssue, ValidationOutcome};

/// Reusable validator; shares the registry and carries no per-run state.
pub struct Validator<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Validate a decoded instance. Never fails: every problem, including an
    /// unknown type name, comes back as an issue on the outcome.
    pub fn validate(&self, instance: &Instance) -> ValidationOutcome {
        let mut run = ValidationRun {
            registry: self.registry,
            issues: Vec::new(),
            advisories: Vec::new(),
        };

        match self.registry.resolve(instance.type_name()) {
            Some(schema) => run.check_node(schema, instance, ""),
            None => run.issues.push(ValidationIssue::error(
                IssueCode::NotFound,
                format!("Unknown type: '{}'", instance.type_name()),
            )),
        }

        ValidationOutcome {
            type_name: instance.type_name().to_string(),
            valid: run.issues.is_empty(),
            issues: run.issues,
            advisories: run.advisories,
        }
    }

    pub fn validate_batch(&self, instances: &[Instance]) -> Vec<ValidationOutcome> {
        instances.iter().map(|i| self.validate(i)).collect()
    }
}

/// Short-lived validation execution.
struct ValidationRun<'a> {
    registry: &'a SchemaRegistry,
    issues: Vec<ValidationIssue>,
    advisories: Vec<ValidationIssue>,
}

impl ValidationRun<'_> {
    fn check_node(&mut self, schema: &ResourceSchema, instance: &Instance, prefix: &str) {
        for field in &schema.fields {
            self.check_field(schema, field, instance, prefix);
        }

        // Programmatically constructed instances can carry fields the schema
        // never declared; decode cannot produce these.
        for name in instance.field_names() {
            if schema.field(name).is_none() {
                self.issues.push(
                    ValidationIssue::error(
                        IssueCode::Structure,
                        format!("Field '{}' is not declared on '{}'", name, schema.name),
                    )
                    .with_location(join(prefix, name)),
                );
            }
        }
    }

    fn check_field(
        &mut self,
        schema: &ResourceSchema,
        field: &FieldSchema,
        instance: &Instance,
        prefix: &str,
    ) {
        let entry = instance.get(&field.name);
        let count = entry.map(FieldEntry::count).unwrap_or(0);
        let location = join(prefix, &field.display_name());

        if count < field.min as usize {
            self.issues.push(
                ValidationIssue::error(
                    IssueCode::Required,
                    format!(
                        "Field '{}' has {} occurrence(s), minimum is {}",
                        field.display_name(),
                        count,
                        field.min
                    ),
                )
                .with_location(location.clone()),
            );
        }
        if !field.array && count > 1 {
            self.issues.push(
                ValidationIssue::error(
                    IssueCode::Structure,
                    format!(
                        "Field '{}' has {} occurrences, maximum is 1",
                        field.display_name(),
                        count
                    ),
                )
                .with_location(location.clone()),
            );
        }

        let Some(entry) = entry else {
            return;
        };

        let tref = self.effective_type(schema, field, entry, &location);

        if let (Some(binding), Some(tref)) = (&field.binding, tref) {
            self.check_binding(field, binding, tref, entry, prefix);
        }

        for (idx, value) in entry.values().enumerate() {
            if let DataValue::Node(nested) = value {
                let child_prefix = self.element_path(field, entry, idx, prefix);
                match self.registry.resolve(nested.type_name()) {
                    Some(child_schema) => self.check_node(child_schema, nested, &child_prefix),
                    None => self.issues.push(
                        ValidationIssue::error(
                            IssueCode::NotFound,
                            format!("Unknown type: '{}'", nested.type_name()),
                        )
                        .with_location(child_prefix),
                    ),
                }
            }
        }
    }

    /// Resolve which declared alternative the entry holds, reporting choice
    /// groups in an impossible state.
    fn effective_type<'s>(
        &mut self,
        schema: &ResourceSchema,
        field: &'s FieldSchema,
        entry: &FieldEntry,
        location: &str,
    ) -> Option<&'s TypeRef> {
        if !field.is_choice() {
            return field.types.first();
        }

        match entry.chosen_type.as_deref() {
            Some(code) => match field.type_named(code) {
                Some(tref) => Some(tref),
                None => {
                    self.issues.push(
                        ValidationIssue::error(
                            IssueCode::Structure,
                            format!(
                                "Type '{}' is not an alternative of choice group '{}' on '{}'",
                                code,
                                field.display_name(),
                                schema.name
                            ),
                        )
                        .with_location(location.to_string()),
                    );
                    None
                }
            },
            None => {
                self.issues.push(
                    ValidationIssue::error(
                        IssueCode::Structure,
                        format!(
                            "Choice group '{}' on '{}' has no selected alternative",
                            field.display_name(),
                            schema.name
                        ),
                    )
                    .with_location(location.to_string()),
                );
                None
            }
        }
    }

    fn check_binding(
        &mut self,
        field: &FieldSchema,
        binding: &Binding,
        tref: &TypeRef,
        entry: &FieldEntry,
        prefix: &str,
    ) {
        // Example-strength bindings are purely illustrative.
        if binding.strength == BindingStrength::Example {
            return;
        }

        for (idx, value) in entry.values().enumerate() {
            let location = self.element_path(field, entry, idx, prefix);
            for code in codes_of(tref, value) {
                // Sets missing from the pack cannot be evaluated.
                if self.registry.contains_code(&binding.value_set, &code) != Some(false) {
                    continue;
                }
                let diagnostics = format!(
                    "Code '{}' is not in value set '{}'",
                    code, binding.value_set
                );
                if binding.strength.is_required() {
                    self.issues.push(
                        ValidationIssue::error(IssueCode::CodeInvalid, diagnostics)
                            .with_location(location.clone()),
                    );
                } else {
                    self.advisories.push(
                        ValidationIssue::information(IssueCode::CodeInvalid, diagnostics)
                            .with_location(location.clone()),
                    );
                }
            }
        }
    }

    /// Path of one element of a field: indexed for repeating fields, the
    /// populated wire name for choice groups.
    fn element_path(
        &self,
        field: &FieldSchema,
        entry: &FieldEntry,
        idx: usize,
        prefix: &str,
    ) -> String {
        let name = match entry.chosen_type.as_deref() {
            Some(code) if field.is_choice() => field.wire_name(code),
            _ => field.name.clone(),
        };
        if field.array {
            join(prefix, &format!("{name}[{idx}]"))
        } else {
            join(prefix, &name)
        }
    }
}

/// Codes carried by one value, given its declared type.
fn codes_of(tref: &TypeRef, value: &DataValue) -> Vec<String> {
    match tref.code.as_str() {
        "code" => value.as_str().map(str::to_string).into_iter().collect(),
        "Coding" => coding_code(value).into_iter().collect(),
        "CodeableConcept" => match value.as_node() {
            Some(concept) => concept
                .get("coding")
                .map(|codings| codings.values().filter_map(coding_code).collect())
                .unwrap_or_default(),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn coding_code(value: &DataValue) -> Option<String> {
    value.as_node()?.get_str("code").map(str::to_string)
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_embedded().unwrap()
    }

    #[test]
    fn valid_instance_has_empty_outcome() {
        let registry = registry();
        let mut code = Instance::new("CodeableConcept");
        code.set("text", "Heart rate");
        let mut obs = Instance::new("Observation");
        obs.set("status", "final");
        obs.set("code", code);

        let outcome = Validator::new(&registry).validate(&obs);
        assert!(outcome.valid);
        assert!(outcome.issues.is_empty());
        assert!(outcome.advisories.is_empty());
    }

    #[test]
    fn missing_required_fields_accumulate() {
        let registry = registry();
        let obs = Instance::new("Observation");

        let outcome = Validator::new(&registry).validate(&obs);
        assert!(!outcome.valid);
        let locations: Vec<_> = outcome
            .issues
            .iter()
            .filter_map(|i| i.location.as_deref())
            .collect();
        assert!(locations.contains(&"status"));
        assert!(locations.contains(&"code"));
    }

    #[test]
    fn unknown_root_type_is_reported_not_raised() {
        let registry = registry();
        let bogus = Instance::new("Vehicle");

        let outcome = Validator::new(&registry).validate(&bogus);
        assert!(!outcome.valid);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].code, IssueCode::NotFound);
    }

    #[test]
    fn undeclared_field_is_structural() {
        let registry = registry();
        let mut coding = Instance::new("Coding");
        coding.set("code", "x");
        coding.set("colour", "red");

        let outcome = Validator::new(&registry).validate(&coding);
        assert!(!outcome.valid);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.code == IssueCode::Structure && i.location.as_deref() == Some("colour")));
    }

    #[test]
    fn singular_field_with_many_values_is_structural() {
        let registry = registry();
        let mut obs = Instance::new("Observation");
        obs.set("status", "final");
        let mut code = Instance::new("CodeableConcept");
        code.set("text", "x");
        obs.set("code", code);
        obs.push("subject", {
            let mut r = Instance::new("Reference");
            r.set("reference", "Patient/1");
            r
        });
        obs.push("subject", {
            let mut r = Instance::new("Reference");
            r.set("reference", "Patient/2");
            r
        });

        let outcome = Validator::new(&registry).validate(&obs);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.code == IssueCode::Structure && i.location.as_deref() == Some("subject")));
    }

    #[test]
    fn extensible_binding_lands_on_advisories() {
        let registry = registry();
        let mut reason = Instance::new("CodeableConcept");
        let mut coding = Instance::new("Coding");
        coding.set(
            "system",
            json!("http://terminology.hl7.org/CodeSystem/data-absent-reason"),
        );
        coding.set("code", "made-up-reason");
        reason.push("coding", coding);

        let mut code = Instance::new("CodeableConcept");
        code.set("text", "x");
        let mut obs = Instance::new("Observation");
        obs.set("status", "final");
        obs.set("code", code);
        obs.set("dataAbsentReason", reason);

        let outcome = Validator::new(&registry).validate(&obs);
        assert!(outcome.valid);
        assert_eq!(outcome.advisories.len(), 1);
        assert_eq!(outcome.advisories[0].code, IssueCode::CodeInvalid);
        assert!(outcome.advisories[0].diagnostics.contains("made-up-reason"));
    }
}
