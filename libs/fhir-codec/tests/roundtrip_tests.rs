use argentum_codec::{Decoder, Encoder};
use argentum_registry::SchemaRegistry;
use serde_json::{json, Value};

fn registry() -> SchemaRegistry {
    SchemaRegistry::from_embedded().expect("embedded pack must load")
}

fn round_trip(registry: &SchemaRegistry, node: &Value) -> Value {
    let decoder = Decoder::new(registry);
    let encoder = Encoder::new(registry);
    let instance = decoder.decode_resource(node).expect("decode failed");
    encoder.encode(&instance).expect("encode failed")
}

#[test]
fn observation_round_trips_structurally() {
    let registry = registry();
    let node = json!({
        "resourceType": "Observation",
        "id": "blood-pressure",
        "status": "final",
        "category": [{
            "coding": [{
                "system": "http://terminology.hl7.org/CodeSystem/observation-category",
                "code": "vital-signs"
            }]
        }],
        "code": {
            "coding": [{ "system": "http://loinc.org", "code": "85354-9" }],
            "text": "Blood pressure panel"
        },
        "subject": { "reference": "Patient/example" },
        "effectiveDateTime": "2023-04-02T09:30:10+01:00",
        "component": [
            {
                "code": { "coding": [{ "system": "http://loinc.org", "code": "8480-6" }] },
                "valueQuantity": { "value": 120, "unit": "mmHg" }
            },
            {
                "code": { "coding": [{ "system": "http://loinc.org", "code": "8462-4" }] },
                "valueQuantity": { "value": 80, "unit": "mmHg" }
            }
        ]
    });

    assert_eq!(round_trip(&registry, &node), node);
}

#[test]
fn decode_of_encode_is_identity() {
    let registry = registry();
    let node = json!({
        "resourceType": "RiskAssessment",
        "status": "final",
        "subject": { "reference": "Patient/example" },
        "occurrenceDateTime": "2023-01-10",
        "prediction": [{
            "outcome": { "text": "Heart attack" },
            "probabilityDecimal": 0.02,
            "whenRange": {
                "low": { "value": 50, "unit": "years" },
                "high": { "value": 60, "unit": "years" }
            }
        }]
    });

    let decoder = Decoder::new(&registry);
    let encoder = Encoder::new(&registry);

    let first = decoder.decode_resource(&node).unwrap();
    let encoded = encoder.encode(&first).unwrap();
    let second = decoder.decode_resource(&encoded).unwrap();
    assert_eq!(first, second);
}

#[test]
fn unknown_key_preserved_byte_for_byte() {
    let registry = registry();
    let node = json!({
        "resourceType": "Observation",
        "status": "final",
        "code": { "text": "x" },
        "deviceFirmware": {
            "zeta": [3, 2, 1],
            "alpha": { "deeply": { "nested": true } }
        }
    });

    let result = round_trip(&registry, &node);
    assert_eq!(
        serde_json::to_string(&result["deviceFirmware"]).unwrap(),
        serde_json::to_string(&node["deviceFirmware"]).unwrap()
    );
}

#[test]
fn primitive_companions_survive_as_retained_keys() {
    let registry = registry();
    let node = json!({
        "resourceType": "Observation",
        "status": "final",
        "code": { "text": "x" },
        "_status": { "id": "s1" }
    });

    let result = round_trip(&registry, &node);
    assert_eq!(result["_status"], json!({ "id": "s1" }));
}

#[test]
fn value_set_resource_round_trips() {
    let registry = registry();
    let node = json!({
        "resourceType": "ValueSet",
        "url": "http://example.org/fhir/ValueSet/colours",
        "status": "active",
        "compose": {
            "include": [{
                "system": "http://example.org/colours",
                "concept": [
                    { "code": "red" },
                    { "code": "green", "display": "Green" }
                ]
            }]
        }
    });

    assert_eq!(round_trip(&registry, &node), node);
}

#[test]
fn contained_resource_round_trips() {
    let registry = registry();
    let node = json!({
        "resourceType": "RiskAssessment",
        "status": "final",
        "subject": { "reference": "#obs" },
        "contained": [{
            "resourceType": "Observation",
            "id": "obs",
            "status": "final",
            "code": { "text": "BMI" },
            "valueQuantity": { "value": 31, "unit": "kg/m2" }
        }]
    });

    assert_eq!(round_trip(&registry, &node), node);
}

#[test]
fn xml_pipeline_matches_json_pipeline() {
    let registry = registry();
    let decoder = Decoder::new(&registry);
    let encoder = Encoder::new(&registry);

    let json_node = json!({
        "resourceType": "Observation",
        "status": "final",
        "code": { "text": "Heart rate" },
        "valueQuantity": { "value": 72, "unit": "beats/minute" }
    });
    let from_json = decoder.decode_resource(&json_node).unwrap();

    let xml = encoder.encode_xml(&from_json).unwrap();
    let from_xml = decoder.decode_xml(&xml).unwrap();

    assert_eq!(from_json, from_xml);
}

#[test]
fn questionnaire_nested_items_round_trip() {
    let registry = registry();
    let node = json!({
        "resourceType": "Questionnaire",
        "status": "draft",
        "item": [{
            "linkId": "1",
            "type": "group",
            "text": "General",
            "item": [{
                "linkId": "1.1",
                "type": "choice",
                "text": "Smoking status",
                "enableWhen": [{
                    "question": "0",
                    "operator": "=",
                    "answerBoolean": true
                }],
                "answerOption": [
                    { "valueString": "Never smoker" },
                    { "valueString": "Current smoker" }
                ]
            }]
        }]
    });

    assert_eq!(round_trip(&registry, &node), node);
}
