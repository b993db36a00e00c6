//! FHIR XML wire format.
//!
//! Parses FHIR XML into the same generic tree shape (`serde_json::Value`)
//! that JSON input produces, and writes such a tree back out as XML, so the
//! schema-driven codec never has to care which syntax the bytes arrived in.
//! The mapping follows the official HL7 FHIR rules:
//! - Root element uses the `resourceType` name.
//! - Primitive values are encoded with the `value` attribute.
//! - Primitive metadata (`id`, `extension`) is carried through `_field` entries.
//! - Arrays are represented by repeated elements and aligned metadata arrays.
//! - XHTML narrative is passed through verbatim.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::Document;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;

const FHIR_NS: &str = "http://hl7.org/fhir";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("expected a JSON object for the resource")]
    ExpectedObject,
    #[error("missing resourceType property")]
    MissingResourceType,
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::Error),
}

/// Parse a FHIR XML document into a generic wire tree.
///
/// The result carries a `resourceType` key and is shaped exactly like the
/// parsed JSON form of the same resource.
pub fn parse_xml(input: &str) -> Result<Value, FormatError> {
    let doc = Document::parse(input)?;
    let root = doc.root_element();

    let mut map = Map::new();
    map.insert(
        "resourceType".to_string(),
        Value::String(root.tag_name().name().to_string()),
    );

    let mut properties = Map::new();
    for child in root.children().filter(|n| n.is_element()) {
        read_child(input, &mut properties, &child)?;
    }

    map.extend(properties);
    Ok(Value::Object(map))
}

/// Write a generic wire tree as a FHIR XML document.
pub fn write_xml(node: &Value) -> Result<String, FormatError> {
    let obj = node.as_object().ok_or(FormatError::ExpectedObject)?;
    let resource_type = obj
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or(FormatError::MissingResourceType)?;

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    let mut root = BytesStart::new(resource_type);
    root.push_attribute(("xmlns", FHIR_NS));
    writer.write_event(Event::Start(root))?;

    let companions = collect_companions(obj);
    for (key, value) in obj {
        if key == "resourceType" || key.starts_with('_') {
            continue;
        }
        emit_property(&mut writer, key, value, companions.get(key.as_str()))?;
    }

    // Metadata entries with no corresponding value field still carry
    // extensions and must be written as value-less primitives.
    for (&key, meta) in &companions {
        if !obj.contains_key(key) {
            emit_property(&mut writer, key, &Value::Null, Some(meta))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new(resource_type)))?;
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn collect_companions<'a>(obj: &'a Map<String, Value>) -> HashMap<&'a str, &'a Value> {
    obj.iter()
        .filter_map(|(k, v)| k.strip_prefix('_').map(|stem| (stem, v)))
        .collect()
}

fn emit_property(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    value: &Value,
    companion: Option<&&Value>,
) -> Result<(), FormatError> {
    match value {
        Value::Array(items) => {
            let companion_array = companion.and_then(|m| m.as_array());
            for (idx, item) in items.iter().enumerate() {
                let item_companion = companion_array.and_then(|m| m.get(idx));
                emit_property(writer, name, item, item_companion.as_ref())?;
            }
        }
        Value::Object(obj) => emit_object(writer, name, obj)?,
        Value::Null => {
            if companion.is_some() {
                emit_primitive(writer, name, value, companion)?;
            }
        }
        _ => emit_primitive(writer, name, value, companion)?,
    }
    Ok(())
}

fn emit_object(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    obj: &Map<String, Value>,
) -> Result<(), FormatError> {
    let mut start = BytesStart::new(name);
    if let Some(Value::String(id)) = obj.get("id") {
        start.push_attribute(("id", id.as_str()));
    }
    writer.write_event(Event::Start(start))?;

    let companions = collect_companions(obj);
    for (key, value) in obj {
        if key == "id" || key.starts_with('_') {
            continue;
        }
        emit_property(writer, key, value, companions.get(key.as_str()))?;
    }
    for (&key, meta) in &companions {
        if !obj.contains_key(key) {
            emit_property(writer, key, &Value::Null, Some(meta))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn emit_primitive(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    value: &Value,
    companion: Option<&&Value>,
) -> Result<(), FormatError> {
    // Narrative content is already XML and is passed through verbatim.
    if let Value::String(text) = value {
        if name == "div" && text.trim_start().starts_with('<') {
            writer.write_event(Event::Text(BytesText::from_escaped(text.as_str())))?;
            return Ok(());
        }
    }

    let mut elem = BytesStart::new(name);
    let has_value = !value.is_null();
    if has_value {
        elem.push_attribute(("value", scalar_text(value).as_str()));
    }

    let mut extension = None;
    if let Some(Value::Object(meta)) = companion.copied() {
        if let Some(Value::String(id)) = meta.get("id") {
            elem.push_attribute(("id", id.as_str()));
        }
        extension = meta.get("extension");
    }

    match extension {
        Some(ext) => {
            writer.write_event(Event::Start(elem.clone()))?;
            emit_property(writer, "extension", ext, None)?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        None if has_value => {
            writer.write_event(Event::Empty(elem))?;
        }
        None => {}
    }
    Ok(())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn read_child(
    source: &str,
    target: &mut Map<String, Value>,
    node: &roxmltree::Node,
) -> Result<(), FormatError> {
    let name = node.tag_name().name().to_string();
    let (value, meta) = element_value(source, node)?;
    merge_property(target, &name, value, meta);
    Ok(())
}

fn element_value(
    source: &str,
    node: &roxmltree::Node,
) -> Result<(Value, Option<Value>), FormatError> {
    if node.tag_name().namespace().is_some_and(|ns| ns == XHTML_NS) {
        let snippet = &source[node.range()];
        return Ok((Value::String(snippet.to_string()), None));
    }

    // Primitive element: value attribute, optional id/extension metadata.
    if let Some(raw) = node.attribute("value") {
        let mut meta = Map::new();
        if let Some(id) = node.attribute("id") {
            meta.insert("id".to_string(), Value::String(id.to_string()));
        }
        let extensions: Vec<Value> = node
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == "extension")
            .map(|c| element_value(source, &c).map(|(v, _)| v))
            .collect::<Result<_, _>>()?;
        if !extensions.is_empty() {
            meta.insert("extension".to_string(), Value::Array(extensions));
        }

        let meta = (!meta.is_empty()).then_some(Value::Object(meta));
        return Ok((scalar_value(raw), meta));
    }

    // Complex element: children become properties, the id attribute a field.
    let mut obj = Map::new();
    if let Some(id) = node.attribute("id") {
        obj.insert("id".to_string(), Value::String(id.to_string()));
    }
    for child in node.children().filter(|c| c.is_element()) {
        read_child(source, &mut obj, &child)?;
    }
    Ok((Value::Object(obj), None))
}

/// Insert a property read from XML, turning repeated elements into arrays
/// and keeping `_field` metadata arrays aligned with their value arrays.
fn merge_property(map: &mut Map<String, Value>, name: &str, value: Value, meta: Option<Value>) {
    match map.entry(name.to_string()) {
        serde_json::map::Entry::Vacant(slot) => {
            slot.insert(value);
        }
        serde_json::map::Entry::Occupied(mut slot) => match slot.get_mut() {
            Value::Array(items) => items.push(value),
            existing => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        },
    }

    let meta_key = format!("_{name}");
    if meta.is_none() && !map.contains_key(&meta_key) {
        return;
    }

    let value_count = match map.get(name) {
        Some(Value::Array(items)) => items.len(),
        Some(_) => 1,
        None => 0,
    };
    let value_is_array = value_count > 1 || matches!(map.get(name), Some(Value::Array(_)));

    match map.entry(meta_key) {
        serde_json::map::Entry::Vacant(slot) => {
            if let Some(m) = meta {
                if value_is_array {
                    let mut items = vec![Value::Null; value_count.saturating_sub(1)];
                    items.push(m);
                    slot.insert(Value::Array(items));
                } else {
                    slot.insert(m);
                }
            }
        }
        serde_json::map::Entry::Occupied(mut slot) => match slot.get_mut() {
            Value::Array(items) => {
                if items.len() + 1 < value_count {
                    items.resize(value_count - 1, Value::Null);
                }
                items.push(meta.unwrap_or(Value::Null));
            }
            existing => {
                if value_is_array {
                    let first = existing.take();
                    let mut items = vec![first];
                    if value_count > 1 {
                        items.resize(value_count - 1, Value::Null);
                    }
                    items.push(meta.unwrap_or(Value::Null));
                    *existing = Value::Array(items);
                } else if let Some(m) = meta {
                    *existing = m;
                }
            }
        },
    }
}

fn scalar_value(input: &str) -> Value {
    match input {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match input.parse::<i64>() {
            Ok(int) => Value::Number(int.into()),
            Err(_) => Value::String(input.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_basic_observation() {
        let node = json!({
            "resourceType": "Observation",
            "id": "obs-1",
            "status": "final",
            "valueQuantity": { "value": 72, "unit": "beats/minute" }
        });

        let xml = write_xml(&node).expect("conversion failed");
        assert!(xml.contains("<Observation"));
        assert!(xml.contains(r#"<id value="obs-1"/>"#));
        assert!(xml.contains(r#"<status value="final"/>"#));
        assert!(xml.contains(r#"<value value="72"/>"#));
        assert!(xml.contains(r#"<unit value="beats/minute"/>"#));
    }

    #[test]
    fn parse_repeated_elements_into_arrays() {
        let xml = r#"
        <Observation xmlns="http://hl7.org/fhir">
            <status value="final"/>
            <category>
                <coding>
                    <code value="vital-signs"/>
                </coding>
            </category>
            <performer>
                <reference value="Practitioner/a"/>
            </performer>
            <performer>
                <reference value="Practitioner/b"/>
            </performer>
        </Observation>
        "#;

        let node = parse_xml(xml).expect("xml parse failed");
        assert_eq!(node["resourceType"], "Observation");
        assert_eq!(node["status"], "final");
        assert!(node["category"].is_object());
        let performers = node["performer"].as_array().expect("repeated => array");
        assert_eq!(performers.len(), 2);
        assert_eq!(performers[1]["reference"], "Practitioner/b");
    }

    #[test]
    fn primitive_metadata_survives_round_trip() {
        let node = json!({
            "resourceType": "Observation",
            "status": "final",
            "issued": "2023-04-01T10:30:00Z",
            "_issued": { "id": "iss1" }
        });

        let xml = write_xml(&node).unwrap();
        assert!(xml.contains(r#"value="2023-04-01T10:30:00Z""#));
        assert!(xml.contains(r#"id="iss1""#));

        let back = parse_xml(&xml).unwrap();
        assert_eq!(back["issued"], "2023-04-01T10:30:00Z");
        assert_eq!(back["_issued"]["id"], "iss1");
    }

    #[test]
    fn xhtml_narrative_passes_through() {
        let xml = r#"
        <Observation xmlns="http://hl7.org/fhir">
            <text>
                <status value="generated"/>
                <div xmlns="http://www.w3.org/1999/xhtml"><p>Heart rate 72</p></div>
            </text>
            <status value="final"/>
        </Observation>
        "#;

        let node = parse_xml(xml).unwrap();
        let div = node["text"]["div"].as_str().unwrap();
        assert!(div.starts_with("<div"));
        assert!(div.contains("Heart rate 72"));

        let rewritten = write_xml(&node).unwrap();
        assert!(rewritten.contains("<p>Heart rate 72</p>"));
    }

    #[test]
    fn value_less_primitive_with_extension() {
        let node = json!({
            "resourceType": "Observation",
            "status": "final",
            "_valueString": {
                "extension": [{
                    "url": "http://hl7.org/fhir/StructureDefinition/data-absent-reason",
                    "valueCode": "unknown"
                }]
            }
        });

        let xml = write_xml(&node).unwrap();
        assert!(xml.contains("<valueString>"));
        assert!(xml.contains(r#"<valueCode value="unknown"/>"#));
    }
}
