//! Value-set tables
//!
//! The terminology table ships as a list of pared-down ValueSet resources
//! (url, compose.include.concept). The registry flattens each into a
//! [`CodeSet`] for membership checks.

use serde::Deserialize;
use std::collections::HashSet;

/// Wire shape of one entry in the terminology table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValueSetDef {
    pub url: String,

    #[serde(default)]
    pub name: Option<String>,

    pub compose: Compose,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Compose {
    pub include: Vec<Include>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Include {
    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub concept: Vec<Concept>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Concept {
    pub code: String,

    #[serde(default)]
    #[allow(dead_code)]
    pub display: Option<String>,
}

/// Flattened, lookup-ready code set.
#[derive(Debug, Clone)]
pub struct CodeSet {
    url: String,
    name: Option<String>,
    codes: HashSet<String>,
}

impl CodeSet {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl From<ValueSetDef> for CodeSet {
    fn from(def: ValueSetDef) -> Self {
        let codes = def
            .compose
            .include
            .into_iter()
            .flat_map(|inc| inc.concept)
            .map(|c| c.code)
            .collect();
        Self {
            url: def.url,
            name: def.name,
            codes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_all_includes() {
        let def: ValueSetDef = serde_json::from_str(
            r#"{
                "url": "http://example.org/fhir/ValueSet/sample",
                "name": "Sample",
                "compose": {
                    "include": [
                        { "system": "http://example.org/a", "concept": [{ "code": "x" }] },
                        { "system": "http://example.org/b", "concept": [{ "code": "y", "display": "Y" }] }
                    ]
                }
            }"#,
        )
        .unwrap();

        let set = CodeSet::from(def);
        assert_eq!(set.len(), 2);
        assert!(set.contains("x"));
        assert!(set.contains("y"));
        assert!(!set.contains("z"));
    }
}
