//! FHIR R4 schema tables and the generic instance model
//!
//! This crate holds the two data structures the rest of the workspace is
//! driven by:
//!
//! - [`ResourceSchema`] / [`FieldSchema`]: declarative descriptions of a
//!   resource, complex datatype, or backbone component: field wire names,
//!   cardinalities, choice-type alternatives, and value-set bindings.
//!   Schemas are plain serde structs so they load from packaged JSON tables
//!   rather than per-resource generated code.
//! - [`Instance`]: a structural, schema-shaped object graph. One
//!   representation serves every resource type; there is no generated struct
//!   per resource.
//!
//! # Example
//!
//! ```rust
//! use argentum_schema::ResourceSchema;
//! use serde_json::json;
//!
//! let schema: ResourceSchema = serde_json::from_value(json!({
//!     "name": "Coding",
//!     "kind": "complex-type",
//!     "fields": [
//!         { "name": "system", "types": [{ "code": "uri" }] },
//!         { "name": "code", "types": [{ "code": "code" }] }
//!     ]
//! })).unwrap();
//!
//! assert_eq!(schema.name, "Coding");
//! assert!(schema.field("code").is_some());
//! ```

pub mod error;
pub mod instance;
pub mod schema;

pub use error::{Error, Result};
pub use instance::{DataValue, FieldEntry, FieldValue, Instance};
pub use schema::{
    Binding, BindingStrength, FieldSchema, ResourceSchema, SchemaKind, TypeRef, is_primitive,
};
