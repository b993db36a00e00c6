//! Read-only schema registry
//!
//! Loads the packaged schema tables and value sets once at startup and serves
//! lookups for the codec and validator. The registry is immutable after
//! construction and `Send + Sync` with no interior mutability, so one
//! instance can back any number of concurrent decode/encode/validate calls.
//!
//! # Example
//!
//! ```rust
//! use argentum_registry::SchemaRegistry;
//!
//! let registry = SchemaRegistry::from_embedded().unwrap();
//! let observation = registry.get("Observation").unwrap();
//! assert!(observation.field("status").is_some());
//!
//! assert_eq!(
//!     registry.contains_code("http://hl7.org/fhir/ValueSet/observation-status", "final"),
//!     Some(true)
//! );
//! ```

pub mod error;
pub mod registry;
pub mod value_set;

pub use error::{Error, Result};
pub use registry::SchemaRegistry;
pub use value_set::CodeSet;
