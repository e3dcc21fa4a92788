//! Template engine: declarative line rules that parse device text into
//! records and render records back into device text.
//!
//! # Example
//!
//! ```rust
//! use comware_cli::template::{manuinfo, parse};
//!
//! let records = parse(&manuinfo::RULES, ["DEVICE_NAME : SW-CORE-01"]);
//! assert_eq!(records[0]["device_name"], "SW-CORE-01");
//! ```

pub mod argspec;
mod engine;
pub mod interfaces;
pub mod local_users;
pub mod manuinfo;
mod rule;

pub use argspec::{ArgumentSpec, FieldSpec, FieldType, remove_empties, validate};
pub use engine::{RecordKey, parse, render};
pub use rule::{Extractor, PatternRule, Renderer, RuleSet};

/// A parsed record: field name to value, in insertion order.
pub type Record = serde_json::Map<String, serde_json::Value>;
