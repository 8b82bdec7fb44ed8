//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use fgk_riskreview::types::{Record, RecordSet};
use serde_json::Value;

/// Build a record set from a JSON array of objects
pub fn records(value: Value) -> RecordSet {
    value
        .as_array()
        .expect("records must be a JSON array")
        .iter()
        .map(record)
        .collect()
}

/// Build a single record from a JSON object
pub fn record(value: &Value) -> Record {
    value
        .as_object()
        .cloned()
        .expect("record must be a JSON object")
}
