//! Query result models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A dynamically typed column value.
///
/// Serialized untagged, so `Int(1)` is the JSON number `1` and `Null` is
/// `null`; JSON keeps integers, reals, strings, booleans and null apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integers above `i64::MAX`.
    UInt(u64),
    Real(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// One result record: column name to value.
pub type Row = BTreeMap<String, ColumnValue>;
