//! Cache Entry Model
//!
//! A tagged entry over three value shapes (scalar / list / dict) carrying an
//! absolute expiry instant.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{
    Result, DICT_KEY_MISSING, INDEX_OUT_OF_RANGE, INVALID_INDEX, NOT_DICT, NOT_LIST, NOT_SCALAR,
};

// == Value ==
/// The variant-tagged payload of an entry.
///
/// List and dict payloads may be absent (null): an empty PUT body stores a
/// null collection, and the distinction survives snapshot round trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(String),
    List(Option<Vec<String>>),
    Dict(Option<HashMap<String, String>>),
}

// == Entry ==
/// A stored value under a single key: exactly one variant plus an absolute
/// expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    expiry: DateTime<Utc>,
    value: Value,
}

impl Entry {
    // == Constructors ==
    /// Creates a scalar entry expiring at `expiry`.
    pub fn scalar(value: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            expiry,
            value: Value::Scalar(value.into()),
        }
    }

    /// Creates a list entry expiring at `expiry`.
    pub fn list(items: Option<Vec<String>>, expiry: DateTime<Utc>) -> Self {
        Self {
            expiry,
            value: Value::List(items),
        }
    }

    /// Creates a dict entry expiring at `expiry`.
    pub fn dict(entries: Option<HashMap<String, String>>, expiry: DateTime<Utc>) -> Self {
        Self {
            expiry,
            value: Value::Dict(entries),
        }
    }

    /// Reassembles an entry from its snapshot parts.
    pub fn from_parts(value: Value, expiry: DateTime<Utc>) -> Self {
        Self { expiry, value }
    }

    /// The absolute expiry instant.
    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// The variant-tagged payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    // == Expiry ==
    /// Whether the entry is expired at `now`. The boundary counts as
    /// expired: an entry whose expiry equals `now` is already gone.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }

    // == Accessors ==
    /// The scalar value, or `NotScalar` for any other variant.
    pub fn as_scalar(&self) -> Result<&str> {
        match &self.value {
            Value::Scalar(value) => Ok(value),
            _ => Err(NOT_SCALAR),
        }
    }

    /// The list element at `index`.
    ///
    /// The variant check comes first: a non-list entry is `NotList` even if
    /// the index would be valid elsewhere. On a list, a negative index is
    /// `InvalidIndex` and an index past the end (any index, for a null or
    /// empty list) is `IndexOutOfRange`.
    pub fn as_list(&self, index: i64) -> Result<&str> {
        let items = match &self.value {
            Value::List(items) => items,
            _ => return Err(NOT_LIST),
        };
        if index < 0 {
            return Err(INVALID_INDEX);
        }
        items
            .as_deref()
            .and_then(|items| items.get(index as usize))
            .map(String::as_str)
            .ok_or(INDEX_OUT_OF_RANGE)
    }

    /// The dict element under `dkey`. A missing key and a null dict both
    /// surface `DictKeyMissing`.
    pub fn as_dict(&self, dkey: &str) -> Result<&str> {
        let entries = match &self.value {
            Value::Dict(entries) => entries,
            _ => return Err(NOT_DICT),
        };
        entries
            .as_ref()
            .and_then(|entries| entries.get(dkey))
            .map(String::as_str)
            .ok_or(DICT_KEY_MISSING)
    }
}
