//! Store Error Taxonomy
//!
//! Typed errors carrying a numeric code, a short kind string and an optional
//! detail. Equality compares code and kind only, so a detailed or wrapped
//! error is still recognised as its base kind by callers.

use std::fmt;

// == Store Error ==
/// A store error with a stable code, a kind string and optional detail.
///
/// Codes are grouped by decade: 1-9 construction, 10-19 variant mismatch,
/// 20-29 absence, 30-39 argument validation, 40-49 sweeper lifecycle,
/// 50-59 dumper lifecycle, 60-69 snapshot I/O.
#[derive(Debug, Clone, Eq)]
pub struct StoreError {
    /// Stable numeric code
    pub code: u16,
    /// Short kind string
    pub kind: &'static str,
    /// Optional detail, attached by `detailed` or `caused_by`
    pub detail: Option<String>,
}

impl StoreError {
    const fn new(code: u16, kind: &'static str) -> Self {
        Self {
            code,
            kind,
            detail: None,
        }
    }

    // == Detail Chaining ==
    /// Returns a copy of this error with the given detail attached.
    /// The original is left untouched.
    pub fn detailed(&self, detail: impl Into<String>) -> StoreError {
        StoreError {
            detail: Some(detail.into()),
            ..self.clone()
        }
    }

    /// Returns a copy of this error carrying the display of an underlying
    /// error as detail.
    pub fn caused_by(&self, cause: &dyn fmt::Display) -> StoreError {
        self.detailed(cause.to_string())
    }
}

// Equality by code and kind; detail is informational only.
impl PartialEq for StoreError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.kind == other.kind
    }
}

impl std::hash::Hash for StoreError {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.kind, detail),
            None => f.write_str(self.kind),
        }
    }
}

impl std::error::Error for StoreError {}

// == Error Constants ==

// construction errors
pub const INVALID_PARAMS: StoreError = StoreError::new(1, "invalid params");

// variant mismatch errors
pub const NOT_SCALAR: StoreError = StoreError::new(10, "not a scalar entry");
pub const NOT_LIST: StoreError = StoreError::new(11, "not a list entry");
pub const NOT_DICT: StoreError = StoreError::new(12, "not a dict entry");

// absence errors
pub const KEY_MISSING: StoreError = StoreError::new(20, "key missing");
pub const INDEX_OUT_OF_RANGE: StoreError = StoreError::new(21, "list index out of range");
pub const DICT_KEY_MISSING: StoreError = StoreError::new(22, "dict key missing");

// argument validation errors
pub const INVALID_INDEX: StoreError = StoreError::new(30, "invalid list index");

// sweeper lifecycle errors
pub const SWEEP_CREATE: StoreError = StoreError::new(40, "failed to create sweeper");
pub const SWEEP_START: StoreError = StoreError::new(41, "failed to start sweeper");
pub const SWEEP_NOT_STARTED: StoreError = StoreError::new(42, "sweeper not started yet");
pub const SWEEP_STOP: StoreError = StoreError::new(43, "failed to stop sweeper");

// dumper lifecycle errors
pub const DUMP_CREATE: StoreError = StoreError::new(50, "failed to create dumper");
pub const DUMP_START: StoreError = StoreError::new(51, "failed to start dumper");
pub const DUMP_NOT_STARTED: StoreError = StoreError::new(52, "dumper not started yet");
pub const DUMP_STOP: StoreError = StoreError::new(53, "failed to stop dumper");

// snapshot I/O errors
pub const OPEN_DUMP_FILE: StoreError = StoreError::new(60, "failed to open dump file");
pub const ENCODE_ENTRIES: StoreError = StoreError::new(61, "failed to encode entries");
pub const DECODE_DUMP_FILE: StoreError = StoreError::new(62, "failed to decode dump file");
pub const CLOSE_DUMP_FILE: StoreError = StoreError::new(63, "failed to close dump file");

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
