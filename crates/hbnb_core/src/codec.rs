//! Value codec between in-memory model state and JSON-safe storage form.
//!
//! # Responsibility
//! - Own the canonical timestamp text encoding used by the backing file.
//! - Keep model and storage code from formatting timestamps by hand.
//!
//! # Invariants
//! - `encode_timestamp` always emits six fractional digits.
//! - `decode_timestamp` accepts exactly what `encode_timestamp` emits.
//! - Timestamps captured through `now()` carry microsecond precision only, so
//!   encode/decode round-trips are lossless.

use chrono::{NaiveDate, NaiveDateTime, SubsecRound, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// `chrono` format string of the canonical timestamp encoding.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

static TIMESTAMP_SHAPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{6}$").expect("valid timestamp regex")
});

/// Last instant whose encoding still has a four-digit year.
pub static MAX_TIMESTAMP: Lazy<NaiveDateTime> = Lazy::new(|| {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_micro_opt(23, 59, 59, 999_999))
        .expect("valid maximum timestamp")
});

pub type CodecResult<T> = Result<T, CodecError>;

/// Decode failure for stored values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Stored timestamp does not match `YYYY-MM-DDTHH:MM:SS.ffffff`.
    MalformedTimestamp { value: String },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedTimestamp { value } => write!(
                f,
                "malformed timestamp `{value}`; expected YYYY-MM-DDTHH:MM:SS.ffffff"
            ),
        }
    }
}

impl Error for CodecError {}

/// Returns the current UTC instant truncated to microseconds.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// Renders a timestamp in the canonical storage encoding.
pub fn encode_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp from the canonical storage encoding.
///
/// # Errors
/// - `CodecError::MalformedTimestamp` for any other shape, including ISO
///   strings without a fractional part or with a timezone suffix.
pub fn decode_timestamp(value: &str) -> CodecResult<NaiveDateTime> {
    if !TIMESTAMP_SHAPE_RE.is_match(value) {
        return Err(malformed(value));
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| malformed(value))
}

/// Parses a timestamp from a JSON value; non-string values are malformed.
pub fn decode_timestamp_value(value: &Value) -> CodecResult<NaiveDateTime> {
    match value {
        Value::String(text) => decode_timestamp(text),
        other => Err(malformed(&other.to_string())),
    }
}

fn malformed(value: &str) -> CodecError {
    CodecError::MalformedTimestamp {
        value: value.to_string(),
    }
}
