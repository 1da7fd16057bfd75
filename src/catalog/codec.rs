//! Field codec for catalog rows.
//!
//! Catalog fields that may carry arbitrary text (names, keys, timestamps) are
//! stored as standard, padded base64 so they never collide with the CSV
//! delimiter or quoting rules. Encoding is applied per field; each catalog
//! decides which of its columns go through here.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("field is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("field does not decode to UTF-8 text: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("field is not an RFC 3339 timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// Encode a text field into its stored form.
pub fn encode(value: &str) -> String {
    general_purpose::STANDARD.encode(value)
}

/// Decode a stored field back into text.
pub fn decode(stored: &str) -> Result<String, DecodeError> {
    let bytes = general_purpose::STANDARD.decode(stored)?;
    Ok(String::from_utf8(bytes)?)
}

/// RFC 3339 text used for every timestamp the service reports or stores.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    encode(&format_timestamp(ts))
}

pub fn decode_timestamp(stored: &str) -> Result<DateTime<Utc>, DecodeError> {
    let text = decode(stored)?;
    Ok(DateTime::parse_from_rfc3339(&text)?.with_timezone(&Utc))
}
