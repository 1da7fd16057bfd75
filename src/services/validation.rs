//! Bucket name and object key rules.

use crate::catalog::OBJECT_CATALOG_FILE;
use std::net::IpAddr;

const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Check a bucket name against the S3-style naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - starts and ends with a lowercase letter or digit
/// - no `..` or `--`
/// - not an IP address literal
///
/// Returns the violated rule on failure.
pub fn validate_bucket_name(name: &str) -> Result<(), &'static str> {
    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err("must be between 3 and 63 characters");
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err("allowed characters are lowercase letters, digits, dots, and hyphens");
    }

    let is_edge_char =
        |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !is_edge_char(name.chars().next()) || !is_edge_char(name.chars().last()) {
        return Err("must start and end with a lowercase letter or digit");
    }

    if name.contains("..") || name.contains("--") {
        return Err("cannot contain consecutive dots or consecutive hyphens");
    }

    if name.parse::<IpAddr>().is_ok() {
        return Err("must not be formatted like an IP address");
    }

    Ok(())
}

pub fn is_valid_bucket_name(name: &str) -> bool {
    validate_bucket_name(name).is_ok()
}

/// Object keys are a single path segment inside the bucket directory.
///
/// Rejects anything that could leave the directory or that names the
/// bucket's own catalog file.
pub fn validate_object_key(key: &str) -> Result<(), &'static str> {
    if key.is_empty() {
        return Err("must not be empty");
    }
    if key.len() > MAX_OBJECT_KEY_LEN {
        return Err("must be at most 1024 bytes");
    }
    if key == "." || key.contains("..") {
        return Err("must not contain relative path components");
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\')
    {
        return Err("must not contain slashes or control characters");
    }
    if key == OBJECT_CATALOG_FILE {
        return Err("is reserved for bucket metadata");
    }
    Ok(())
}
