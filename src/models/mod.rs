//! Core data models for the storage service.
//!
//! These are the decoded forms of catalog rows. They serialize naturally via
//! `serde`; the catalogs own the on-disk row layout.

pub mod bucket;
pub mod object;
