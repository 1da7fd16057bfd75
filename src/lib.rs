//! Minimal S3-style object storage over HTTP.
//!
//! Buckets are directories under a storage root and objects are files inside
//! them. Their metadata is kept in flat CSV catalogs: `buckets.csv` at the
//! root and `objects.csv` in every bucket.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
