//! axum handlers. Bucket and object handlers render XML documents; the health
//! probes answer in JSON.

pub mod bucket_handlers;
pub mod health_handlers;
pub mod object_handlers;
pub mod xml;
