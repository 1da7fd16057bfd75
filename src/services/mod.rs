//! Business logic: naming rules and the catalog-backed lifecycle operations.

pub mod storage_service;
pub mod validation;
