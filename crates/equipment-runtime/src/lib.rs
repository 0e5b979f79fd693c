//! Runtime layer for equipment analytics.
//!
//! Owns the persistent store of users and upload sessions and the upload
//! service that ties ingestion, persistence and history together.

pub mod file_store;
pub mod history;
pub mod store;
pub mod upload;

pub use equipment_core as core;
pub use equipment_data as data;
