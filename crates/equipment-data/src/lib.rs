//! Ingestion layer for equipment analytics.
//!
//! Decodes uploaded CSV files into tables, checks them for the required
//! columns, aggregates the rows into a session summary and renders reports.

pub mod aggregator;
pub mod analysis;
pub mod reader;
pub mod report;
pub mod table;
pub mod validator;

pub use equipment_core as core;
