//! Shared domain types for the equipment analytics workspace.
//!
//! Holds the session and equipment models, the error taxonomy, CLI settings
//! and the small formatting and timezone helpers used for display.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{EquipmentError, Result};
