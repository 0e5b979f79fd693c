use std::path::PathBuf;
use thiserror::Error;

use crate::models::{SessionId, UserId};

/// All errors produced by the equipment analytics crates.
#[derive(Error, Debug)]
pub enum EquipmentError {
    /// One or more of the required columns is absent from the header row.
    #[error("Missing required columns: {}", .required.join(", "))]
    Schema {
        /// The full required-column list, in canonical order.
        required: Vec<String>,
        /// The subset of `required` that was not found.
        missing: Vec<String>,
    },

    /// A row could not be turned into an equipment record.
    ///
    /// `row` is the 1-based data row (the header is not counted).
    #[error("{}", describe_ingestion(.row, .column, .reason))]
    Ingestion {
        row: Option<usize>,
        column: Option<String>,
        reason: String,
    },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing CSV output failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// No registered user matches the given name or id.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The username is already taken.
    #[error("Username already exists: {0}")]
    DuplicateUser(String),

    /// The username is empty or contains disallowed characters.
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// The session does not exist or belongs to someone else.
    #[error("Session {session} not found for user {user}")]
    SessionNotFound { user: UserId, session: SessionId },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EquipmentError {
    /// Build a [`EquipmentError::Ingestion`] for a single offending cell.
    pub fn cell(row: usize, column: &str, reason: impl Into<String>) -> Self {
        Self::Ingestion {
            row: Some(row),
            column: Some(column.to_string()),
            reason: reason.into(),
        }
    }

    /// Build a [`EquipmentError::Ingestion`] for a whole malformed row.
    pub fn row(row: usize, reason: impl Into<String>) -> Self {
        Self::Ingestion {
            row: Some(row),
            column: None,
            reason: reason.into(),
        }
    }

    /// `true` for the two failure classes that reject an upload outright.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Schema { .. } | Self::Ingestion { .. })
    }
}

fn describe_ingestion(row: &Option<usize>, column: &Option<String>, reason: &str) -> String {
    match (row, column) {
        (Some(row), Some(column)) => format!("Row {row}, column '{column}': {reason}"),
        (Some(row), None) => format!("Row {row}: {reason}"),
        (None, Some(column)) => format!("Column '{column}': {reason}"),
        (None, None) => format!("Ingestion failed: {reason}"),
    }
}

/// Convenience alias used throughout the equipment crates.
pub type Result<T> = std::result::Result<T, EquipmentError>;
