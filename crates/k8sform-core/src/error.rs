//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    #[error("Unexpected import identifier '{id}': expected <namespace>/<name>")]
    InvalidImportId { id: String },

    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
