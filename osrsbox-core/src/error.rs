use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OsrsboxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OsrsboxError>;

/// Why a single field cleaner rejected a raw value.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum CleanError {
    #[error("unrecognized {field} value {value:?}")]
    Unrecognized { field: &'static str, value: String },

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("invalid date {0:?}")]
    InvalidDate(String),

    #[error("invalid drop quantity {0:?}")]
    InvalidQuantity(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("unknown skill {0:?}")]
    UnknownSkill(String),

    #[error("skill level {0} outside 1..=99")]
    LevelOutOfRange(i64),
}

pub type CleanResult<T> = std::result::Result<T, CleanError>;

/// A hard failure for one field of one entity.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("entity {entity_id}: field {field_name:?} rejected raw value {raw_value:?}: {reason}")]
pub struct NormalizationError {
    pub entity_id: i64,
    pub field_name: String,
    pub raw_value: String,
    pub reason: CleanError,
}

impl NormalizationError {
    pub fn new(entity_id: i64, field_name: impl Into<String>, raw_value: &str, reason: CleanError) -> Self {
        Self {
            entity_id,
            field_name: field_name.into(),
            raw_value: raw_value.to_string(),
            reason,
        }
    }
}
