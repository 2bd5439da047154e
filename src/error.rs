//! Error types for the master data store

use thiserror::Error;

/// Result type for master data operations
pub type Result<T> = std::result::Result<T, MasterDataError>;

/// Master data store errors
#[derive(Error, Debug)]
pub enum MasterDataError {
    #[error("The type '{name}' already exists.")]
    DuplicateTypeName { name: String },

    #[error(
        "The type '{name}' already exists but is currently INACTIVE. \
         Reactivate it instead of creating a duplicate."
    )]
    InactiveTypeNameConflict { name: String },

    #[error("You must define at least one attribute when creating a new type.")]
    EmptySchemaOnCreate,

    #[error("Invalid type name: {reason}")]
    InvalidTypeName { reason: String },

    #[error("Schema declares the field '{name}' more than once.")]
    DuplicateFieldRule { name: String },

    #[error("Attribute '{field}' is mandatory.")]
    MandatoryFieldMissing { field: String },

    #[error("Attribute '{field}': Must be an integer.")]
    TypeCoercionFailure { field: String },

    #[error("Attributes must be a valid JSON object.")]
    MalformedAttributes,

    #[error("Type not found: {id}")]
    TypeNotFound { id: u64 },

    #[error("Record not found: {id}")]
    RecordNotFound { id: u64 },

    #[error("Snapshot checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Invalid snapshot format: {0}")]
    InvalidSnapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MasterDataError {
    /// Whether this error is a user-facing validation failure, as opposed
    /// to an infrastructure fault.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            MasterDataError::Io(_)
                | MasterDataError::Json(_)
                | MasterDataError::ChecksumMismatch { .. }
                | MasterDataError::InvalidSnapshot(_)
        )
    }
}
