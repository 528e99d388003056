//! Domain error type shared by repositories and services
//!
//! Every service operation returns `Result<T, ServiceError>`. The API crate
//! maps each variant onto an HTTP status; nothing here knows about HTTP.
//!
//! # Example
//!
//! ```
//! use foodgram_shared::error::ServiceError;
//!
//! let err = ServiceError::validation("tags", "At least one tag is required");
//! assert_eq!(err.to_string(), "tags: At least one tag is required");
//! ```

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for check_violation
const CHECK_VIOLATION: &str = "23514";

/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Bad, missing or duplicate input
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Uniqueness violation (duplicate favorite, follow, ...)
    #[error("{0}")]
    Conflict(String),

    /// A referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// The caller is authenticated but may not touch the resource
    #[error("{0}")]
    Forbidden(String),

    /// Image store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Any other database failure, including a transaction that cannot commit
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("unique constraint");
                    return ServiceError::Conflict(format!("Already exists ({constraint})"));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return ServiceError::NotFound("Referenced object does not exist".to_string());
                }
                Some(CHECK_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("check constraint");
                    return ServiceError::validation(
                        "non_field_errors",
                        format!("Constraint {constraint} violated"),
                    );
                }
                _ => {}
            }
        }

        ServiceError::Database(err)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Storage(err.to_string())
    }
}
