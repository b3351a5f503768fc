use table_gateway::GatewayError;
use thiserror::Error;
use validator::ValidationErrors;

/// Errors returned by the domain services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The record exists but belongs to another tenant.
    #[error("{entity} {id} is not accessible")]
    AccessDenied { entity: &'static str, id: String },

    /// The actor's role on the record does not allow the change.
    #[error("not permitted: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("share link {id} is {reason}")]
    LinkUnavailable { id: String, reason: &'static str },

    #[error("password hashing failed: {0}")]
    Password(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn access_denied(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AccessDenied {
            entity,
            id: id.into(),
        }
    }
}
