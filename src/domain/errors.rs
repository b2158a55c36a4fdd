//! Domain errors for the migration workflow.

use thiserror::Error;

/// Domain-level errors that can occur while driving a workflow.
///
/// Collaborator failures are deliberately absent: they are captured at the
/// phase boundary and recorded on the workflow instead of being returned.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Precondition(String),

    #[error("No active workflow")]
    NoActiveWorkflow,

    #[error("Invalid phase number: {0} (must be 1-7)")]
    InvalidPhase(u8),

    #[error("Invalid phase parameters: {}", .0.join("; "))]
    InvalidParams(Vec<String>),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DomainError {
    /// Whether the caller can fix the problem and try the same call again.
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::Precondition(_) | Self::NoActiveWorkflow | Self::InvalidPhase(_) | Self::InvalidParams(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
