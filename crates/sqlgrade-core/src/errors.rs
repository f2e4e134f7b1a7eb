use crate::model::ExecutionResult;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Output subtype of a failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Schema,
    Query,
    SolutionMissing,
    Sandbox,
}

/// Which query of a verification call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryRole {
    Candidate,
    Reference,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryFailure {
    /// Database diagnostic, verbatim.
    #[error("{0}")]
    Database(String),
    #[error("query exceeded the time limit of {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("{0}")]
    NotReadOnly(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{failure}")]
pub struct QueryError {
    pub role: QueryRole,
    pub failure: QueryFailure,
}

impl QueryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self.failure, QueryFailure::Timeout(_))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerifyError {
    #[error("{0}")]
    Validation(String),

    #[error("schema script (order {order}) failed: {message}")]
    Schema { order: u32, message: String },

    #[error(transparent)]
    Query(QueryError),

    #[error("this problem does not have a solution configured yet")]
    SolutionMissing { candidate: ExecutionResult },

    #[error("sandbox failure: {0}")]
    Sandbox(String),
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::Validation(_) => ErrorKind::Validation,
            VerifyError::Schema { .. } => ErrorKind::Schema,
            VerifyError::Query(_) => ErrorKind::Query,
            VerifyError::SolutionMissing { .. } => ErrorKind::SolutionMissing,
            VerifyError::Sandbox(_) => ErrorKind::Sandbox,
        }
    }

    /// True when the fault lies with problem content or the engine rather
    /// than with the submitted query.
    pub fn is_system_fault(&self) -> bool {
        match self {
            VerifyError::Schema { .. } | VerifyError::Sandbox(_) => true,
            VerifyError::Query(q) => q.role == QueryRole::Reference,
            VerifyError::Validation(_) | VerifyError::SolutionMissing { .. } => false,
        }
    }

    pub fn candidate(failure: QueryFailure) -> Self {
        VerifyError::Query(QueryError {
            role: QueryRole::Candidate,
            failure,
        })
    }

    pub fn reference(failure: QueryFailure) -> Self {
        VerifyError::Query(QueryError {
            role: QueryRole::Reference,
            failure,
        })
    }
}

impl From<rusqlite::Error> for VerifyError {
    fn from(e: rusqlite::Error) -> Self {
        VerifyError::Sandbox(e.to_string())
    }
}
