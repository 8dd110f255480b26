//! Crate error type.

use thiserror::Error;

use crate::models::{ClassId, ViolationKind};
use crate::store::StoreError;
use crate::validation::ValidationError;

/// Errors returned by timetabling operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A placement broke a hard rule.
    #[error("placement rejected: {0}")]
    Violation(#[from] ViolationKind),

    /// The persistence collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Loaded scope data failed integrity checks.
    #[error("invalid scope input ({} problem(s))", .0.len())]
    InvalidInput(Vec<ValidationError>),

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller cancelled the run.
    #[error("scheduling run cancelled")]
    Cancelled,

    /// The configured time limit elapsed.
    #[error("scheduling run exceeded its time limit")]
    DeadlineExceeded,

    /// Manual assignment requested a course out of workflow order.
    #[error("course '{requested}' requested while '{expected}' is still pending")]
    OutOfOrder { expected: String, requested: String },

    /// No course is waiting for manual assignment.
    #[error("every manually placed course already meets its hours")]
    NothingPending,

    /// The class is not part of the scope.
    #[error("{0} is not part of the scope")]
    UnknownClass(ClassId),
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The rule violation carried by this error, if any.
    pub fn violation(&self) -> Option<ViolationKind> {
        match self {
            Error::Violation(kind) => Some(*kind),
            _ => None,
        }
    }
}
