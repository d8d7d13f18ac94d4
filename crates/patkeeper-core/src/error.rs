//! Typed errors for each component.
//!
//! Every error carries a stable [`ErrorKind`] and keeps the backend failure
//! as its `source`, so logs can tell a rejected login from an unreachable
//! server while the user-facing message stays the same.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::StorageError;

/// Stable error taxonomy shared by all components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    CatalogUnavailable,
    Fetch,
    Generation,
    Precondition,
    Storage,
}

/// Missing user input, detected before any I/O
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username is required")]
    MissingUsername,

    #[error("Password is required")]
    MissingPassword,

    #[error("Please select an application")]
    MissingRole,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Login failed")]
    Authentication(#[source] ApiError),

    #[error("Failed to update session storage")]
    Storage(#[from] StorageError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Validation(_) => ErrorKind::Validation,
            SessionError::Authentication(_) => ErrorKind::Authentication,
            SessionError::Storage(_) => ErrorKind::Storage,
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to fetch applications")]
    Unavailable(#[source] ApiError),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::CatalogUnavailable
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch tokens")]
    Backend(#[source] ApiError),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Fetch
    }
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to generate token")]
    Backend(#[source] ApiError),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Validation(_) => ErrorKind::Validation,
            GenerationError::Backend(_) => ErrorKind::Generation,
        }
    }
}

/// An operation was invoked in a session state that does not allow it.
/// Correct front-end wiring never triggers this.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("{operation} requires a signed-in user")]
    NotAuthenticated { operation: &'static str },
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

impl ControllerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControllerError::Session(e) => e.kind(),
            ControllerError::Catalog(e) => e.kind(),
            ControllerError::Fetch(e) => e.kind(),
            ControllerError::Generation(e) => e.kind(),
            ControllerError::Precondition(_) => ErrorKind::Precondition,
        }
    }
}
