//! User-facing notifications produced by controller actions.

use crate::error::{ControllerError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }

    /// The message shown for a failed action. Causes are not exposed here;
    /// they go to the log.
    pub fn from_error(err: &ControllerError) -> Self {
        match err.kind() {
            ErrorKind::Validation => Notice::error("Validation Error", err.to_string()),
            ErrorKind::Authentication => Notice::error(
                "Login failed",
                "Invalid username or password, or the server is unreachable.",
            ),
            ErrorKind::CatalogUnavailable => {
                Notice::error("Error", "Failed to load applications. Please try again.")
            }
            ErrorKind::Fetch => Notice::error("Error", "Failed to load tokens. Please try again."),
            ErrorKind::Generation => {
                Notice::error("Generation Failed", "Unable to generate token. Please try again.")
            }
            ErrorKind::Precondition => Notice::error("Not signed in", "Sign in to manage your tokens."),
            ErrorKind::Storage => Notice::error("Error", "Could not update the saved session."),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
