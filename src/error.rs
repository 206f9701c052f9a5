use std::fmt;

use thiserror::Error;

/// Local password checks, applied before anything is sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    Mismatch,
    TooShort { min: usize },
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordRule::Mismatch => write!(f, "Passwords don't match"),
            PasswordRule::TooShort { min } => {
                write!(f, "Password must be at least {} characters long", min)
            }
        }
    }
}

/// Everything that can go wrong inside an interactive session.
///
/// None of these end the process; the console reports them and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    /// Transport or credential failure while talking to the identity provider.
    #[error("identity provider unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("{0}")]
    ValidationFailed(PasswordRule),

    /// The provider answered but refused the write.
    #[error("update rejected: {0}")]
    MutationFailed(String),

    #[error("token issuance failed: {0}")]
    TokenIssuanceFailed(String),

    /// The request may never have reached the server.
    #[error("network error: {0}")]
    NetworkError(String),
}
