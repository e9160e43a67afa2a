//! Storage error types.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failures talking to the hosted backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("row not found")]
    NotFound,

    #[error("not authenticated")]
    Unauthorized,
}

/// Failures of sign-in and sign-up
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend refused the credentials; the message is shown to the user
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Text for the login / register form
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected(message) => message.clone(),
            AuthError::Storage(_) => "Unable to reach the server. Please try again.".to_string(),
        }
    }
}
