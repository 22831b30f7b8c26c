use radar_shared::PayloadError;
use thiserror::Error;

/// Errors surfaced by API calls.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status with whatever message the server provided.
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The server answered 401; the stored token has been dropped.
    #[error("Session expired")]
    SessionExpired,

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Invalid JSON in response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Short text suitable for a toast. Server-provided messages pass
    /// through; everything else maps to a generic phrase.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Could not reach the server. Check your connection.".to_string(),
            Self::Status { message, .. } => message.clone(),
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::Payload(_) | Self::Decode(_) => {
                "The server sent an unexpected response.".to_string()
            }
            Self::InvalidBaseUrl(url) => format!("Invalid API address: {url}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
