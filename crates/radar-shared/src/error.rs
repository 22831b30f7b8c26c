use thiserror::Error;

/// Errors raised while normalizing server payloads into canonical entities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Unrecognized envelope for '{0}' collection")]
    UnrecognizedEnvelope(String),

    #[error("Entity has no usable identifier")]
    MissingId,

    #[error("Entity is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Expected a JSON object for '{0}'")]
    NotAnObject(&'static str),
}

pub type Result<T> = std::result::Result<T, PayloadError>;
