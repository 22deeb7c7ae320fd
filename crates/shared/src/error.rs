use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which stage of the request/response flow produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    Connection,
    Transport,
    Application,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Connection => "connection",
            Self::Transport => "transport",
            Self::Application => "application",
        }
    }
}

/// Serializable error as shown in the error panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Connection(String),
    #[error("{0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("{0}")]
    Application(String),
}

impl AdapterError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::Connection(_) => ErrorCode::Connection,
            Self::Transport(_) | Self::MalformedResponse(_) => ErrorCode::Transport,
            Self::Application(_) => ErrorCode::Application,
        }
    }
}

impl From<AdapterError> for ApiError {
    fn from(value: AdapterError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
