//! UI events, status-line classification and error modeling for the recommender page.

use serde::Serialize;
use shared::error::{AdapterError, ApiError, ErrorCode};

use crate::backend_bridge::commands::FormValues;

pub const STATUS_CONNECTING: &str = "Connecting…";
pub const STATUS_READY: &str = "Ready.";
pub const STATUS_ANALYSING: &str = "Analysing…";
pub const STATUS_DONE: &str = "Done ✅";
pub const EMPTY_HANDLE_MESSAGE: &str = "Please enter a CodeForces username";

const LOADING_MARKERS: [&str; 3] = ["connecting", "analysing", "⏳"];
const SUCCESS_MARKERS: [&str; 3] = ["ready", "✅", "done"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    #[default]
    Neutral,
    Loading,
    Success,
}

impl StatusClass {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Neutral => "status",
            Self::Loading => "status loading",
            Self::Success => "status success",
        }
    }
}

/// Loading markers win over success markers when a message carries both.
pub fn classify_status(message: &str) -> StatusClass {
    let lower = message.to_lowercase();
    if LOADING_MARKERS.iter().any(|marker| lower.contains(marker)) {
        StatusClass::Loading
    } else if SUCCESS_MARKERS.iter().any(|marker| lower.contains(marker)) {
        StatusClass::Success
    } else {
        StatusClass::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiErrorContext {
    Connect,
    Recommend,
}

/// An error bound for the error panel, tagged with the phase that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiError {
    #[serde(flatten)]
    error: ApiError,
    context: UiErrorContext,
}

impl UiError {
    pub fn new(category: ErrorCode, context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            error: ApiError::new(category, message),
            context,
        }
    }

    pub fn from_adapter(context: UiErrorContext, error: AdapterError) -> Self {
        Self {
            error: ApiError::from(error),
            context,
        }
    }

    pub fn category(&self) -> ErrorCode {
        self.error.code
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    #[default]
    Connecting,
    Established,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSlot {
    Profile,
    Recommendations,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Status(String),
    Error(UiError),
    ClearError,
    ShowCard { slot: CardSlot, markup: String },
    HideCard(CardSlot),
    RunEnabled(bool),
    Connection(ConnectionPhase),
    FormSubmitted(FormValues),
}
