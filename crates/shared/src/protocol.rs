use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;

pub const PROFILE_SLOT: usize = 2;
pub const RECOMMENDATIONS_SLOT: usize = 3;
pub const ERROR_SLOT: usize = 4;

/// One response slot as sent by the remote UI: either bare text or an update object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseField {
    Text(String),
    Update {
        value: Option<String>,
        visible: Option<bool>,
    },
    /// Any other truthy scalar or array; carries no readable text.
    Opaque,
}

/// A slot after normalization. `visible` stays `None` when the remote side did not say, so each
/// consumer applies its own default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldText {
    pub text: String,
    pub visible: Option<bool>,
}

impl FieldText {
    pub fn is_visible_or(&self, default: bool) -> bool {
        self.visible.unwrap_or(default)
    }
}

impl ResponseField {
    /// Reads a slot, returning `None` for absent values (`null`, `false`, `0`, `""`).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Number(number) if number.as_f64() == Some(0.0) => None,
            Value::Object(map) => Some(Self::Update {
                value: map.get("value").and_then(Value::as_str).map(str::to_string),
                visible: map.get("visible").and_then(Value::as_bool),
            }),
            Value::Bool(true) | Value::Number(_) | Value::Array(_) => Some(Self::Opaque),
        }
    }

    pub fn normalize(self) -> FieldText {
        match self {
            Self::Text(text) => FieldText {
                text,
                visible: None,
            },
            Self::Update { value, visible } => FieldText {
                text: value.unwrap_or_default(),
                visible,
            },
            Self::Opaque => FieldText::default(),
        }
    }
}

/// The consumed part of the 5-slot prediction result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseTuple {
    pub profile: Option<FieldText>,
    pub recommendations: Option<FieldText>,
    pub error: Option<FieldText>,
}

impl ResponseTuple {
    /// Accepts either a bare array or an object wrapping it in `data`.
    pub fn from_value(raw: &Value) -> Result<Self, AdapterError> {
        let data = match raw {
            Value::Object(map) => match map.get("data") {
                Some(inner) if !inner.is_null() => inner,
                _ => raw,
            },
            _ => raw,
        };
        let Value::Array(slots) = data else {
            return Err(AdapterError::MalformedResponse(format!(
                "expected an array of outputs, got {}",
                json_kind(data)
            )));
        };
        let slot = |index: usize| {
            slots
                .get(index)
                .and_then(ResponseField::from_value)
                .map(ResponseField::normalize)
        };
        Ok(Self {
            profile: slot(PROFILE_SLOT),
            recommendations: slot(RECOMMENDATIONS_SLOT),
            error: slot(ERROR_SLOT),
        })
    }

    /// Error text when slot 4 asserts an error: present, visible (default hidden) and non-empty.
    pub fn signaled_error(&self) -> Option<&str> {
        self.error
            .as_ref()
            .filter(|field| field.is_visible_or(false) && !field.text.is_empty())
            .map(|field| field.text.as_str())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAccepted {
    pub event_id: String,
}

/// Subset of the Gradio app config needed to build call URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub api_prefix: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceRuntime {
    pub stage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub runtime: Option<SpaceRuntime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceHost {
    #[serde(default)]
    pub subdomain: Option<String>,
    pub host: String,
}

/// Connection-phase status reported while a Space is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceStatusEvent {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SpaceStatusEvent {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            detail: None,
            message: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Status line text: `"{detail or status}: {message}"`.
    pub fn status_line(&self) -> String {
        format!(
            "{}: {}",
            self.detail.as_deref().unwrap_or(&self.status),
            self.message.as_deref().unwrap_or_default()
        )
    }
}
