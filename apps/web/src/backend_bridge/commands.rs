//! Raw form input submitted by the page, and its conversion into request parameters.

use std::collections::BTreeSet;

use serde::Serialize;
use shared::{
    domain::{clamp_problem_count, normalize_handle, RequestParams, DEFAULT_PROBLEM_COUNT},
    error::AdapterError,
};

use crate::controller::events::EMPTY_HANDLE_MESSAGE;

/// Field values echoed back into the form after a submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormValues {
    pub handle: String,
    pub count: String,
    pub topics: BTreeSet<String>,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            handle: String::new(),
            count: DEFAULT_PROBLEM_COUNT.to_string(),
            topics: BTreeSet::new(),
        }
    }
}

impl FormValues {
    /// Parses an `application/x-www-form-urlencoded` body. `topics` may repeat.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut form = Self {
            count: String::new(),
            ..Self::default()
        };
        for (key, value) in url::form_urlencoded::parse(body) {
            match key.as_ref() {
                "handle" => form.handle = value.into_owned(),
                "count" => form.count = value.into_owned(),
                "topics" => {
                    form.topics.insert(value.into_owned());
                }
                _ => {}
            }
        }
        form
    }

    pub fn to_params(&self) -> Result<RequestParams, AdapterError> {
        let handle = normalize_handle(&self.handle)
            .ok_or_else(|| AdapterError::Validation(EMPTY_HANDLE_MESSAGE.to_string()))?;
        Ok(RequestParams::new(
            handle,
            &self.topics,
            clamp_problem_count(&self.count),
        ))
    }
}
