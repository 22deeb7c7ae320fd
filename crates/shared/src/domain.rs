use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const MIN_PROBLEM_COUNT: u8 = 1;
pub const MAX_PROBLEM_COUNT: u8 = 15;
pub const DEFAULT_PROBLEM_COUNT: u8 = 5;

/// Codeforces problem tags offered as topic filters.
pub const TOPIC_VOCABULARY: &[&str] = &[
    "implementation",
    "math",
    "greedy",
    "dp",
    "data structures",
    "brute force",
    "constructive algorithms",
    "graphs",
    "sortings",
    "binary search",
    "dfs and similar",
    "trees",
    "strings",
    "number theory",
    "combinatorics",
    "two pointers",
    "bitmasks",
    "geometry",
    "shortest paths",
    "divide and conquer",
    "hashing",
    "games",
    "flows",
    "matrices",
];

pub fn is_known_topic(topic: &str) -> bool {
    TOPIC_VOCABULARY.contains(&topic)
}

/// Stable element id for a topic checkbox, e.g. `topic-binary-search`.
pub fn topic_element_id(topic: &str) -> String {
    let slug = topic.split_whitespace().collect::<Vec<_>>().join("-");
    format!("topic-{slug}")
}

/// Normalizes the raw count field.
///
/// Blank or non-finite input falls back to [`DEFAULT_PROBLEM_COUNT`]; finite values are floored
/// and clamped to `[MIN_PROBLEM_COUNT, MAX_PROBLEM_COUNT]`.
pub fn clamp_problem_count(raw: &str) -> u8 {
    let Ok(value) = raw.trim().parse::<f64>() else {
        return DEFAULT_PROBLEM_COUNT;
    };
    if !value.is_finite() {
        return DEFAULT_PROBLEM_COUNT;
    }
    let floored = value.floor();
    if floored <= f64::from(MIN_PROBLEM_COUNT) {
        MIN_PROBLEM_COUNT
    } else if floored >= f64::from(MAX_PROBLEM_COUNT) {
        MAX_PROBLEM_COUNT
    } else {
        floored as u8
    }
}

/// Trims the handle field, returning `None` when nothing is left.
pub fn normalize_handle(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParams {
    handle: String,
    topics: BTreeSet<String>,
    count: u8,
}

impl RequestParams {
    /// Builds parameters from already-normalized parts. Unknown topics are dropped and the count
    /// is kept inside the allowed range.
    pub fn new(
        handle: impl Into<String>,
        topics: impl IntoIterator<Item = impl AsRef<str>>,
        count: u8,
    ) -> Self {
        let topics = topics
            .into_iter()
            .map(|topic| topic.as_ref().trim().to_string())
            .filter(|topic| is_known_topic(topic))
            .collect();
        Self {
            handle: handle.into(),
            topics,
            count: count.clamp(MIN_PROBLEM_COUNT, MAX_PROBLEM_COUNT),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn topics(&self) -> &BTreeSet<String> {
        &self.topics
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    /// Positional call arguments: handle, topic list, count.
    pub fn to_call_args(&self) -> Vec<serde_json::Value> {
        vec![
            serde_json::Value::String(self.handle.clone()),
            serde_json::Value::Array(
                self.topics
                    .iter()
                    .cloned()
                    .map(serde_json::Value::String)
                    .collect(),
            ),
            serde_json::Value::from(self.count),
        ]
    }
}
