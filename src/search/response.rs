use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::search::error::ErrorCode;

/// JSON envelope returned for every query, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Keywords, echoed back.
    pub kw: String,
    /// Effective country filter.
    pub cn: String,
    /// Matching domains in rank order.
    pub dn: Vec<String>,
    /// Processing time in milliseconds.
    pub ms: u64,
    /// Error code (0 on success).
    pub err: i32,
}

impl Response {
    pub fn new(keywords: &str, country: &str) -> Self {
        Self {
            kw: keywords.to_string(),
            cn: country.to_string(),
            dn: Vec::new(),
            ms: 0,
            err: ErrorCode::Ok.as_i32(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.err == ErrorCode::Ok.as_i32()
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
