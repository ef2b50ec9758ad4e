// src/backend/protocol.rs

//! Wire types for the pipeline backend's JSON endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub start_step: String,
}

/// Generic `{message}` / `{error}` reply used by `/run`, `/history` and
/// `/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    /// Whichever text the backend sent, preferring the error.
    pub fn text(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_default()
    }
}

/// Outcome of a run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAck {
    Accepted(String),
    Rejected(String),
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub log_content: String,
    #[serde(default)]
    pub status_content: String,
}

/// One server-sent event from `GET /stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl StreamMessage {
    /// Decode an event payload. Payloads that are not the expected JSON
    /// object are kept as a bare message with no level.
    pub fn from_event_data(data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_else(|_| StreamMessage {
            message: data.to_string(),
            level: None,
        })
    }
}

/// Key/value pipeline configuration as stored by the backend.
pub type BackendConfig = serde_json::Map<String, serde_json::Value>;
