//! Summary Stream Frames
//!
//! Wire types for the AI-summary server-push channel. Each frame is one JSON
//! object `{"type": ..., "content"?: ...}`; no other fields are defined.

use serde::{Deserialize, Serialize};

/// Generic message surfaced when a frame cannot be understood.
pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse server response";

/// Generic message for an `error` frame that carries no content.
pub const GENERATION_FAILURE_MESSAGE: &str = "An error occurred during generation";

/// One frame of a summary stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SummaryFrame {
    /// Transient progress text; does not touch the summary buffer
    Status {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    /// The full summary so far. Replaces, never appends.
    Summary {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    /// Successful end of stream
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    /// Server-side failure; ends the stream
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

impl SummaryFrame {
    pub fn status(content: impl Into<String>) -> Self {
        SummaryFrame::Status {
            content: Some(content.into()),
        }
    }

    pub fn summary(content: impl Into<String>) -> Self {
        SummaryFrame::Summary {
            content: Some(content.into()),
        }
    }

    pub fn done() -> Self {
        SummaryFrame::Done { content: None }
    }

    pub fn error(content: impl Into<String>) -> Self {
        SummaryFrame::Error {
            content: Some(content.into()),
        }
    }

    /// Parse one frame payload. Unknown `type` values are rejected, not skipped.
    pub fn parse(payload: &str) -> Result<Self, AdapterError> {
        let value: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let frame_type = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| AdapterError::InvalidFormat("frame has no string `type`".to_string()))?;

        if !matches!(frame_type, "status" | "summary" | "done" | "error") {
            return Err(AdapterError::UnsupportedEvent(frame_type.to_string()));
        }

        serde_json::from_value(value).map_err(|e| AdapterError::ParseError(e.to_string()))
    }

    /// `done` and `error` end the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SummaryFrame::Done { .. } | SummaryFrame::Error { .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SummaryFrame::Status { .. } => "status",
            SummaryFrame::Summary { .. } => "summary",
            SummaryFrame::Done { .. } => "done",
            SummaryFrame::Error { .. } => "error",
        }
    }
}

/// Errors that can occur while decoding a frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AdapterError {
    /// Invalid format that couldn't be parsed
    InvalidFormat(String),
    /// JSON/data parsing error
    ParseError(String),
    /// Frame type not defined by the protocol
    UnsupportedEvent(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AdapterError::UnsupportedEvent(msg) => write!(f, "Unsupported event: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<AdapterError> for crate::error::CoreError {
    fn from(err: AdapterError) -> Self {
        crate::error::CoreError::Protocol(err.to_string())
    }
}
