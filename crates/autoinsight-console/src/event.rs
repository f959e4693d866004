use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::errors::FrameError;

/// One classified frame of a streamed agent response.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// `{"type":"message","data":{...}}`
    Message(MessagePayload),
    /// `{"type":"error","error":"..."}`
    Error { error_text: Option<String> },
    /// `{"type":"complete","has_data":bool,"data":...}`
    Complete {
        has_data: bool,
        result_data: Option<Value>,
    },
}

impl StreamEvent {
    /// Synthetic error event used when the underlying body read fails.
    pub fn read_failure() -> Self {
        Self::Error {
            error_text: Some("Error processing response stream".to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Error { .. } => "error",
            Self::Complete { .. } => "complete",
        }
    }
}

/// Payload of a `message` event, discriminated by `data.type`.
#[derive(Clone, Debug, PartialEq)]
pub enum MessagePayload {
    ToolRequest {
        tool_name: Option<String>,
        /// Either a JSON-encoded string or a structured value, as sent.
        arguments: Option<Value>,
        emoji: Option<String>,
        source: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    },
    ToolResult {
        tool_name: Option<String>,
        content: Option<String>,
        emoji: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    },
    System {
        content: String,
        emoji: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Any other payload kind (`text`, `plain`, ...).
    Plain {
        content: String,
        source: Option<String>,
        emoji: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    },
}

impl MessagePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolRequest { .. } => "tool_request",
            Self::ToolResult { .. } => "tool_result",
            Self::System { .. } => "system",
            Self::Plain { .. } => "plain",
        }
    }
}

/// Parses and narrows the JSON text of one frame.
///
/// `Ok(None)` means the frame is well formed but carries a top-level type this
/// client does not display (for example `final_result`).
pub fn parse_frame(text: &str) -> Result<Option<StreamEvent>, FrameError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| FrameError::Json(e.to_string()))?;
    classify(&value)
}

/// Narrows an already-parsed frame object into a [`StreamEvent`].
pub fn classify(value: &Value) -> Result<Option<StreamEvent>, FrameError> {
    if !value.is_object() {
        return Err(FrameError::NotAnObject);
    }
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        debug!(event = "stream.frame_untyped", domain = "stream", "frame without type ignored");
        return Ok(None);
    };
    match kind {
        "message" => {
            let data = value
                .get("data")
                .filter(|d| d.is_object())
                .ok_or(FrameError::MissingPayload)?;
            Ok(Some(StreamEvent::Message(classify_payload(data))))
        }
        "error" => Ok(Some(StreamEvent::Error {
            error_text: str_field(value, "error"),
        })),
        "complete" => Ok(Some(StreamEvent::Complete {
            has_data: value
                .get("has_data")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            result_data: value.get("data").filter(|d| !d.is_null()).cloned(),
        })),
        other => {
            debug!(
                event = "stream.frame_ignored",
                domain = "stream",
                frame_type = other,
                "unhandled frame type"
            );
            Ok(None)
        }
    }
}

fn classify_payload(data: &Value) -> MessagePayload {
    let emoji = str_field(data, "emoji");
    let timestamp = timestamp_field(data);
    match data.get("type").and_then(Value::as_str) {
        Some("tool_request") => MessagePayload::ToolRequest {
            tool_name: str_field(data, "tool_name"),
            arguments: data.get("arguments").filter(|a| !a.is_null()).cloned(),
            emoji,
            source: str_field(data, "source"),
            timestamp,
        },
        Some("tool_result") => MessagePayload::ToolResult {
            tool_name: str_field(data, "tool_name"),
            content: str_field(data, "content"),
            emoji,
            timestamp,
        },
        Some("system") => MessagePayload::System {
            content: text_content(data),
            emoji,
            timestamp,
        },
        _ => MessagePayload::Plain {
            content: text_content(data),
            source: str_field(data, "source"),
            emoji,
            timestamp,
        },
    }
}

/// `content`, else `message`, else empty. Empty strings count as absent.
fn text_content(data: &Value) -> String {
    str_field(data, "content")
        .or_else(|| str_field(data, "message"))
        .unwrap_or_default()
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

// The backend sends `"timestamp": true` as a "stamp it yourself" marker.
fn timestamp_field(value: &Value) -> Option<DateTime<Utc>> {
    value
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
}
