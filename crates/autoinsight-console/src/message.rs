use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Who a transcript entry is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Agent,
    System,
    Error,
    ToolRequest,
    ToolResult,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::System => "system",
            Self::Error => "error",
            Self::ToolRequest => "tool-request",
            Self::ToolResult => "tool-result",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable transcript entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DisplayMessage {
    pub id: uuid::Uuid,
    pub role: Role,
    /// Raw markdown; converted to HTML only at display time.
    pub content: String,
    /// Attribution label (agent or tool name).
    pub source: Option<String>,
    /// Icon hint sent by the server.
    pub emoji: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Set for tool-request entries only.
    pub tool_name: Option<String>,
    /// Normalized `key: value` text, set for tool-request entries only.
    pub tool_arguments: Option<String>,
}

impl DisplayMessage {
    /// Creates an entry stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            role,
            content: content.into(),
            source: None,
            emoji: None,
            timestamp: Utc::now(),
            tool_name: None,
            tool_arguments: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(Role::Error, content)
    }

    /// Builds a tool-request entry; the content is the normalized argument text.
    pub fn tool_request(tool_name: impl Into<String>, arguments: Option<&Value>) -> Self {
        let arguments = arguments.map(format_tool_arguments).unwrap_or_default();
        let mut message = Self::new(Role::ToolRequest, format!("Arguments: {arguments}"));
        message.tool_name = Some(tool_name.into());
        message.tool_arguments = Some(arguments);
        message
    }

    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(Role::ToolResult, content).with_source(tool_name)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Replaces the receipt time with a server-supplied one, when present.
    pub fn stamped(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        if let Some(ts) = timestamp {
            self.timestamp = ts;
        }
        self
    }

    /// Header line shown above the content.
    ///
    /// `agent_label` is used for agent entries without a source.
    pub fn header(&self, agent_label: &str) -> String {
        let icon = self
            .emoji
            .as_deref()
            .map(|e| format!("{e} "))
            .unwrap_or_default();
        match self.role {
            Role::User => "You".to_string(),
            Role::Agent => format!("{icon}{}", self.source.as_deref().unwrap_or(agent_label)),
            Role::System => format!("{icon}System"),
            Role::Error => "Error".to_string(),
            Role::ToolRequest => format!(
                "{icon}{} is calling tool: {}",
                self.source.as_deref().unwrap_or("Agent"),
                self.tool_name.as_deref().unwrap_or("Unknown Tool")
            ),
            Role::ToolResult => format!(
                "{icon}{} result",
                self.source.as_deref().unwrap_or("Tool")
            ),
        }
    }

    /// Local time of day, as shown next to the header.
    pub fn time_label(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S")
            .to_string()
    }
}

/// Normalizes tool-call arguments into `key: <json>` pairs joined by `, `.
///
/// Arguments may arrive as a JSON-encoded string or as a structured object;
/// both produce the same text. Arrays are keyed by index. Anything else is
/// shown as raw text.
pub fn format_tool_arguments(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => format_tool_arguments(&value),
            _ => raw.clone(),
        },
        Value::Object(map) => join_pairs(map.iter().map(|(key, value)| (key.clone(), value))),
        Value::Array(items) => {
            join_pairs(items.iter().enumerate().map(|(i, value)| (i.to_string(), value)))
        }
        other => other.to_string(),
    }
}

fn join_pairs<'a>(pairs: impl Iterator<Item = (String, &'a Value)>) -> String {
    pairs
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
