use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::event::{MessagePayload, StreamEvent};
use crate::markdown::{ContentRenderer, render_or_escape};
use crate::message::{DisplayMessage, Role};
use crate::surface::Surface;
use crate::transcript::Transcript;

/// What rendering one event did to the transcript.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderOutcome {
    /// A new entry was appended.
    Appended,
    /// A `complete` event: nothing appended, result data reported upwards.
    Completed {
        has_data: bool,
        result_data: Option<Value>,
    },
}

/// Maps a stream event to the entry it should produce, if any.
pub fn display_message(event: &StreamEvent) -> Option<DisplayMessage> {
    match event {
        StreamEvent::Message(payload) => Some(payload_message(payload)),
        StreamEvent::Error { error_text } => Some(DisplayMessage::error(
            error_text.as_deref().unwrap_or("An error occurred"),
        )),
        StreamEvent::Complete { .. } => None,
    }
}

fn payload_message(payload: &MessagePayload) -> DisplayMessage {
    match payload {
        MessagePayload::ToolRequest {
            tool_name,
            arguments,
            emoji,
            source,
            timestamp,
        } => DisplayMessage::tool_request(
            tool_name.as_deref().unwrap_or("Unknown Tool"),
            arguments.as_ref(),
        )
        .with_source(source.as_deref().unwrap_or("Agent"))
        .with_emoji(emoji.as_deref().unwrap_or("🔧"))
        .stamped(*timestamp),
        MessagePayload::ToolResult {
            tool_name,
            content,
            emoji,
            timestamp,
        } => DisplayMessage::tool_result(
            tool_name.as_deref().unwrap_or("Tool"),
            content.as_deref().unwrap_or("No content"),
        )
        .with_emoji(emoji.as_deref().unwrap_or("✅"))
        .stamped(*timestamp),
        MessagePayload::System {
            content,
            emoji,
            timestamp,
        } => DisplayMessage::system(content.clone())
            .with_emoji(emoji.as_deref().unwrap_or("ℹ️"))
            .stamped(*timestamp),
        MessagePayload::Plain {
            content,
            source,
            emoji,
            timestamp,
        } => {
            let mut message = DisplayMessage::agent(content.clone()).stamped(*timestamp);
            message.source = source.clone();
            message.emoji = emoji.clone();
            message
        }
    }
}

/// Appends display entries to one transcript and mirrors them to the surface.
pub struct MessageRenderer {
    content: Arc<dyn ContentRenderer>,
    surface: Arc<dyn Surface>,
    transcript: Mutex<Transcript>,
    agent_label: String,
    generation: AtomicU64,
}

impl MessageRenderer {
    pub fn new(
        surface: Arc<dyn Surface>,
        content: Arc<dyn ContentRenderer>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            content,
            surface,
            transcript: Mutex::new(Transcript::new(placeholder)),
            agent_label: "Assistant".to_string(),
            generation: AtomicU64::new(0),
        }
    }

    /// Source given to agent entries that arrive without one.
    pub fn with_agent_label(mut self, label: impl Into<String>) -> Self {
        self.agent_label = label.into();
        self
    }

    /// Renders one stream event.
    pub fn render_event(&self, event: StreamEvent) -> RenderOutcome {
        debug!(event = "render.stream_event", domain = "render", kind = event.kind());
        match event {
            StreamEvent::Complete {
                has_data,
                result_data,
            } => RenderOutcome::Completed {
                has_data,
                result_data,
            },
            other => {
                if let Some(message) = display_message(&other) {
                    self.append(message);
                }
                RenderOutcome::Appended
            }
        }
    }

    /// Appends an entry, shows it and scrolls to it.
    pub fn append(&self, mut message: DisplayMessage) {
        if message.role == Role::Agent && message.source.is_none() {
            message.source = Some(self.agent_label.clone());
        }
        let html = self.html(&message);
        self.lock().push(message.clone());
        self.surface.append_message(&message, &html);
        self.surface.scroll_to_latest();
    }

    /// Number of clears so far. A reply started under an older generation
    /// belongs to a transcript that no longer exists.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Resets the transcript to its placeholder.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let placeholder = self.lock().clear().clone();
        let html = self.html(&placeholder);
        self.surface.reset_transcript(&placeholder, &html);
    }

    /// Content HTML for one entry, escaped if the renderer fails.
    pub fn html(&self, message: &DisplayMessage) -> String {
        render_or_escape(self.content.as_ref(), &message.content)
    }

    /// Copy of the current transcript entries.
    pub fn snapshot(&self) -> Vec<DisplayMessage> {
        self.lock().entries().to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
