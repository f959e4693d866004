//! Busy/idle state machine shared by every console.
//!
//! A console owns one [`RequestController`] per interaction surface. The busy
//! flag is claimed synchronously before the first `.await`, so a second submit
//! on the same surface is dropped instead of queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt as _;
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::AgentReply;
use crate::message::DisplayMessage;
use crate::render::{MessageRenderer, RenderOutcome};
use crate::surface::Surface;

/// Why a submit was dropped without any request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// A request is already in flight on this surface.
    Busy,
    /// Required text input was empty.
    EmptyInput,
    /// The chat has no file selected.
    NoFileSelected,
    /// The dropped file has an extension the backend does not accept.
    UnsupportedFileType(String),
    /// The visualization studio lacks data or a request.
    MissingInput,
}

/// Result of one `submit`-style call.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Dropped before any request; the transcript was not touched.
    Rejected(RejectReason),
    /// The request settled normally.
    Completed(Settlement),
    /// The request failed; an error entry was appended.
    Failed(String),
}

impl SubmitOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// How a dispatched agent reply ended.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settlement {
    /// Whether a `complete` (or JSON) result carried structured data.
    pub has_data: bool,
    pub result_data: Option<Value>,
    /// Number of stream events rendered (1 for JSON replies).
    pub events: usize,
    /// The transcript was cleared before the reply finished; the rest of it
    /// was dropped unrendered.
    pub abandoned: bool,
}

/// Idle/busy state for one interaction surface.
pub struct RequestController {
    name: &'static str,
    busy: AtomicBool,
    surface: Arc<dyn Surface>,
    busy_status: String,
    idle_status: String,
}

impl RequestController {
    pub fn new(
        name: &'static str,
        surface: Arc<dyn Surface>,
        busy_status: impl Into<String>,
        idle_status: impl Into<String>,
    ) -> Self {
        Self {
            name,
            busy: AtomicBool::new(false),
            surface,
            busy_status: busy_status.into(),
            idle_status: idle_status.into(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Claims the surface: `idle → busy`.
    ///
    /// Returns `None` if a request is already in flight. The returned guard
    /// puts the surface back to idle when dropped, whatever happens in between.
    pub fn try_begin(&self) -> Option<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(
                event = "controller.rejected_busy",
                domain = "controller",
                surface = self.name,
                "request already in flight"
            );
            return None;
        }
        debug!(event = "controller.busy", domain = "controller", surface = self.name);
        self.surface.set_busy(true, &self.busy_status);
        Some(BusyGuard { controller: self })
    }

    /// Feeds an agent reply into the renderer until it settles.
    ///
    /// A streamed reply is rendered event by event; a JSON reply becomes one
    /// agent entry (`fallback` when it has no text) and settles like a
    /// `complete` event. `generation` is the renderer generation the request
    /// was issued under; once the renderer is cleared the reply is abandoned.
    pub async fn dispatch(
        &self,
        reply: AgentReply,
        renderer: &MessageRenderer,
        fallback: &str,
        generation: u64,
    ) -> Settlement {
        let mut settlement = Settlement::default();
        if renderer.generation() != generation {
            return self.abandon(settlement);
        }
        match reply {
            AgentReply::Stream(mut events) => {
                while let Some(event) = events.next().await {
                    if renderer.generation() != generation {
                        return self.abandon(settlement);
                    }
                    settlement.events += 1;
                    if let RenderOutcome::Completed {
                        has_data,
                        result_data,
                    } = renderer.render_event(event)
                    {
                        settlement.has_data |= has_data;
                        if has_data {
                            settlement.result_data = result_data;
                        }
                    }
                }
            }
            AgentReply::Json(reply) => {
                let text = reply
                    .response
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| fallback.to_string());
                renderer.append(DisplayMessage::agent(text));
                settlement.events = 1;
                settlement.has_data = reply.has_data;
                if reply.has_data {
                    settlement.result_data = reply.data;
                }
            }
        }
        info!(
            event = "controller.settled",
            domain = "controller",
            surface = self.name,
            events = settlement.events as u64,
            has_data = settlement.has_data,
            "request settled"
        );
        settlement
    }

    fn abandon(&self, settlement: Settlement) -> Settlement {
        info!(
            event = "controller.abandoned",
            domain = "controller",
            surface = self.name,
            events = settlement.events as u64,
            "transcript cleared mid-request"
        );
        Settlement {
            has_data: false,
            result_data: None,
            abandoned: true,
            ..settlement
        }
    }
}

/// Holds a surface busy; dropping it returns the surface to idle.
pub struct BusyGuard<'a> {
    controller: &'a RequestController,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let controller = self.controller;
        controller.busy.store(false, Ordering::SeqCst);
        controller
            .surface
            .set_busy(false, &controller.idle_status);
        debug!(event = "controller.idle", domain = "controller", surface = controller.name);
    }
}
