use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{info, warn};

use crate::backend::{Backend, visualization_link};
use crate::controller::{RejectReason, RequestController, SubmitOutcome};
use crate::markdown::ContentRenderer;
use crate::message::DisplayMessage;
use crate::render::MessageRenderer;
use crate::surface::{Surface, Toast};

const WELCOME: &str = "Welcome to the Database Analytics interface! Enter a natural language query above to get started.";

/// Natural-language database query console (`/database_query`).
pub struct QueryConsole {
    backend: Arc<dyn Backend>,
    surface: Arc<dyn Surface>,
    controller: RequestController,
    renderer: MessageRenderer,
    last_result: Mutex<Option<Value>>,
    visualize: AtomicBool,
}

impl QueryConsole {
    pub fn new(
        backend: Arc<dyn Backend>,
        surface: Arc<dyn Surface>,
        content: Arc<dyn ContentRenderer>,
    ) -> Self {
        Self {
            controller: RequestController::new(
                "query",
                surface.clone(),
                "Executing query...",
                "Ready to execute queries",
            ),
            renderer: MessageRenderer::new(surface.clone(), content, WELCOME),
            backend,
            surface,
            last_result: Mutex::new(None),
            visualize: AtomicBool::new(false),
        }
    }

    /// Runs one query. Dropped while another query is in flight.
    pub async fn submit(&self, query: &str) -> SubmitOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }
        let Some(_busy) = self.controller.try_begin() else {
            return SubmitOutcome::Rejected(RejectReason::Busy);
        };
        self.revoke_visualize();
        self.renderer.append(DisplayMessage::user(query));
        let generation = self.renderer.generation();
        info!(event = "query.submitted", domain = "query", query_chars = query.len() as u64);

        let reply = match self.backend.database_query(query).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(event = "query.failed", domain = "query", error = %err);
                let message = format!("Query execution failed: {err}");
                self.renderer.append(DisplayMessage::error(message.clone()));
                self.surface.notify(&Toast::error(message.clone()));
                return SubmitOutcome::Failed(message);
            }
        };

        let settlement = self
            .controller
            .dispatch(
                reply,
                &self.renderer,
                "Query completed successfully.",
                generation,
            )
            .await;
        if settlement.has_data {
            *self.result_slot() = settlement.result_data.clone();
            self.visualize.store(true, Ordering::SeqCst);
            self.surface.set_visualize_available(true);
        }
        SubmitOutcome::Completed(settlement)
    }

    /// Resets the transcript and withdraws the visualize affordance.
    pub fn clear(&self) {
        self.renderer.clear();
        self.revoke_visualize();
    }

    /// Whether the last settled query attached result data.
    pub fn can_visualize(&self) -> bool {
        self.visualize.load(Ordering::SeqCst)
    }

    /// Studio link for the last result, or the bare studio path.
    pub fn visualization_link(&self) -> String {
        visualization_link(self.result_slot().as_ref())
    }

    pub fn last_result(&self) -> Option<Value> {
        self.result_slot().clone()
    }

    pub fn transcript(&self) -> Vec<DisplayMessage> {
        self.renderer.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    fn revoke_visualize(&self) {
        *self.result_slot() = None;
        self.visualize.store(false, Ordering::SeqCst);
        self.surface.set_visualize_available(false);
    }

    fn result_slot(&self) -> MutexGuard<'_, Option<Value>> {
        self.last_result.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
