//! Client side of a streaming data-analysis agent: a query console, an
//! upload-and-chat analysis console and a visualization studio.
//!
//! Every console consumes the same line-framed event stream (`data: <json>`
//! lines, `[DONE]` terminator), renders it into a transcript through a
//! [`surface::Surface`] and guards its requests with a busy flag that drops
//! (never queues) submits made while a request is in flight.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use autoinsight_console::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let backend = Arc::new(HttpBackend::from_env()?);
//! let console = QueryConsole::new(backend, Arc::new(NullSurface), default_renderer());
//!
//! console.submit("show total sales").await;
//! for entry in console.transcript() {
//!     println!("{}: {}", entry.header("Assistant"), entry.content);
//! }
//! # Ok(())
//! # }
//! ```

/// Backend endpoint contract and its HTTP implementation.
pub mod backend;
/// Base URL and timeout configuration.
pub mod config;
/// Consoles wiring surfaces, renderers and the backend together.
pub mod console;
/// Busy/idle request state shared by the consoles.
pub mod controller;
/// Public error types.
pub mod errors;
/// Typed stream events and frame classification.
pub mod event;
/// Content-to-HTML rendering (markdown or escaped text).
pub mod markdown;
/// Display entries shown in a transcript.
pub mod message;
/// Process-wide logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Event-to-entry mapping and transcript rendering.
pub mod render;
/// Line-framed stream decoding.
pub mod stream;
/// View-side hooks implemented by front ends.
pub mod surface;
/// Ordered transcript with a placeholder entry.
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    AgentReply, Backend, FileUpload, HttpBackend, JsonReply, RemoteFile, UploadReply,
    VisualizationOutcome, VisualizationReply, VisualizationRequest, visualization_link,
};
pub use config::ClientConfig;
pub use console::{
    ALLOWED_EXTENSIONS, AnalysisChat, DataSource, QueryConsole, VisualizationStudio, file_kind,
    format_file_size,
};
pub use controller::{RejectReason, RequestController, Settlement, SubmitOutcome};
pub use errors::{ClientError, FrameError};
pub use event::{MessagePayload, StreamEvent, parse_frame};
pub use markdown::{ContentRenderer, EscapedTextRenderer, RenderError, default_renderer};
#[cfg(feature = "markdown")]
pub use markdown::MarkdownRenderer;
pub use message::{DisplayMessage, Role};
pub use observability::init_observability;
pub use render::{MessageRenderer, RenderOutcome};
pub use stream::{EventStream, event_stream};
pub use surface::{NullSurface, Surface, Toast, ToastLevel};
pub use transcript::Transcript;
