use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::backend::{Backend, FileUpload, VisualizationOutcome, VisualizationRequest};
use crate::controller::{RejectReason, RequestController, SubmitOutcome};
use crate::errors::ClientError;
use crate::markdown::ContentRenderer;
use crate::message::DisplayMessage;
use crate::render::MessageRenderer;
use crate::surface::{Surface, Toast};

const LOG_PLACEHOLDER: &str = "Processing Log";
const PREVIEW_PLACEHOLDER: &str = "Your visualization will appear here";

/// Where the studio takes its data from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataSource {
    #[default]
    Text,
    File,
    Url,
}

#[derive(Default)]
struct StudioState {
    source: DataSource,
    data_text: String,
    file_data: Option<String>,
    data_url: String,
    query: String,
    chart_type: String,
    plot_url: Option<String>,
}

/// Visualization request studio (`/create_visualization`).
///
/// The processing log is kept as this console's transcript.
pub struct VisualizationStudio {
    backend: Arc<dyn Backend>,
    surface: Arc<dyn Surface>,
    controller: RequestController,
    log: MessageRenderer,
    state: Mutex<StudioState>,
}

impl VisualizationStudio {
    pub fn new(
        backend: Arc<dyn Backend>,
        surface: Arc<dyn Surface>,
        content: Arc<dyn ContentRenderer>,
    ) -> Self {
        Self {
            controller: RequestController::new(
                "studio",
                surface.clone(),
                "Creating visualization...",
                "Ready to create visualizations",
            ),
            log: MessageRenderer::new(surface.clone(), content, LOG_PLACEHOLDER),
            backend,
            surface,
            state: Mutex::new(StudioState::default()),
        }
    }

    /// Pre-fills the text source from a query console link.
    ///
    /// Accepts either the whole `/visualization?data=...` link or just the
    /// encoded `data` parameter.
    pub fn seed_from_link(&self, link: &str) -> Result<(), ClientError> {
        let param = match link.split_once("data=") {
            Some((_, param)) => param.split('&').next().unwrap_or_default(),
            None => link,
        };
        let parsed = urlencoding::decode(param)
            .map_err(ClientError::decode)
            .and_then(|json| {
                serde_json::from_str::<serde_json::Value>(&json).map_err(ClientError::decode)
            })
            .and_then(|value| {
                serde_json::to_string_pretty(&value).map_err(ClientError::decode)
            });
        match parsed {
            Ok(pretty) => {
                let mut state = self.state();
                state.source = DataSource::Text;
                state.data_text = pretty;
                drop(state);
                self.surface
                    .notify(&Toast::success("Data loaded from database query result"));
                Ok(())
            }
            Err(err) => {
                warn!(event = "studio.seed_failed", domain = "studio", error = %err);
                self.surface.notify(&Toast::error("Error loading data from URL"));
                Err(err)
            }
        }
    }

    pub fn set_data_text(&self, text: impl Into<String>) {
        self.state().data_text = text.into();
    }

    /// Loads a dropped file as text (invalid UTF-8 is replaced).
    pub fn on_file_drop(&self, file: FileUpload) {
        let text = String::from_utf8_lossy(&file.bytes).into_owned();
        let mut state = self.state();
        state.data_text = text.clone();
        state.file_data = Some(text);
        drop(state);
        self.surface.notify(&Toast::success(format!(
            "File \"{}\" loaded successfully",
            file.name
        )));
    }

    pub fn set_data_url(&self, url: impl Into<String>) {
        self.state().data_url = url.into();
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.state().query = query.into();
    }

    /// Empty string clears the selection.
    pub fn select_chart_type(&self, chart_type: impl Into<String>) {
        self.state().chart_type = chart_type.into();
    }

    pub fn switch_source(&self, source: DataSource) {
        self.state().source = source;
    }

    pub fn source(&self) -> DataSource {
        self.state().source
    }

    /// Current text-source contents (also filled by file and URL loads).
    pub fn data_text(&self) -> String {
        self.state().data_text.clone()
    }

    /// Whether the create action should be enabled.
    pub fn can_create(&self) -> bool {
        if self.controller.is_busy() {
            return false;
        }
        let state = self.state();
        let has_data = match state.source {
            DataSource::Text => !state.data_text.trim().is_empty(),
            DataSource::File => state.file_data.is_some(),
            DataSource::Url => !state.data_url.trim().is_empty(),
        };
        has_data && !state.query.trim().is_empty()
    }

    /// Requests a chart for the current data and request text.
    ///
    /// Text and file sources are validated before the studio goes busy. The
    /// URL source goes busy first so the fetch itself is guarded.
    pub async fn submit(&self) -> SubmitOutcome {
        let source = self.source();
        let (_busy, request) = if source == DataSource::Url {
            let Some(busy) = self.controller.try_begin() else {
                return SubmitOutcome::Rejected(RejectReason::Busy);
            };
            self.load_data_from_url().await;
            let Some(request) = self.checked_request(source) else {
                return SubmitOutcome::Rejected(RejectReason::MissingInput);
            };
            (busy, request)
        } else {
            if self.controller.is_busy() {
                return SubmitOutcome::Rejected(RejectReason::Busy);
            }
            let Some(request) = self.checked_request(source) else {
                return SubmitOutcome::Rejected(RejectReason::MissingInput);
            };
            let Some(busy) = self.controller.try_begin() else {
                return SubmitOutcome::Rejected(RejectReason::Busy);
            };
            (busy, request)
        };

        self.log
            .append(DisplayMessage::system("Starting visualization creation..."));
        info!(
            event = "studio.submitted",
            domain = "studio",
            chart_type = %request.chart_type,
            data_chars = request.data.len() as u64
        );

        let reply = match self.backend.create_visualization(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                let message = format!("Visualization creation failed: {err}");
                return self.fail(message.clone(), message);
            }
        };

        match reply.outcome() {
            VisualizationOutcome::Created { plot_path } => {
                let plot_url = format!("/static/{plot_path}");
                self.log
                    .append(DisplayMessage::system("Visualization created successfully!"));
                self.state().plot_url = Some(plot_url.clone());
                info!(event = "studio.plot_ready", domain = "studio", plot_url = %plot_url);
                self.surface.show_plot(&plot_url);
                self.surface
                    .notify(&Toast::success("Visualization created successfully!"));
                SubmitOutcome::Completed(Default::default())
            }
            VisualizationOutcome::Failed { message } => {
                let toast = format!("Visualization failed: {message}");
                self.fail(message, toast)
            }
            VisualizationOutcome::Unexpected => self.fail(
                "Unexpected response format".to_string(),
                "Unexpected response format".to_string(),
            ),
        }
    }

    /// URL of the last generated chart (`/static/<plot_path>`).
    pub fn plot_url(&self) -> Option<String> {
        self.state().plot_url.clone()
    }

    /// Entries of the processing log.
    pub fn log(&self) -> Vec<DisplayMessage> {
        self.log.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Clears every input, the chart and the processing log.
    pub fn clear_all(&self) {
        let source = self.source();
        *self.state() = StudioState {
            source,
            ..StudioState::default()
        };
        self.log.clear();
        self.surface.clear_plot(PREVIEW_PLACEHOLDER);
        self.surface.notify(&Toast::success("All fields cleared"));
    }

    /// Builds the request from current inputs, or toasts when either side is
    /// missing.
    fn checked_request(&self, source: DataSource) -> Option<VisualizationRequest> {
        let request = {
            let state = self.state();
            let data = match source {
                DataSource::File => state.file_data.clone().unwrap_or_default(),
                DataSource::Text | DataSource::Url => state.data_text.trim().to_string(),
            };
            VisualizationRequest {
                data,
                query: state.query.trim().to_string(),
                chart_type: state.chart_type.clone(),
            }
        };
        if request.data.is_empty() || request.query.is_empty() {
            self.surface.notify(&Toast::error(
                "Please provide both data and visualization request",
            ));
            return None;
        }
        Some(request)
    }

    async fn load_data_from_url(&self) {
        let url = self.state().data_url.trim().to_string();
        if url.is_empty() {
            return;
        }
        match self.backend.fetch_text(&url).await {
            Ok(text) => {
                self.state().data_text = text;
                self.surface
                    .notify(&Toast::success("Data loaded from URL successfully"));
            }
            Err(err) => {
                warn!(event = "studio.fetch_failed", domain = "studio", url = %url, error = %err);
                self.surface.notify(&Toast::error(format!(
                    "Error loading data from URL: {err}"
                )));
            }
        }
    }

    fn fail(&self, log_text: String, toast: String) -> SubmitOutcome {
        warn!(event = "studio.failed", domain = "studio", reason = %log_text);
        self.log.append(DisplayMessage::error(log_text.clone()));
        self.surface.notify(&Toast::error(toast));
        SubmitOutcome::Failed(log_text)
    }

    fn state(&self) -> MutexGuard<'_, StudioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{VisualizationReply, visualization_link};
    use crate::markdown::EscapedTextRenderer;
    use crate::message::Role;
    use crate::surface::testing::RecordingSurface;
    use crate::testing::FakeBackend;
    use serde_json::json;

    fn studio(backend: Arc<FakeBackend>) -> (Arc<RecordingSurface>, VisualizationStudio) {
        let surface = Arc::new(RecordingSurface::default());
        let studio =
            VisualizationStudio::new(backend, surface.clone(), Arc::new(EscapedTextRenderer));
        (surface, studio)
    }

    fn created(path: &str) -> VisualizationReply {
        VisualizationReply {
            status: "success".into(),
            plot_path: Some(path.into()),
            message: None,
        }
    }

    #[tokio::test]
    async fn submit_posts_request_and_shows_plot() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_visualization_reply(Ok(created("plots/sales.png")));
        let (surface, studio) = studio(backend.clone());
        studio.set_data_text("region,total\nEU,3\n");
        studio.set_query(" bar chart of totals ");
        studio.select_chart_type("bar");
        assert!(studio.can_create());

        let outcome = studio.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Completed(_)));
        let sent = backend.visualizations.lock().unwrap()[0].clone();
        assert_eq!(sent.data, "region,total\nEU,3");
        assert_eq!(sent.query, "bar chart of totals");
        assert_eq!(sent.chart_type, "bar");
        assert_eq!(studio.plot_url().as_deref(), Some("/static/plots/sales.png"));
        assert_eq!(
            *surface.plots.lock().unwrap(),
            vec!["/static/plots/sales.png".to_string()]
        );
        let log: Vec<_> = studio.log().into_iter().map(|m| m.content).collect();
        assert_eq!(
            log[1..],
            [
                "Starting visualization creation...".to_string(),
                "Visualization created successfully!".to_string()
            ]
        );
        assert!(!studio.is_busy());
    }

    #[tokio::test]
    async fn missing_query_is_rejected_with_toast() {
        let backend = Arc::new(FakeBackend::default());
        let (surface, studio) = studio(backend.clone());
        studio.set_data_text("a,b");
        assert!(!studio.can_create());
        assert_eq!(
            studio.submit().await,
            SubmitOutcome::Rejected(RejectReason::MissingInput)
        );
        assert_eq!(
            surface.toast_messages(),
            vec!["Please provide both data and visualization request".to_string()]
        );
        assert!(backend.visualizations.lock().unwrap().is_empty());
        assert!(!studio.is_busy());
        assert!(surface.busy.lock().unwrap().is_empty());
        assert_eq!(studio.log().len(), 1);
    }

    #[tokio::test]
    async fn backend_error_message_is_logged() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_visualization_reply(Ok(VisualizationReply {
            status: "error".into(),
            plot_path: None,
            message: None,
        }));
        let (surface, studio) = studio(backend);
        studio.set_data_text("x");
        studio.set_query("pie");

        let outcome = studio.submit().await;
        assert_eq!(outcome, SubmitOutcome::Failed("Unknown error occurred".into()));
        let last = studio.log().pop().unwrap();
        assert_eq!(last.role, Role::Error);
        assert_eq!(
            surface.toast_messages(),
            vec!["Visualization failed: Unknown error occurred".to_string()]
        );
        assert_eq!(studio.plot_url(), None);
    }

    #[tokio::test]
    async fn transport_error_and_unexpected_reply() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_visualization_reply(Err(ClientError::Status {
            status: 502,
            body: String::new(),
        }));
        backend.push_visualization_reply(Ok(VisualizationReply::default()));
        let (_, studio) = studio(backend);
        studio.set_data_text("x");
        studio.set_query("line");

        assert_eq!(
            studio.submit().await,
            SubmitOutcome::Failed("Visualization creation failed: HTTP error! status: 502".into())
        );
        assert_eq!(
            studio.submit().await,
            SubmitOutcome::Failed("Unexpected response format".into())
        );
    }

    #[tokio::test]
    async fn url_source_fetches_before_posting() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_fetch_reply(Ok("month,revenue\nJan,10\n".into()));
        backend.push_visualization_reply(Ok(created("p.png")));
        let (_, studio) = studio(backend.clone());
        studio.switch_source(DataSource::Url);
        studio.set_data_url("http://data.example/revenue.csv");
        studio.set_query("revenue by month");
        assert!(studio.can_create());

        assert!(matches!(studio.submit().await, SubmitOutcome::Completed(_)));
        assert_eq!(
            *backend.fetched.lock().unwrap(),
            vec!["http://data.example/revenue.csv".to_string()]
        );
        assert_eq!(
            backend.visualizations.lock().unwrap()[0].data,
            "month,revenue\nJan,10"
        );
    }

    #[tokio::test]
    async fn failed_url_fetch_leaves_no_data() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_fetch_reply(Err(ClientError::Transport("dns error".into())));
        let (surface, studio) = studio(backend.clone());
        studio.switch_source(DataSource::Url);
        studio.set_data_url("http://nowhere.invalid/x");
        studio.set_query("anything");

        assert_eq!(
            studio.submit().await,
            SubmitOutcome::Rejected(RejectReason::MissingInput)
        );
        assert_eq!(
            surface.toast_messages(),
            vec![
                "Error loading data from URL: transport error: dns error".to_string(),
                "Please provide both data and visualization request".to_string()
            ]
        );
        assert!(backend.visualizations.lock().unwrap().is_empty());
        assert_eq!(*surface.busy.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn seed_from_query_link_pretty_prints_data() {
        let (surface, studio) = studio(Arc::new(FakeBackend::default()));
        let link = visualization_link(Some(&json!([{"region":"EU"}])));
        studio.seed_from_link(&link).unwrap();
        assert_eq!(studio.data_text(), "[\n  {\n    \"region\": \"EU\"\n  }\n]");
        assert_eq!(studio.source(), DataSource::Text);
        assert_eq!(surface.toasts.lock().unwrap().len(), 1);

        assert!(studio.seed_from_link("%7Bnot-json").is_err());
        assert_eq!(
            surface.toast_messages().last().map(String::as_str),
            Some("Error loading data from URL")
        );
    }

    #[test]
    fn file_drop_loads_lossy_text_and_clear_all_resets() {
        let (surface, studio) = studio(Arc::new(FakeBackend::default()));
        studio.switch_source(DataSource::File);
        assert!(!studio.can_create());
        studio.on_file_drop(FileUpload::new("d.csv", b"a\xffb".to_vec()));
        studio.set_query("histogram");
        assert!(studio.can_create());
        assert_eq!(studio.data_text(), "a\u{fffd}b");

        studio.clear_all();
        assert!(!studio.can_create());
        assert_eq!(studio.data_text(), "");
        assert_eq!(studio.source(), DataSource::File);
        assert_eq!(studio.log().len(), 1);
        assert_eq!(studio.log()[0].content, "Processing Log");
        assert_eq!(
            *surface.plot_clears.lock().unwrap(),
            vec!["Your visualization will appear here".to_string()]
        );
        assert_eq!(
            surface.toast_messages().last().map(String::as_str),
            Some("All fields cleared")
        );
    }
}
