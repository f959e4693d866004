use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::backend::{Backend, FileUpload, RemoteFile};
use crate::controller::{RejectReason, RequestController, SubmitOutcome};
use crate::errors::ClientError;
use crate::markdown::ContentRenderer;
use crate::message::DisplayMessage;
use crate::render::MessageRenderer;
use crate::surface::{Surface, Toast};

/// Extensions `/upload_file` accepts, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 5] = [".csv", ".xlsx", ".xls", ".json", ".txt"];

const PLACEHOLDER: &str =
    "Upload a data file or pick one from the list, then ask a question about it.";

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let rounded = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{rounded} {}", UNITS[unit])
}

/// Icon hint for a file name: `csv`, `excel`, `code` or `alt`.
pub fn file_kind(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "csv" => "csv",
        "xlsx" | "xls" => "excel",
        "json" => "code",
        _ => "alt",
    }
}

/// Upload-and-chat data analysis console (`/upload_file`, `/list_files`,
/// `/analyze_data`).
///
/// Uploads and analysis requests are guarded separately, so a file can be
/// uploaded while an answer is still streaming in.
pub struct AnalysisChat {
    backend: Arc<dyn Backend>,
    surface: Arc<dyn Surface>,
    chat: RequestController,
    upload: RequestController,
    renderer: MessageRenderer,
    selected: Mutex<Option<String>>,
    files: Mutex<Vec<RemoteFile>>,
}

impl AnalysisChat {
    pub fn new(
        backend: Arc<dyn Backend>,
        surface: Arc<dyn Surface>,
        content: Arc<dyn ContentRenderer>,
    ) -> Self {
        Self {
            chat: RequestController::new("chat", surface.clone(), "Analyzing...", "Ready"),
            upload: RequestController::new("upload", surface.clone(), "Uploading file...", "Ready"),
            renderer: MessageRenderer::new(surface.clone(), content, PLACEHOLDER)
                .with_agent_label("AI Assistant"),
            backend,
            surface,
            selected: Mutex::new(None),
            files: Mutex::new(Vec::new()),
        }
    }

    /// Reloads the server-side file list and shows it.
    pub async fn refresh_files(&self) -> Result<Vec<RemoteFile>, ClientError> {
        match self.backend.list_files().await {
            Ok(files) => {
                self.surface.show_files(&files);
                *lock(&self.files) = files.clone();
                Ok(files)
            }
            Err(err) => {
                warn!(event = "chat.list_files_failed", domain = "chat", error = %err);
                Err(err)
            }
        }
    }

    pub fn select_file(&self, name: &str) {
        *lock(&self.selected) = Some(name.to_string());
        self.renderer
            .append(DisplayMessage::system(format!("Selected file: {name}")));
        self.surface.notify(&Toast::success(format!("Selected {name}")));
    }

    /// Drop handler; same as [`AnalysisChat::upload`].
    pub async fn on_file_drop(&self, upload: FileUpload) -> SubmitOutcome {
        self.upload(upload).await
    }

    /// Uploads one file and selects it on success.
    pub async fn upload(&self, upload: FileUpload) -> SubmitOutcome {
        let extension = upload.extension().unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            self.surface.notify(&Toast::error(
                "Please upload a CSV, Excel, JSON, or text file.",
            ));
            return SubmitOutcome::Rejected(RejectReason::UnsupportedFileType(extension));
        }
        let Some(_busy) = self.upload.try_begin() else {
            return SubmitOutcome::Rejected(RejectReason::Busy);
        };
        info!(
            event = "chat.upload",
            domain = "chat",
            file = %upload.name,
            bytes = upload.bytes.len() as u64
        );

        let failure = match self.backend.upload_file(&upload).await {
            Ok(reply) if reply.is_success() => None,
            Ok(reply) => Some(
                reply
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Upload failed".to_string()),
            ),
            Err(err) => Some(err.to_string()),
        };

        if let Some(reason) = failure {
            warn!(event = "chat.upload_failed", domain = "chat", file = %upload.name, reason = %reason);
            let message = format!("Upload failed: {reason}");
            self.renderer.append(DisplayMessage::error(message.clone()));
            self.surface.notify(&Toast::error(message.clone()));
            return SubmitOutcome::Failed(message);
        }

        self.renderer.append(DisplayMessage::system(format!(
            "File \"{}\" uploaded successfully!",
            upload.name
        )));
        *lock(&self.selected) = Some(upload.name.clone());
        // The upload itself succeeded; a stale list is only logged.
        let _ = self.refresh_files().await;
        self.surface.notify(&Toast::success("File uploaded successfully!"));
        SubmitOutcome::Completed(Default::default())
    }

    /// Asks the agent about the selected file.
    pub async fn submit(&self, message: &str) -> SubmitOutcome {
        let message = message.trim();
        if message.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }
        if self.chat.is_busy() {
            return SubmitOutcome::Rejected(RejectReason::Busy);
        }
        let Some(filename) = self.selected_file() else {
            self.surface.notify(&Toast::error("Please select a file first"));
            return SubmitOutcome::Rejected(RejectReason::NoFileSelected);
        };
        let Some(_busy) = self.chat.try_begin() else {
            return SubmitOutcome::Rejected(RejectReason::Busy);
        };
        self.renderer.append(DisplayMessage::user(message));
        let generation = self.renderer.generation();
        info!(event = "chat.submitted", domain = "chat", file = %filename);

        match self.backend.analyze_data(message, &filename).await {
            Ok(reply) => {
                let settlement = self
                    .chat
                    .dispatch(reply, &self.renderer, "Analysis completed.", generation)
                    .await;
                SubmitOutcome::Completed(settlement)
            }
            Err(err) => {
                warn!(event = "chat.failed", domain = "chat", error = %err);
                let message = format!("Analysis failed: {err}");
                self.renderer.append(DisplayMessage::error(message.clone()));
                self.surface.notify(&Toast::error(message.clone()));
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Resets the transcript; the file selection is kept.
    pub fn clear(&self) {
        self.renderer.clear();
    }

    pub fn selected_file(&self) -> Option<String> {
        lock(&self.selected).clone()
    }

    /// Files from the last successful [`AnalysisChat::refresh_files`].
    pub fn files(&self) -> Vec<RemoteFile> {
        lock(&self.files).clone()
    }

    pub fn transcript(&self) -> Vec<DisplayMessage> {
        self.renderer.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.chat.is_busy()
    }

    pub fn is_uploading(&self) -> bool {
        self.upload.is_busy()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AgentReply, JsonReply, UploadReply};
    use crate::markdown::EscapedTextRenderer;
    use crate::message::Role;
    use crate::surface::testing::RecordingSurface;
    use crate::testing::FakeBackend;
    use std::sync::atomic::Ordering;

    fn chat(backend: Arc<FakeBackend>) -> (Arc<RecordingSurface>, AnalysisChat) {
        let surface = Arc::new(RecordingSurface::default());
        let chat = AnalysisChat::new(backend, surface.clone(), Arc::new(EscapedTextRenderer));
        (surface, chat)
    }

    fn sales_csv() -> FileUpload {
        FileUpload::new("sales.csv", b"region,total\nEU,3\n".to_vec())
    }

    #[test]
    fn file_size_formatting() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
        assert_eq!(format_file_size(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn file_kind_by_extension() {
        assert_eq!(file_kind("a.CSV"), "csv");
        assert_eq!(file_kind("b.xls"), "excel");
        assert_eq!(file_kind("c.json"), "code");
        assert_eq!(file_kind("notes"), "alt");
    }

    #[tokio::test]
    async fn upload_error_keeps_selection_empty() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_upload_reply(Ok(UploadReply {
            status: "error".into(),
            message: Some("bad format".into()),
        }));
        let (surface, chat) = chat(backend.clone());

        let outcome = chat.upload(sales_csv()).await;
        assert_eq!(outcome, SubmitOutcome::Failed("Upload failed: bad format".into()));
        assert_eq!(chat.selected_file(), None);
        let last = chat.transcript().pop().unwrap();
        assert_eq!(last.role, Role::Error);
        assert!(last.content.contains("bad format"));
        assert!(!chat.is_uploading());
        assert!(!surface.busy_now());
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upload_success_selects_and_refreshes() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_upload_reply(Ok(UploadReply {
            status: "success".into(),
            message: None,
        }));
        backend.push_files(Ok(vec![RemoteFile {
            name: "sales.csv".into(),
            size: 18,
        }]));
        let (surface, chat) = chat(backend.clone());

        assert!(matches!(
            chat.on_file_drop(sales_csv()).await,
            SubmitOutcome::Completed(_)
        ));
        assert_eq!(chat.selected_file().as_deref(), Some("sales.csv"));
        assert_eq!(chat.files().len(), 1);
        assert_eq!(surface.files.lock().unwrap().len(), 1);
        assert_eq!(
            chat.transcript().last().unwrap().content,
            "File \"sales.csv\" uploaded successfully!"
        );
        assert_eq!(backend.uploads.lock().unwrap()[0].name, "sales.csv");
        assert_eq!(
            surface.toast_messages(),
            vec!["File uploaded successfully!".to_string()]
        );
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected_before_upload() {
        let backend = Arc::new(FakeBackend::default());
        let (surface, chat) = chat(backend.clone());
        let outcome = chat.upload(FileUpload::new("report.PDF", Vec::new())).await;
        assert_eq!(
            outcome,
            SubmitOutcome::Rejected(RejectReason::UnsupportedFileType(".pdf".into()))
        );
        assert!(backend.uploads.lock().unwrap().is_empty());
        assert!(surface.busy.lock().unwrap().is_empty());
        assert_eq!(surface.toasts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_without_file_toasts_and_sends_nothing() {
        let backend = Arc::new(FakeBackend::default());
        let (surface, chat) = chat(backend.clone());
        let outcome = chat.submit("what is the average?").await;
        assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::NoFileSelected));
        assert_eq!(
            surface.toast_messages(),
            vec!["Please select a file first".to_string()]
        );
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(backend.agent_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submit_sends_message_with_selected_file() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_agent_reply(Ok(AgentReply::Json(JsonReply::default())));
        let (_, chat) = chat(backend.clone());
        chat.select_file("sales.csv");

        let outcome = chat.submit("  average total?  ").await;
        assert!(matches!(outcome, SubmitOutcome::Completed(_)));
        assert_eq!(
            backend.agent_requests.lock().unwrap()[0],
            ("average total?".to_string(), "sales.csv".to_string())
        );
        let transcript = chat.transcript();
        let reply = transcript.last().unwrap();
        assert_eq!(reply.content, "Analysis completed.");
        assert_eq!(reply.source.as_deref(), Some("AI Assistant"));
        assert_eq!(reply.header("Assistant"), "AI Assistant");
    }

    #[tokio::test]
    async fn submit_while_analyzing_is_dropped() {
        let backend = Arc::new(FakeBackend::default());
        backend.hold_agent_replies();
        backend.push_agent_reply(Ok(AgentReply::Json(JsonReply::default())));
        let (_, chat) = chat(backend.clone());
        chat.select_file("sales.csv");

        let first = chat.submit("one");
        let second = async {
            backend.wait_for_agent_call().await;
            let outcome = chat.submit("two").await;
            backend.release_agent_replies();
            outcome
        };
        let (first, second) = tokio::join!(first, second);
        assert!(matches!(first, SubmitOutcome::Completed(_)));
        assert_eq!(second, SubmitOutcome::Rejected(RejectReason::Busy));
        assert_eq!(backend.agent_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn list_failure_is_reported_and_keeps_previous_files() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_files(Ok(vec![RemoteFile {
            name: "a.csv".into(),
            size: 1,
        }]));
        backend.push_files(Err(ClientError::Transport("connection refused".into())));
        let (_, chat) = chat(backend);
        chat.refresh_files().await.unwrap();
        assert!(chat.refresh_files().await.is_err());
        assert_eq!(chat.files()[0].name, "a.csv");
    }
}
