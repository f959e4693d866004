//! In-memory [`Backend`] for console tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;

use crate::backend::{
    AgentReply, Backend, FileUpload, RemoteFile, UploadReply, VisualizationReply,
    VisualizationRequest,
};
use crate::errors::ClientError;

/// Scripted backend: replies are queued up front and popped per call.
///
/// With [`FakeBackend::hold_agent_replies`] an agent call stays in flight
/// until [`FakeBackend::release_agent_replies`] is called.
#[derive(Default)]
pub struct FakeBackend {
    pub agent_calls: AtomicUsize,
    /// `(text, filename)` of each agent call; filename is empty for queries.
    pub agent_requests: Mutex<Vec<(String, String)>>,
    agent_replies: Mutex<VecDeque<Result<AgentReply, ClientError>>>,
    hold: AtomicBool,
    called: Notify,
    release: Notify,

    pub list_calls: AtomicUsize,
    files: Mutex<VecDeque<Result<Vec<RemoteFile>, ClientError>>>,

    pub uploads: Mutex<Vec<FileUpload>>,
    upload_replies: Mutex<VecDeque<Result<UploadReply, ClientError>>>,

    pub visualizations: Mutex<Vec<VisualizationRequest>>,
    visualization_replies: Mutex<VecDeque<Result<VisualizationReply, ClientError>>>,

    pub fetched: Mutex<Vec<String>>,
    fetch_replies: Mutex<VecDeque<Result<String, ClientError>>>,
}

impl FakeBackend {
    pub fn push_agent_reply(&self, reply: Result<AgentReply, ClientError>) {
        self.agent_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_files(&self, files: Result<Vec<RemoteFile>, ClientError>) {
        self.files.lock().unwrap().push_back(files);
    }

    pub fn push_upload_reply(&self, reply: Result<UploadReply, ClientError>) {
        self.upload_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_visualization_reply(&self, reply: Result<VisualizationReply, ClientError>) {
        self.visualization_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_fetch_reply(&self, reply: Result<String, ClientError>) {
        self.fetch_replies.lock().unwrap().push_back(reply);
    }

    pub fn hold_agent_replies(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release_agent_replies(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    /// Resolves once an agent call has reached the backend.
    pub async fn wait_for_agent_call(&self) {
        self.called.notified().await;
    }

    async fn agent(&self, text: &str, filename: &str) -> Result<AgentReply, ClientError> {
        self.agent_calls.fetch_add(1, Ordering::SeqCst);
        self.agent_requests
            .lock()
            .unwrap()
            .push((text.to_string(), filename.to_string()));
        self.called.notify_one();
        if self.hold.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        self.agent_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Transport("no scripted reply".into())))
    }
}

fn next<T>(queue: &Mutex<VecDeque<Result<T, ClientError>>>) -> Result<T, ClientError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(ClientError::Transport("no scripted reply".into())))
}

#[async_trait::async_trait]
impl Backend for FakeBackend {
    async fn database_query(&self, query: &str) -> Result<AgentReply, ClientError> {
        self.agent(query, "").await
    }

    async fn analyze_data(
        &self,
        message: &str,
        filename: &str,
    ) -> Result<AgentReply, ClientError> {
        self.agent(message, filename).await
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.files)
    }

    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadReply, ClientError> {
        self.uploads.lock().unwrap().push(upload.clone());
        next(&self.upload_replies)
    }

    async fn create_visualization(
        &self,
        request: &VisualizationRequest,
    ) -> Result<VisualizationReply, ClientError> {
        self.visualizations.lock().unwrap().push(request.clone());
        next(&self.visualization_replies)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ClientError> {
        self.fetched.lock().unwrap().push(url.to_string());
        next(&self.fetch_replies)
    }
}
