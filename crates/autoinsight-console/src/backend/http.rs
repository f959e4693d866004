use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::{
    AgentReply, Backend, FileUpload, JsonReply, RemoteFile, UploadReply, VisualizationReply,
    VisualizationRequest,
};
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::stream::event_stream;

/// [`Backend`] over HTTP with reqwest.
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    /// Creates a backend from explicit client configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a backend from `AUTOINSIGHT_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post_agent(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<AgentReply, ClientError> {
        let url = self.config.endpoint(path);
        debug!(event = "http.agent_request", domain = "http", path, "posting agent request");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ClientError::transport)?;
        let response = ensure_success(response).await?;

        if is_streaming(&response) {
            debug!(event = "http.agent_stream", domain = "http", path, "consuming streamed reply");
            let events = event_stream(response.bytes_stream());
            return Ok(AgentReply::Stream(Box::pin(events)));
        }
        let reply = response
            .json::<JsonReply>()
            .await
            .map_err(ClientError::decode)?;
        Ok(AgentReply::Json(reply))
    }
}

fn is_streaming(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/plain") || ct.contains("text/event-stream")
        })
        .unwrap_or(false)
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    debug!(
        event = "http.status_error",
        domain = "http",
        status = status.as_u16(),
        "backend returned non-success status"
    );
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn database_query(&self, query: &str) -> Result<AgentReply, ClientError> {
        self.post_agent("/database_query", serde_json::json!({ "query": query }))
            .await
    }

    async fn analyze_data(
        &self,
        message: &str,
        filename: &str,
    ) -> Result<AgentReply, ClientError> {
        self.post_agent(
            "/analyze_data",
            serde_json::json!({ "message": message, "filename": filename }),
        )
        .await
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, ClientError> {
        let response = self
            .client
            .get(self.config.endpoint("/list_files"))
            .send()
            .await
            .map_err(ClientError::transport)?;
        ensure_success(response)
            .await?
            .json::<Vec<RemoteFile>>()
            .await
            .map_err(ClientError::decode)
    }

    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadReply, ClientError> {
        let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);
        debug!(
            event = "http.upload",
            domain = "http",
            file = %upload.name,
            bytes = upload.bytes.len() as u64,
            "uploading file"
        );
        let response = self
            .client
            .post(self.config.endpoint("/upload_file"))
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::transport)?;
        ensure_success(response)
            .await?
            .json::<UploadReply>()
            .await
            .map_err(ClientError::decode)
    }

    async fn create_visualization(
        &self,
        request: &VisualizationRequest,
    ) -> Result<VisualizationReply, ClientError> {
        let response = self
            .client
            .post(self.config.endpoint("/create_visualization"))
            .json(request)
            .send()
            .await
            .map_err(ClientError::transport)?;
        ensure_success(response)
            .await?
            .json::<VisualizationReply>()
            .await
            .map_err(ClientError::decode)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ClientError::transport)?;
        let bytes = ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(ClientError::transport)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
