//! Backend endpoints as seen by the consoles.
//!
//! [`Backend`] is the seam between consoles and the network; [`HttpBackend`]
//! talks to the real service with reqwest, tests plug in fakes.

mod http;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ClientError;
use crate::stream::EventStream;

pub use http::HttpBackend;

/// Reply of an agent endpoint: either one JSON object or a frame stream.
pub enum AgentReply {
    Json(JsonReply),
    Stream(EventStream),
}

impl std::fmt::Debug for AgentReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(reply) => f.debug_tuple("Json").field(reply).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Single-object reply of `/database_query` and `/analyze_data`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub has_data: bool,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Entry of `/list_files`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// A local file to send to `/upload_file`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lower-cased extension including the dot (`.csv`), if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        (!ext.is_empty()).then(|| format!(".{}", ext.to_ascii_lowercase()))
    }
}

/// Reply of `/upload_file`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadReply {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Body of `/create_visualization`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationRequest {
    pub data: String,
    pub query: String,
    /// Empty when no chart type was chosen.
    pub chart_type: String,
}

/// Raw reply of `/create_visualization`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub plot_path: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// [`VisualizationReply`] narrowed to the cases the studio handles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisualizationOutcome {
    Created { plot_path: String },
    Failed { message: String },
    Unexpected,
}

impl VisualizationReply {
    pub fn outcome(&self) -> VisualizationOutcome {
        match (self.status.as_str(), self.plot_path.as_deref()) {
            ("success", Some(path)) if !path.is_empty() => VisualizationOutcome::Created {
                plot_path: path.to_string(),
            },
            ("error", _) => VisualizationOutcome::Failed {
                message: self
                    .message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Unknown error occurred".to_string()),
            },
            _ => VisualizationOutcome::Unexpected,
        }
    }
}

/// Backend endpoints used by the consoles.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// `POST /database_query`
    async fn database_query(&self, query: &str) -> Result<AgentReply, ClientError>;

    /// `POST /analyze_data`
    async fn analyze_data(&self, message: &str, filename: &str)
    -> Result<AgentReply, ClientError>;

    /// `GET /list_files`
    async fn list_files(&self) -> Result<Vec<RemoteFile>, ClientError>;

    /// `POST /upload_file` (multipart)
    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadReply, ClientError>;

    /// `POST /create_visualization`
    async fn create_visualization(
        &self,
        request: &VisualizationRequest,
    ) -> Result<VisualizationReply, ClientError>;

    /// `GET <url>` returning the body as text (visualization data by URL).
    async fn fetch_text(&self, url: &str) -> Result<String, ClientError>;
}

/// Studio link pre-seeded with query result data: `/visualization?data=<json>`.
pub fn visualization_link(data: Option<&Value>) -> String {
    match data {
        Some(data) => format!(
            "/visualization?data={}",
            urlencoding::encode(&data.to_string())
        ),
        None => "/visualization".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn visualization_outcome_narrowing() {
        let ok = VisualizationReply {
            status: "success".into(),
            plot_path: Some("plots/a.png".into()),
            message: None,
        };
        assert_eq!(
            ok.outcome(),
            VisualizationOutcome::Created {
                plot_path: "plots/a.png".into()
            }
        );
        let err: VisualizationReply =
            serde_json::from_value(json!({"status":"error","message":"no data"})).unwrap();
        assert_eq!(
            err.outcome(),
            VisualizationOutcome::Failed {
                message: "no data".into()
            }
        );
        let odd: VisualizationReply = serde_json::from_value(json!({"status":"success"})).unwrap();
        assert_eq!(odd.outcome(), VisualizationOutcome::Unexpected);
    }

    #[test]
    fn visualization_link_encodes_data() {
        assert_eq!(visualization_link(None), "/visualization");
        let link = visualization_link(Some(&json!([{"region":"EU","total":3}])));
        assert_eq!(
            link,
            "/visualization?data=%5B%7B%22region%22%3A%22EU%22%2C%22total%22%3A3%7D%5D"
        );
    }

    #[test]
    fn upload_extension_is_lowercased() {
        assert_eq!(
            FileUpload::new("Sales.CSV", b"a".to_vec()).extension().as_deref(),
            Some(".csv")
        );
        assert_eq!(FileUpload::new("README", Vec::new()).extension(), None);
    }

    #[test]
    fn json_reply_defaults_missing_fields() {
        let reply: JsonReply = serde_json::from_value(json!({"response":"ok"})).unwrap();
        assert_eq!(reply.response.as_deref(), Some("ok"));
        assert!(!reply.has_data);
        assert!(reply.data.is_none());
    }
}
