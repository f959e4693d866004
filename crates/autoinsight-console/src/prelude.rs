//! Common imports for wiring a console into a front end.
pub use crate::{
    AnalysisChat, Backend, ClientConfig, ClientError, ContentRenderer, DataSource,
    DisplayMessage, FileUpload, HttpBackend, NullSurface, QueryConsole, RejectReason, Role,
    SubmitOutcome, Surface, Toast, ToastLevel, VisualizationStudio, default_renderer,
};
