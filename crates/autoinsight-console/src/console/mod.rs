//! The three interaction surfaces of the application.
//!
//! Each console is an explicit instance built at startup from a backend, a
//! surface and a content renderer; front ends call its handler methods
//! (`submit`, `on_file_drop`, `clear`, ...) and receive updates through the
//! [`crate::surface::Surface`] it was built with.

mod chat;
mod query;
mod studio;

pub use chat::{ALLOWED_EXTENSIONS, AnalysisChat, file_kind, format_file_size};
pub use query::QueryConsole;
pub use studio::{DataSource, VisualizationStudio};
