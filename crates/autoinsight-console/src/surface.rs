//! View-side contract implemented by a front end (terminal, web view, tests).
//!
//! Consoles call these hooks; they never look up UI state on their own.

use crate::backend::RemoteFile;
use crate::message::DisplayMessage;

/// Severity of a transient notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

/// A transient notification ("toast").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

/// One interaction surface as seen by its console.
///
/// Only [`Surface::append_message`], [`Surface::set_busy`] and
/// [`Surface::notify`] are required; the rest default to no-ops for surfaces
/// that do not show the affordance.
pub trait Surface: Send + Sync {
    /// Appends a rendered entry to the transcript view.
    fn append_message(&self, message: &DisplayMessage, html: &str);

    /// Scrolls the transcript view to its newest entry.
    fn scroll_to_latest(&self) {}

    /// Replaces the whole transcript view with a single placeholder entry.
    fn reset_transcript(&self, _placeholder: &DisplayMessage, _html: &str) {}

    /// Enables or disables input affordances and the busy indicator.
    fn set_busy(&self, busy: bool, status: &str);

    /// Shows a transient notification.
    fn notify(&self, toast: &Toast);

    /// Shows or hides the "visualize" affordance.
    fn set_visualize_available(&self, _available: bool) {}

    /// Replaces the list of server-side files.
    fn show_files(&self, _files: &[RemoteFile]) {}

    /// Displays a generated chart.
    fn show_plot(&self, _plot_url: &str) {}

    /// Removes the displayed chart and shows the preview placeholder instead.
    fn clear_plot(&self, _placeholder: &str) {}
}

/// Surface that discards everything; handy for headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn append_message(&self, _message: &DisplayMessage, _html: &str) {}

    fn set_busy(&self, _busy: bool, _status: &str) {}

    fn notify(&self, _toast: &Toast) {}
}
