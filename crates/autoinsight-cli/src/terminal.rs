//! Line-oriented [`Surface`] for a terminal.
//!
//! Transcript entries go to stdout; status lines and toasts go to stderr.

use std::io::Write as _;
use std::sync::Mutex;

use autoinsight_console::{
    DisplayMessage, RemoteFile, Surface, Toast, ToastLevel, file_kind, format_file_size,
};

pub struct TerminalSurface {
    html: bool,
    base_url: String,
    out: Mutex<()>,
}

impl TerminalSurface {
    pub fn new(html: bool, base_url: impl Into<String>) -> Self {
        Self {
            html,
            base_url: base_url.into(),
            out: Mutex::new(()),
        }
    }

    fn entry_text(&self, message: &DisplayMessage, html: &str) -> String {
        let body = if self.html { html } else { message.content.as_str() };
        format!(
            "[{}] {}\n{}\n",
            message.time_label(),
            message.header("Assistant"),
            body.trim_end()
        )
    }

    fn write_stdout(&self, text: &str) {
        let _guard = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{text}");
        let _ = stdout.flush();
    }
}

impl Surface for TerminalSurface {
    fn append_message(&self, message: &DisplayMessage, html: &str) {
        self.write_stdout(&self.entry_text(message, html));
    }

    fn set_busy(&self, busy: bool, status: &str) {
        if busy {
            eprintln!("… {status}");
        }
    }

    fn notify(&self, toast: &Toast) {
        let mark = match toast.level {
            ToastLevel::Success => "✔",
            ToastLevel::Error => "✖",
        };
        eprintln!("{mark} {}", toast.message);
    }

    fn show_files(&self, files: &[RemoteFile]) {
        if files.is_empty() {
            self.write_stdout("No files available");
            return;
        }
        let listing = files
            .iter()
            .map(|f| {
                format!(
                    "{:<6} {:<40} {}",
                    file_kind(&f.name),
                    f.name,
                    format_file_size(f.size)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.write_stdout(&listing);
    }

    fn show_plot(&self, plot_url: &str) {
        self.write_stdout(&format!("Plot: {}", absolute_url(&self.base_url, plot_url)));
    }
}

/// Joins a server-relative path such as `/static/plot.png` onto the base URL.
pub fn absolute_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
