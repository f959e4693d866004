use crate::message::{DisplayMessage, Role};

/// Ordered, append-only list of transcript entries.
///
/// The only way to remove entries is [`Transcript::clear`], which resets the
/// transcript to a single placeholder entry.
#[derive(Clone, Debug)]
pub struct Transcript {
    placeholder: String,
    entries: Vec<DisplayMessage>,
}

impl Transcript {
    /// Creates a transcript holding only the placeholder entry.
    pub fn new(placeholder: impl Into<String>) -> Self {
        let placeholder = placeholder.into();
        let entries = vec![DisplayMessage::new(Role::System, placeholder.clone())];
        Self {
            placeholder,
            entries,
        }
    }

    pub fn push(&mut self, message: DisplayMessage) {
        self.entries.push(message);
    }

    /// Drops every entry and re-inserts a fresh placeholder, which is returned.
    pub fn clear(&mut self) -> &DisplayMessage {
        self.entries.clear();
        self.entries
            .push(DisplayMessage::new(Role::System, self.placeholder.clone()));
        &self.entries[0]
    }

    pub fn entries(&self) -> &[DisplayMessage] {
        &self.entries
    }

}
