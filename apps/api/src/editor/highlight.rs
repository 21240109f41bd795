/// The last non-empty text the user selected inside the editing surface.
/// Session-only; never written into the resume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextHighlight {
    text: Option<String>,
}

impl TextHighlight {
    /// Records the current selection. An empty (or whitespace-only)
    /// selection clears the highlight.
    pub fn record_selection(&mut self, selection: &str) {
        self.text = if selection.trim().is_empty() {
            None
        } else {
            Some(selection.to_string())
        };
    }

    pub fn current(&self) -> Option<&str> {
        self.text.as_deref()
    }
}
