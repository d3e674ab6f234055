//! Paragraph segmentation of streamed text.

/// Blank-line boundary that ends a paragraph.
const BOUNDARY: &str = "\n\n";

/// Accumulates streamed text: the full reply, and the paragraph pending since the last flush.
///
/// When emitting is enabled, a pending paragraph is released as soon as it ends with a blank line
/// and has non-whitespace content. Released paragraphs have their leading and trailing `'\n'`
/// removed; the full reply is never altered.
#[derive(Debug, Default)]
pub struct ParagraphBuffer {
    emit: bool,
    full: String,
    pending: String,
}

impl ParagraphBuffer {
    /// `emit = false` only accumulates (dossier requests).
    pub fn new(emit: bool) -> Self {
        Self {
            emit,
            ..Default::default()
        }
    }

    /// Adds a fragment; returns a finished paragraph when one is ready.
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        self.full.push_str(fragment);
        self.pending.push_str(fragment);

        if self.emit && self.pending.ends_with(BOUNDARY) && !self.pending.trim().is_empty() {
            let paragraph = self.pending.trim_matches('\n').to_string();
            self.pending.clear();
            return Some(paragraph);
        }
        None
    }

    /// Text received so far.
    pub fn full_response(&self) -> &str {
        &self.full
    }

    /// Ends the stream: the full reply, and the trailing paragraph if it has content.
    pub fn finish(self) -> (String, Option<String>) {
        let trailing = if self.emit && !self.pending.trim().is_empty() {
            Some(self.pending.trim_matches('\n').to_string())
        } else {
            None
        };
        (self.full, trailing)
    }
}
