use super::{NoteContext, NoteRenderer};
use crate::domain::ReleaseMetadata;

/// Release notes in GitHub-flavored Markdown, for the code host's release page.
///
/// The free-text body comes first, ahead of any section.
#[derive(Debug, Clone)]
pub struct MarkdownNotes {
    context: NoteContext,
    lines: Vec<String>,
}

impl MarkdownNotes {
    pub fn new(metadata: &ReleaseMetadata, body: &str) -> Self {
        let mut lines = Vec::new();
        if !body.trim().is_empty() {
            lines.push(body.trim_end().to_string());
            lines.push(String::new());
        }
        MarkdownNotes {
            context: NoteContext::new(metadata),
            lines,
        }
    }
}

impl NoteRenderer for MarkdownNotes {
    fn context(&self) -> &NoteContext {
        &self.context
    }

    fn lines(&self) -> &[String] {
        &self.lines
    }

    fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }

    fn make_title(&self, title: &str, level: usize) -> Vec<String> {
        vec![format!("{} {}", "#".repeat(level.max(1)), title)]
    }
}
