use super::{NoteContext, NoteRenderer};
use crate::domain::ReleaseMetadata;
use crate::error::Result;

/// Underline characters for series, version and category titles
const TITLE_CHARS: [char; 4] = ['=', '-', '^', '~'];

/// Release notes in reStructuredText, for the documentation's release history.
///
/// Opens with a `Series M.m` title (major releases only), the version anchor
/// and title, and the release date.
#[derive(Debug, Clone)]
pub struct RstNotes {
    context: NoteContext,
    lines: Vec<String>,
}

impl RstNotes {
    /// `citation_prefix` names the bibliography key of a release series.
    pub fn new(metadata: &ReleaseMetadata, body: &str, citation_prefix: &str) -> Result<Self> {
        Self::with_date(
            metadata,
            body,
            citation_prefix,
            chrono::Local::now().date_naive(),
        )
    }

    pub fn with_date(
        metadata: &ReleaseMetadata,
        body: &str,
        citation_prefix: &str,
        date: chrono::NaiveDate,
    ) -> Result<Self> {
        let release = metadata.require_release()?.to_string();
        let mut context = NoteContext::new(metadata);
        context.date = date;
        let mut notes = RstNotes {
            context,
            lines: Vec::new(),
        };

        if metadata.is_major() {
            if let Some((major, minor, _)) = metadata.version()? {
                notes.title(&format!("Series {}.{}", major, minor), 0);
                notes.paragraph(&format!(
                    "Major development version {major}.{minor} can be referenced at \
                     :cite:t:`{citation_prefix}-{major}-{minor}`."
                ));
            }
        }

        notes.lines.push(format!(".. _release_v{}:", release));
        notes.lines.push(String::new());
        notes.title(&format!("Version {}", release), 1);
        notes
            .lines
            .push(format!("*Released {}*", date.format("%Y/%m/%d")));
        notes.lines.push(String::new());
        if !body.trim().is_empty() {
            notes.paragraph(body);
        }
        Ok(notes)
    }
}

impl NoteRenderer for RstNotes {
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
        let ch = TITLE_CHARS[level.min(TITLE_CHARS.len() - 1)];
        vec![
            title.to_string(),
            ch.to_string().repeat(title.chars().count()),
        ]
    }

    /// Inline literals in RST take double backticks
    fn escape(&self, text: &str) -> String {
        text.replace('`', "``")
    }
}
