//! Release-note renderers.
//!
//! A renderer is an accumulator: every call appends one section and
//! [NoteRenderer::render] concatenates them in call order. Nothing is sorted
//! or deduplicated across sections; ordering is the caller's job.
//!
//! ```
//! use git_release_notes::domain::{MergeBases, ReleaseMetadata};
//! use git_release_notes::notes::{MarkdownNotes, NoteRenderer};
//!
//! let md = ReleaseMetadata::new(Some("1.3.0"), MergeBases::Since("v1.2.0".into()), "main");
//! let mut notes = MarkdownNotes::new(&md, "Intro text.");
//! notes.changelog_line("org", "proj");
//! assert!(notes.render().contains("compare/v1.2.0...v1.3.0"));
//! ```

pub mod markdown;
pub mod rst;

pub use markdown::MarkdownNotes;
pub use rst::RstNotes;

use chrono::NaiveDate;

use crate::attribution::Ranking;
use crate::categorize::PullSorter;
use crate::domain::{format_user, sort_by_family_name, ReleaseMetadata, UserProfile};
use crate::error::Result;
use crate::profile::ProfileLookup;

/// Release details substituted into rendered text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteContext {
    pub release: Option<String>,
    pub merge_base: String,
    pub target_branch: String,
    pub date: NaiveDate,
}

impl NoteContext {
    pub fn new(metadata: &ReleaseMetadata) -> Self {
        NoteContext {
            release: metadata.release().map(str::to_string),
            merge_base: metadata.merge_bases().primary().to_string(),
            target_branch: metadata.target_branch().to_string(),
            date: chrono::Local::now().date_naive(),
        }
    }

    /// Ref the changelog compares up to: the release tag when known
    pub fn head_ref(&self) -> String {
        match &self.release {
            Some(release) => format!("v{}", release),
            None => self.target_branch.clone(),
        }
    }
}

/// Shared contract of the Markdown and reStructuredText renderers
pub trait NoteRenderer {
    fn context(&self) -> &NoteContext;

    /// Lines accumulated so far
    fn lines(&self) -> &[String];

    fn lines_mut(&mut self) -> &mut Vec<String>;

    /// Heading markup; level 0 is the outermost
    fn make_title(&self, title: &str, level: usize) -> Vec<String>;

    /// Escape inline text for this markup
    fn escape(&self, text: &str) -> String {
        text.to_string()
    }

    fn title(&mut self, title: &str, level: usize) {
        let lines = self.make_title(title, level);
        let out = self.lines_mut();
        out.extend(lines);
        out.push(String::new());
    }

    fn itemize(&mut self, items: Vec<String>) {
        let out = self.lines_mut();
        out.extend(items.into_iter().map(|item| format!("* {}", item)));
        out.push(String::new());
    }

    fn paragraph(&mut self, text: &str) {
        let out = self.lines_mut();
        out.extend(text.lines().map(|line| line.trim().to_string()));
        out.push(String::new());
    }

    /// One titled list per non-empty category, in rule order
    fn sorted_pulls(&mut self, pulls: &PullSorter) {
        for section in pulls.sections() {
            let items = section
                .pulls
                .iter()
                .map(|pr| format!("{} *(@{}, #{})*", self.escape(&pr.title), pr.author, pr.id))
                .collect();
            self.title(&section.rule.title, 2);
            self.itemize(items);
        }
    }

    /// Credit reviewers in ranking order; an empty ranking adds nothing.
    fn reviewers(&mut self, ranking: &Ranking, lookup: &mut dyn ProfileLookup) -> Result<()> {
        if ranking.is_empty() {
            return Ok(());
        }
        let mut items = Vec::with_capacity(ranking.len());
        for (login, count) in ranking.iter() {
            let profile = lookup.profile(login)?;
            items.push(format!("{} *(@{})*: {}", profile.display_name(), login, count));
        }
        self.title("Reviewers", 2);
        self.itemize(items);
        Ok(())
    }

    /// Titled list of people sorted by family name
    fn people(&mut self, title: &str, profiles: &[UserProfile]) {
        let mut sorted = profiles.to_vec();
        sort_by_family_name(&mut sorted);
        self.title(title, 2);
        self.itemize(sorted.iter().map(format_user).collect());
    }

    fn changelog_line(&mut self, org: &str, repo: &str) {
        let line = format!(
            "**Full Changelog**: https://github.com/{}/{}/compare/{}...{}",
            org,
            repo,
            self.context().merge_base,
            self.context().head_ref()
        );
        self.lines_mut().push(line);
    }

    fn render(&self) -> String {
        let mut text = self.lines().join("\n");
        text.push('\n');
        text
    }
}
