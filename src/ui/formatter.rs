//! Formatting functions for console output.
//!
//! Step results go to stdout so they can be piped; progress, warnings and
//! errors go to stderr.

use console::style;

use crate::attribution::Ranking;
use crate::diagnostics::ReconciliationWarning;
use crate::error::CategorizationError;
use crate::reconcile::{Attribution, Reconciliation};
use crate::teams::TeamDirectory;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    eprintln!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    eprintln!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(warning: &ReconciliationWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

pub fn display_categorization_problem(problem: &CategorizationError) {
    eprintln!("{} {}", style("⚠ LABELS:").yellow(), problem);
}

/// Progress line for long per-PR loops, e.g. `[3/40] #1234`
pub fn format_progress(done: usize, total: usize, pr_id: u64) -> String {
    let width = total.to_string().len();
    format!("[{:>width$}/{}] #{}", done, total, pr_id, width = width)
}

pub fn display_progress(done: usize, total: usize, pr_id: u64) {
    eprintln!("{}", style(format_progress(done, total, pr_id)).dim());
}

fn attribution_label(attribution: &Attribution) -> String {
    match attribution {
        Attribution::Pinned(id) => format!("#{} (pinned)", id),
        Attribution::Direct(id) => format!("#{}", id),
        Attribution::SubjectMatch(id) => format!("#{} (subject)", id),
        Attribution::SubjectNumber(id) => format!("#{} (subject number)", id),
        Attribution::AlreadyReleased(id) => format!("#{} (already released)", id),
        Attribution::Ignored => "ignored".to_string(),
        Attribution::Unmatched => "unmatched".to_string(),
    }
}

/// One line per commit: short hash, attribution, subject
pub fn format_reconciliation(reconciliation: &Reconciliation) -> Vec<String> {
    reconciliation
        .commits
        .iter()
        .map(|(commit, attribution)| {
            format!(
                "{} {:<24} {}",
                commit.short_hash(),
                attribution_label(attribution),
                commit.subject
            )
        })
        .collect()
}

pub fn display_reconciliation(reconciliation: &Reconciliation) {
    println!(
        "{}",
        style(format!(
            "{} pull requests from {} commits",
            reconciliation.pull_ids.len(),
            reconciliation.commits.len()
        ))
        .bold()
    );
    for line in format_reconciliation(reconciliation) {
        println!("  {}", line);
    }
    if reconciliation.excluded_commits > 0 {
        println!(
            "  ... {} commits already released on the excluded branch",
            reconciliation.excluded_commits
        );
    }
}

/// Print a ranking as `count  handle` lines under a bold title.
pub fn display_ranking(title: &str, ranking: &Ranking) {
    println!("{}", style(title).bold().underlined());
    for (handle, count) in ranking.iter() {
        println!("  {:>4}  {}", count, handle);
    }
}

pub fn display_teams(teams: &TeamDirectory) {
    for (slug, team) in teams.iter() {
        println!("{} {}", style(slug).bold(), style(&team.description).dim());
        for member in &team.members {
            println!("  - {}", member);
        }
    }
}

pub fn display_list(items: &[String]) {
    for item in items {
        println!("{}", item);
    }
}
