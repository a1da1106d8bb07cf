//! User interface module - confirmation prompts and formatting.
//!
//! Separates concerns:
//! - `formatter` - Formatting and printing of step results
//! - This module - Interactive prompts and user input handling

use std::io::{self, Write};

use anyhow::Result;

pub mod formatter;

pub use formatter::{
    display_categorization_problem, display_error, display_list, display_progress,
    display_ranking, display_reconciliation, display_status, display_success, display_teams,
    display_warning,
};

/// Prompts user to confirm an action with a yes/no prompt.
///
/// Accepts "y" or "yes" (case-insensitive). Default is "no" if the user
/// presses Enter.
pub fn confirm_action(prompt: &str) -> Result<bool> {
    eprint!("\n{} (y/N): ", prompt);
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(parse_confirmation(&input))
}

fn parse_confirmation(input: &str) -> bool {
    let response = input.trim().to_lowercase();
    response == "y" || response == "yes"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confirmation() {
        assert!(parse_confirmation("y\n"));
        assert!(parse_confirmation(" YES "));
        assert!(!parse_confirmation("\n"));
        assert!(!parse_confirmation("no"));
    }
}
