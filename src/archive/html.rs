//! Markdown to HTML for the deposition description.

use pulldown_cmark::{html, Options, Parser};

/// Convert a Markdown document to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_lists_and_paragraphs() {
        let html = markdown_to_html(
            "Intro line\nsecond line\n\n## Bug fixes\n\n* Fix `x` *(@amy, #4)*\n* Other\n\n**Full Changelog**: a<b",
        );
        assert_eq!(
            html,
            "<p>Intro line\nsecond line</p>\n\
             <h2>Bug fixes</h2>\n\
             <ul>\n<li>Fix <code>x</code> <em>(@amy, #4)</em></li>\n<li>Other</li>\n</ul>\n\
             <p><strong>Full Changelog</strong>: a&lt;b</p>"
        );
    }

    #[test]
    fn test_links_and_ordered_lists_survive() {
        let html = markdown_to_html("See [docs](https://example.org) and\n\n1. first\n2. second");
        assert!(html.contains(r#"<a href="https://example.org">docs</a>"#));
        assert!(html.contains("<ol>\n<li>first</li>\n<li>second</li>\n</ol>"));
    }

    #[test]
    fn test_hash_without_space_is_text() {
        assert_eq!(markdown_to_html("#123 is a PR"), "<p>#123 is a PR</p>");
    }
}
