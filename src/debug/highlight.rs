//! Syntax highlighting for the source viewer.
//!
//! The viewer only depends on the [`Highlighter`] capability. The bundled
//! [`RustHighlighter`] runs syntect's Rust grammar and renders each source
//! line as one row of a line-numbered table.

use std::fmt::Write;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Renders source text as HTML, optionally emphasizing one line.
pub trait Highlighter: Send + Sync {
    fn render(&self, source: &str, highlight: Option<usize>) -> String;
}

/// Light theme bundled with syntect.
const THEME: &str = "InspiredGitHub";

const STYLE: &str = "<style>\
.chroma { background-color: #ffffff; font-size: 1.2em; }\
.chroma td { white-space: pre; font-family: monospace; }\
.chroma .lntable { border-spacing: 0; padding: 0; margin: 0; border: 0; }\
.chroma .lnt { color: #7f7f7f; padding: 0 0.4em 0 0.4em; user-select: none; text-align: right; }\
.chroma .lnt a { color: inherit; text-decoration: none; }\
.chroma .hl { background-color: #ffffcc; display: block; }\
</style>";

/// Fixed-language highlighter for Rust sources.
pub struct RustHighlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
    tab_width: usize,
}

impl RustHighlighter {
    /// Loads the bundled grammars and theme; build one and share it.
    pub fn new(tab_width: usize) -> Self {
        let mut themes = ThemeSet::load_defaults();
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme: themes.themes.remove(THEME).unwrap_or_default(),
            tab_width,
        }
    }

    fn syntax(&self) -> &SyntaxReference {
        self.syntaxes
            .find_syntax_by_extension("rs")
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    /// One HTML fragment per source line. Parser state carries across lines,
    /// so multi-line comments and strings stay colored.
    fn highlight_lines(&self, source: &str) -> Vec<String> {
        let mut highlighter = HighlightLines::new(self.syntax(), &self.theme);
        LinesWithEndings::from(source)
            .map(|line| {
                let regions = match highlighter.highlight_line(line, &self.syntaxes) {
                    Ok(regions) => regions,
                    Err(e) => {
                        tracing::warn!(error = %e, "Highlighting failed, rendering plain line");
                        return plain(line);
                    }
                };
                let regions: Vec<(Style, &str)> = regions
                    .into_iter()
                    .map(|(style, text)| (style, text.trim_end_matches(['\r', '\n'])))
                    .filter(|(_, text)| !text.is_empty())
                    .collect();
                styled_line_to_highlighted_html(&regions, IncludeBackground::No)
                    .unwrap_or_else(|_| plain(line))
            })
            .collect()
    }
}

impl Default for RustHighlighter {
    fn default() -> Self {
        Self::new(2)
    }
}

impl std::fmt::Debug for RustHighlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustHighlighter")
            .field("tab_width", &self.tab_width)
            .finish_non_exhaustive()
    }
}

impl Highlighter for RustHighlighter {
    fn render(&self, source: &str, highlight: Option<usize>) -> String {
        let source = source.replace('\t', &" ".repeat(self.tab_width));
        let lines = self.highlight_lines(&source);

        let mut out = String::with_capacity(source.len() * 4);
        out.push_str(STYLE);
        out.push_str("<div class=\"chroma\"><table class=\"lntable\"><tbody>\n");
        for (idx, line) in lines.iter().enumerate() {
            let number = idx + 1;
            let marked = highlight == Some(number);
            let _ = writeln!(
                out,
                "<tr id=\"L{n}\"{hl}><td class=\"lnt\"><a href=\"#L{n}\">{n}</a></td><td class=\"line\"><span{line_class}>{code}</span></td></tr>",
                n = number,
                hl = if marked { " class=\"marked\"" } else { "" },
                line_class = if marked { " class=\"hl\"" } else { "" },
                code = line,
            );
        }
        out.push_str("</tbody></table></div>\n");
        out
    }
}

fn plain(line: &str) -> String {
    html_escape::encode_text(line.trim_end_matches(['\r', '\n'])).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_numbers_and_marks_line() {
        let html = RustHighlighter::default().render("let a = 1;\nlet b = 2;\nlet c = 3;\n", Some(2));
        assert_eq!(html.matches("<tr id=").count(), 3);
        assert!(html.contains("<tr id=\"L2\" class=\"marked\">"));
        assert!(!html.contains("<tr id=\"L1\" class=\"marked\">"));
        assert!(html.contains("<a href=\"#L3\">3</a>"));
        assert_eq!(html.matches("class=\"hl\"").count(), 1);
    }

    #[test]
    fn test_render_without_highlight() {
        let html = RustHighlighter::default().render("fn a() {}\n", None);
        assert!(!html.contains("class=\"marked\""));
        assert!(!html.contains("class=\"hl\""));
    }

    #[test]
    fn test_tokens_are_styled() {
        let html = RustHighlighter::default().render("fn main() {}\n", None);
        assert!(html.contains("<span style=\""));
        assert!(html.contains(">fn</span>"));
    }

    #[test]
    fn test_last_line_without_newline() {
        let html = RustHighlighter::default().render("let a = 1;\nlet b = 2;", None);
        assert_eq!(html.matches("<tr id=").count(), 2);
        assert!(html.contains("<tr id=\"L2\">"));
    }

    #[test]
    fn test_multiline_comment_rows_are_self_contained() {
        let html = RustHighlighter::default().render("/* one\ntwo */\nfn f() {}\n", None);
        assert_eq!(html.matches("<tr id=").count(), 3);
        for row in html.lines().filter(|l| l.starts_with("<tr")) {
            assert_eq!(row.matches("<span").count(), row.matches("</span>").count(), "{}", row);
        }
    }

    #[test]
    fn test_tabs_expanded_and_text_escaped() {
        let html = RustHighlighter::new(4).render("\tif a < b {}", None);
        assert!(!html.contains('\t'));
        assert!(html.contains("    "));
        assert!(html.contains("&lt;"));
        assert!(!html.contains(" < "));
    }
}
