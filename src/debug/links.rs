//! Stack trace annotation.
//!
//! Turns every tab-indented `path:line` location in a trace into a link to the
//! source viewer. This is a line-by-line text rewrite, not a parser: anything
//! that does not look like a location line is passed through as is.

use std::borrow::Cow;

use url::form_urlencoded;

/// A source location parsed out of one trace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceReference<'a> {
    pub file_path: &'a str,
    /// The digit run after `path:`. Empty when the line has none.
    pub line_number: &'a str,
    /// Everything after `path:line`, kept verbatim.
    pub raw_suffix: &'a str,
}

impl<'a> TraceReference<'a> {
    /// Parse a `\t<path>:<digits><rest>` line.
    pub fn parse(line: &'a str) -> Option<Self> {
        let body = line.strip_prefix('\t')?;
        let (file_path, after) = body.split_once(':')?;
        if file_path.is_empty() {
            return None;
        }
        let digits = after
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let (line_number, raw_suffix) = after.split_at(digits);
        Some(Self {
            file_path,
            line_number,
            raw_suffix,
        })
    }

    /// The line number, if the digit run is a usable one.
    pub fn line(&self) -> Option<u32> {
        self.line_number.parse().ok()
    }
}

/// Rewrites trace location lines into source viewer links.
#[derive(Debug, Clone)]
pub struct StackLinker {
    base: String,
}

impl StackLinker {
    /// `base` is the path the source viewer is mounted at, e.g. `/debug/`.
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Link target for a file and line.
    pub fn href(&self, file_path: &str, line_number: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("source", file_path)
            .append_pair("line", line_number)
            .finish();
        format!("{}?{}", self.base, query)
    }

    /// Annotate a whole trace. Lines keep their order; lines that are not
    /// location lines come back byte-for-byte.
    pub fn render(&self, trace: &str) -> String {
        self.rewrite(trace, false)
    }

    /// Annotate a trace for embedding in an HTML page: like [`render`], but
    /// all text outside the generated anchors is HTML-escaped as well.
    ///
    /// [`render`]: StackLinker::render
    pub fn render_html(&self, trace: &str) -> String {
        self.rewrite(trace, true)
    }

    fn rewrite(&self, trace: &str, escape_text: bool) -> String {
        let mut out = String::with_capacity(trace.len() * 2);
        for (i, line) in trace.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            match TraceReference::parse(line) {
                Some(reference) => {
                    self.push_link(&mut out, &reference);
                    out.push_str(&text(reference.raw_suffix, escape_text));
                }
                None => out.push_str(&text(line, escape_text)),
            }
        }
        out
    }

    fn push_link(&self, out: &mut String, reference: &TraceReference<'_>) {
        let href = self.href(reference.file_path, reference.line_number);
        out.push('\t');
        out.push_str("<a href=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(&href));
        out.push_str("\">");
        out.push_str(&html_escape::encode_text(reference.file_path));
        out.push(':');
        out.push_str(reference.line_number);
        out.push_str("</a>");
    }
}

fn text(s: &str, escape: bool) -> Cow<'_, str> {
    if escape {
        html_escape::encode_text(s)
    } else {
        Cow::Borrowed(s)
    }
}
