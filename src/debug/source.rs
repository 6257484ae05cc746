//! Source file viewer.
//!
//! Reads whatever path it is given. There is no allowlist and no containment
//! check: anyone who can reach the viewer can read any file the process can.
//! It is only mounted in development mode and must never face an untrusted
//! network.

use std::path::PathBuf;
use std::sync::Arc;

use super::highlight::Highlighter;

/// Error type for source viewing.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("open {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders source files as highlighted HTML.
#[derive(Clone)]
pub struct SourceViewer {
    highlighter: Arc<dyn Highlighter>,
}

impl SourceViewer {
    pub fn new(highlighter: Arc<dyn Highlighter>) -> Self {
        Self { highlighter }
    }

    /// Parse a `line` query value. Anything but a positive integer, including
    /// one with surrounding whitespace, means no line is highlighted.
    pub fn parse_line(raw: &str) -> Option<usize> {
        raw.parse::<usize>().ok().filter(|&n| n > 0)
    }

    /// Read `path` and render it, emphasizing `line` when given. Bytes that
    /// are not valid UTF-8 are shown as replacement characters.
    pub async fn view(&self, path: &str, line: Option<usize>) -> Result<String, SourceError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| SourceError::Read {
                path: PathBuf::from(path),
                source,
            })?;
        let source = String::from_utf8_lossy(&bytes);

        tracing::debug!(path = %path, line = ?line, bytes = bytes.len(), "Rendering source view");
        Ok(self.highlighter.render(&source, line))
    }
}

impl std::fmt::Debug for SourceViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceViewer").finish_non_exhaustive()
    }
}
