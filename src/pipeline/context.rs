//! Per-transformation state shared by the stages.

use crate::config::{CspConfig, Flag, Flags};
use crate::html::extract;

/// Facts about the input document that must not drift as stages edit it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    critical_stylesheet: Option<String>,
}

impl DocumentState {
    /// Capture state from the document as it entered the pipeline.
    pub fn from_document(html: &str) -> Self {
        Self {
            critical_stylesheet: extract::stylesheets(html)
                .into_iter()
                .find(|sheet| sheet.critical)
                .map(|sheet| sheet.url),
        }
    }

    /// URL of the stylesheet treated as critical for this document.
    ///
    /// Fixed on entry, so removing or moving links later does not promote
    /// another stylesheet.
    pub fn critical_stylesheet(&self) -> Option<&str> {
        self.critical_stylesheet.as_deref()
    }

    pub fn is_critical_stylesheet(&self, url: &str) -> bool {
        self.critical_stylesheet.as_deref() == Some(url)
    }
}

/// Everything a stage may read or emit besides the buffer.
pub struct StageContext<'a> {
    pub flags: Flags,
    pub csp: &'a CspConfig,
    pub state: DocumentState,
    headers: Vec<(String, String)>,
}

impl<'a> StageContext<'a> {
    pub fn new(flags: Flags, csp: &'a CspConfig, state: DocumentState) -> Self {
        Self {
            flags,
            csp,
            state,
            headers: Vec::new(),
        }
    }

    #[inline]
    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.get(flag)
    }

    /// Queue a response header for the host.
    pub fn add_header(&mut self, name: &str, value: String) {
        self.headers.push((name.to_string(), value));
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Drop headers queued after `len` (used to roll back a failed stage).
    pub(super) fn truncate_headers(&mut self, len: usize) {
        self.headers.truncate(len);
    }

    pub fn into_headers(self) -> Vec<(String, String)> {
        self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_pins_first_stylesheet() {
        let html = r#"<link rel="stylesheet" href="/a.css"><link rel="stylesheet" href="/b.css">"#;
        let state = DocumentState::from_document(html);
        assert_eq!(state.critical_stylesheet(), Some("/a.css"));
        assert!(state.is_critical_stylesheet("/a.css"));
        assert!(!state.is_critical_stylesheet("/b.css"));
    }

    #[test]
    fn test_state_without_stylesheets() {
        let state = DocumentState::from_document("<p>plain</p>");
        assert_eq!(state.critical_stylesheet(), None);
        assert!(!state.is_critical_stylesheet(""));
    }

    #[test]
    fn test_header_rollback() {
        let csp = CspConfig::default();
        let mut ctx = StageContext::new(Flags::all(), &csp, DocumentState::default());
        ctx.add_header("Link", "</a.css>; rel=preload; as=style".into());
        let mark = ctx.headers().len();
        ctx.add_header("Link", "</b.css>; rel=preload; as=style".into());
        ctx.truncate_headers(mark);
        assert_eq!(ctx.into_headers().len(), 1);
    }
}
