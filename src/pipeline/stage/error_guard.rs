//! Script error hardening at `<head>` open.

use super::{Stage, StageError, inject_once};
use crate::embed::js::ERROR_GUARD_JS;
use crate::html::rewrite::Anchor;
use crate::pipeline::StageContext;

/// Installs the DOM/analytics guard before any page script runs.
pub struct ErrorGuard;

impl Stage for ErrorGuard {
    fn apply(&self, html: String, _ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        Ok(inject_once(html, Anchor::HeadOpen, "__perfErrorGuard", ERROR_GUARD_JS.text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::test_support::{PAGE, anchor_counts, run};

    #[test]
    fn test_guard_is_first_in_head() {
        let out = run(&ErrorGuard, "<html><head><title>t</title></head><body></body></html>");
        assert!(out.starts_with("<html><head><script>"));
        assert!(out.contains("__perfErrorGuard"));
        assert!(out.find("__perfErrorGuard") < out.find("<title>"));
    }

    #[test]
    fn test_anchor_counts_unchanged() {
        assert_eq!(anchor_counts(&run(&ErrorGuard, PAGE)), anchor_counts(PAGE));
    }

    #[test]
    fn test_guard_installed_once() {
        let once = run(&ErrorGuard, PAGE);
        assert_eq!(run(&ErrorGuard, &once), once);
    }

    #[test]
    fn test_fragment_untouched() {
        assert_eq!(run(&ErrorGuard, "<div>partial</div>"), "<div>partial</div>");
    }
}
