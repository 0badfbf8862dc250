//! HTML streaming hints.

use super::{Stage, StageError, inject_once};
use crate::embed::js::{STREAMING_FLUSH_JS, STREAMING_JS};
use crate::embed::script_tag;
use crate::html::rewrite::{Anchor, insert};
use crate::pipeline::StageContext;

/// Marks the point where a streaming host can flush the head.
pub const FLUSH_COMMENT: &str = "<!-- FLUSH BUFFER HERE FOR FASTER INITIAL RENDER -->";

pub struct Streaming;

impl Stage for Streaming {
    fn apply(&self, html: String, _ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let html = inject_once(html, Anchor::HeadOpen, "__perfStreaming", STREAMING_JS.text());
        if html.contains(FLUSH_COMMENT) {
            return Ok(html);
        }
        let hint = format!("{FLUSH_COMMENT}{}", script_tag(STREAMING_FLUSH_JS.text()));
        Ok(insert(html, Anchor::AfterHead, &hint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::test_support::{PAGE, anchor_counts, run};

    #[test]
    fn test_flush_hint_follows_head() {
        let out = run(&Streaming, "<html><head></head><body></body></html>");
        assert!(out.starts_with("<html><head><script>"));
        assert!(out.contains(&format!("</head>{FLUSH_COMMENT}<script>")));
        assert!(out.contains("__perfStreamingFlush"));
    }

    #[test]
    fn test_rerun_adds_nothing() {
        let once = run(&Streaming, PAGE);
        assert_eq!(run(&Streaming, &once), once);
        assert_eq!(anchor_counts(&once), anchor_counts(PAGE));
    }
}
