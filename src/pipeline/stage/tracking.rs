//! Tracking script deferral.
//!
//! Tracking scripts still in the markup become inert
//! `<script data-tracking-src type="text/plain">` placeholders. The loader
//! before `</body>` turns them back into real scripts after four idle
//! seconds, on `beforeunload`, or on the idle callback.

use super::{Stage, StageError, inject_once};
use crate::embed::js::TRACKING_LOADER_JS;
use crate::html::extract::{self, SCRIPT_ELEMENT};
use crate::html::rewrite::{Anchor, Rewrite, rewrite_tags};
use crate::html::tag;
use crate::pipeline::StageContext;

const TRACKING_HOSTS: [&str; 8] = [
    "google-analytics",
    "googletagmanager",
    "facebook",
    "fbcdn",
    "analytics",
    "pixel",
    "gtm",
    "tag",
];

/// Opt-out marker, matched case-insensitively anywhere in the tag.
const NO_OPTIMIZE: &str = "nooptimize";

pub struct TrackingDeferral;

fn defer(element: &str) -> Rewrite {
    let Some(src) = tag::get(element, "src") else {
        return Rewrite::Keep;
    };
    if !extract::host_matches(src, &TRACKING_HOSTS)
        || element.to_ascii_lowercase().contains(NO_OPTIMIZE)
    {
        return Rewrite::Keep;
    }
    let placeholder = tag::set("<script>", "data-tracking-src", src.trim());
    let placeholder = tag::set(&placeholder, "type", "text/plain");
    Rewrite::Replace(placeholder + "</script>")
}

impl Stage for TrackingDeferral {
    fn apply(&self, html: String, _ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let html = rewrite_tags(html, &SCRIPT_ELEMENT, |caps| defer(&caps[0]));
        Ok(inject_once(html, Anchor::BodyClose, "__perfTrackingLoader", TRACKING_LOADER_JS.text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::test_support::{PAGE, anchor_counts, run};

    #[test]
    fn test_tracking_scripts_become_placeholders() {
        let out = run(&TrackingDeferral, PAGE);
        assert!(out.contains(
            r#"<script data-tracking-src="https://www.googletagmanager.com/gtm.js?id=GTM-AB12CD" type="text/plain"></script>"#
        ));
        assert!(out.contains(
            r#"<script data-tracking-src="https://connect.facebook.net/en_US/fbevents.js" type="text/plain"></script>"#
        ));
        assert!(out.contains(r#"<script src="/static/requirejs/require.js"></script>"#));
        assert!(out.find("__perfTrackingLoader") > out.find("FOOTER"));
        assert_eq!(anchor_counts(&out), anchor_counts(PAGE));
    }

    #[test]
    fn test_no_optimize_respected() {
        let html = r#"<script src="https://connect.facebook.net/x.js" data-noOptimize="1"></script>"#;
        assert_eq!(run(&TrackingDeferral, html), html);
    }

    #[test]
    fn test_placeholders_not_rematched() {
        let once = run(&TrackingDeferral, PAGE);
        assert_eq!(run(&TrackingDeferral, &once), once);
    }

    #[test]
    fn test_path_keywords_ignored() {
        let html = r#"<script src="https://shop.example.com/js/tag-cloud.js"></script>"#;
        assert_eq!(run(&TrackingDeferral, html), html);
    }
}
