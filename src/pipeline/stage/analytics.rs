//! Deferred analytics and tag manager bootstrap.
//!
//! External analytics scripts and inline tag/pixel snippets are removed from
//! the markup and replayed by one loader after interaction or idle time.

use super::{Stage, StageError};
use crate::debug;
use crate::embed::js::{ANALYTICS_LOADER_JS, AnalyticsVars};
use crate::embed::{ScriptJson, script_tag};
use crate::html::extract;
use crate::html::rewrite::{Anchor, Rewrite, insert, rewrite_all, splice};
use crate::html::tag;
use crate::pipeline::StageContext;
use regex::Regex;
use std::sync::LazyLock;

/// Inline script whose body starts like a tag manager or gtag snippet.
static INLINE_TAG_SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<(?i:script)\b[^>]*>(\s*(?:window\.dataLayer|window\.gtag|!function\(w,d,s,l,i\)|\(function\(w,d,s,l,i\)).*?)</(?i:script)\s*>",
    )
    .unwrap()
});

const TRACKING_MARKERS: [&str; 5] = ["googletagmanager", "gtag", "dataLayer", "fbq", "google"];

pub struct Analytics;

impl Stage for Analytics {
    fn apply(&self, html: String, _ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let externals = extract::analytics_scripts(&html);
        let scripts: Vec<String> = externals.iter().map(|s| s.url.clone()).collect();
        let html = splice(
            html,
            externals
                .iter()
                .map(|s| (s.position..s.position + s.raw_tag.len(), String::new()))
                .collect(),
        );

        let mut inline_scripts = Vec::new();
        let html = rewrite_all(html, &INLINE_TAG_SNIPPET, |caps| {
            let open = caps[0].split('>').next().unwrap_or_default();
            let body = &caps[1];
            if tag::has(open, "src") || !TRACKING_MARKERS.iter().any(|m| body.contains(m)) {
                return Rewrite::Keep;
            }
            inline_scripts.push(body.trim().to_string());
            Rewrite::Replace(String::new())
        });

        if scripts.is_empty() && inline_scripts.is_empty() {
            return Ok(html);
        }

        let gtm_id = extract::gtm_container_id(scripts.iter().map(String::as_str));
        debug!(
            "pipeline";
            "deferring {} analytics script(s), {} inline snippet(s), container {}",
            scripts.len(),
            inline_scripts.len(),
            gtm_id.as_deref().unwrap_or("none")
        );

        let loader = ANALYTICS_LOADER_JS.render(&AnalyticsVars {
            scripts: ScriptJson::new(&scripts)?,
            inline_scripts: ScriptJson::new(&inline_scripts)?,
            gtm_id: ScriptJson::new(&gtm_id)?,
        });
        Ok(insert(html, Anchor::HeadClose, &script_tag(&loader)))
    }
}
