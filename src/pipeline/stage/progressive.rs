//! Progressive bootstrap and non-blocking stylesheets.

use super::{Stage, StageError, inject_once};
use crate::embed::js::PROGRESSIVE_JS;
use crate::html::extract::{self, LINK_TAG};
use crate::html::rewrite::{Anchor, Rewrite, rewrite_tags};
use crate::html::tag;
use crate::pipeline::{DocumentState, StageContext};

pub struct Progressive;

/// Load a stylesheet as `print` and switch it to `all` once it arrives.
fn defer_stylesheet(raw: &str, state: &DocumentState) -> Rewrite {
    if !extract::is_stylesheet_link(raw) || tag::has(raw, "media") {
        return Rewrite::Keep;
    }
    let Some(href) = tag::get(raw, "href").map(str::trim) else {
        return Rewrite::Keep;
    };
    if href.is_empty() || href.starts_with("print") || state.is_critical_stylesheet(href) {
        return Rewrite::Keep;
    }
    let out = tag::set(raw, "media", "print");
    Rewrite::Replace(tag::set(&out, "onload", "this.media='all'"))
}

impl Stage for Progressive {
    fn apply(&self, html: String, ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let html = inject_once(html, Anchor::BodyOpen, "__perfProgressive", PROGRESSIVE_JS.text());
        Ok(rewrite_tags(html, &LINK_TAG, |caps| defer_stylesheet(&caps[0], &ctx.state)))
    }
}
