//! Above-the-fold prioritization.
//!
//! Fetches the critical stylesheet early, turns the remaining eager images
//! into `data-lazy-src` placeholders and parks large footer-like blocks in a
//! `data-lazy-html` attribute until they scroll into view.
//!
//! Block matching stops at the first `</div>`, so a block with nested `<div>`
//! elements cannot be cut out safely; those are left as they are.

use super::{PLACEHOLDER_SRC, Stage, StageError};
use crate::embed::js::{ABOVE_FOLD_JS, CriticalCssVars};
use crate::embed::{ScriptJson, script_tag};
use crate::html::extract::{self, IMG_TAG};
use crate::html::rewrite::{Anchor, Rewrite, insert, rewrite_all, rewrite_tags};
use crate::html::tag;
use crate::pipeline::StageContext;
use crate::utils::html::{escape, has_balanced_quotes};
use regex::Regex;
use std::sync::LazyLock;

/// A `<div>` whose class names a below-the-fold region, with its content up
/// to the first `</div>`.
static DEFERRABLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)(<div\b[^>]*\bclass\s*=\s*["'][^"']*(?:footer|widget|sidebar|additional|block-bottom|newsletter|social-links|copyright|links|menu-footer|secondary)[^"']*["'][^>]*>)(.*?)</div\s*>"#,
    )
    .unwrap()
});

/// Blocks smaller than this stay inline.
const MIN_DEFERRED_BLOCK: usize = 500;

pub struct AboveFold;

fn defer_image(raw: &str) -> Rewrite {
    let Some(src) = tag::get(raw, "src").filter(|s| !s.is_empty() && !extract::is_data_uri(s))
    else {
        return Rewrite::Keep;
    };
    if raw.contains("above-the-fold")
        || tag::has(raw, "loading")
        || tag::has(raw, "data-lazy-src")
        || tag::has(raw, "data-src")
        || tag::is(raw, "fetchpriority", "high")
    {
        return Rewrite::Keep;
    }

    let out = tag::set(raw, "src", PLACEHOLDER_SRC);
    let out = tag::set(&out, "data-lazy-src", src);
    let out = tag::rename(&out, "srcset", "data-lazy-srcset");
    Rewrite::Replace(tag::set(&out, "loading", "lazy"))
}

fn defer_block(open: &str, content: &str) -> Rewrite {
    let lowered = content.to_ascii_lowercase();
    if content.len() < MIN_DEFERRED_BLOCK
        || !has_balanced_quotes(open)
        || lowered.contains("<div")
        || lowered.contains("</body")
    {
        return Rewrite::Keep;
    }
    let open = tag::set(open, "data-lazy-html", &escape(content));
    Rewrite::Replace(open + "</div>")
}

impl Stage for AboveFold {
    fn apply(&self, html: String, ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let loader = ABOVE_FOLD_JS.render(&CriticalCssVars {
            url: ScriptJson::new(&ctx.state.critical_stylesheet())?,
        });
        let html = if html.contains("__perfAboveFold") {
            html
        } else {
            insert(html, Anchor::HeadClose, &script_tag(&loader))
        };
        let html = rewrite_tags(html, &IMG_TAG, |caps| defer_image(&caps[0]));
        Ok(rewrite_all(html, &DEFERRABLE_BLOCK, |caps| defer_block(&caps[1], &caps[2])))
    }
}
