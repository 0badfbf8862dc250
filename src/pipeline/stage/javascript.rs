//! JavaScript execution shaping.
//!
//! - merged CDN bundles are fetched and evaluated in 50,000-character slices
//! - a RequireJS booster follows `require.js`
//! - a parse delayer runs first in `<head>`
//! - the tag manager script loads two seconds after `load`
//!
//! [`TaskWorker`] adds the background task queue when `web_worker` is on.

use super::{Stage, StageError, inject_once};
use crate::embed::js::{
    BundleVars, CHUNKED_BUNDLE_JS, DELAYED_GTM_JS, DelayedGtmVars, PARSE_DELAYER_JS,
    REQUIRE_BOOSTER_JS, TASK_WORKER_JS,
};
use crate::embed::{ScriptJson, script_tag};
use crate::html::extract::SCRIPT_ELEMENT;
use crate::html::rewrite::{Anchor, Rewrite, rewrite_tags};
use crate::html::tag;
use crate::pipeline::StageContext;
use regex::Regex;
use std::sync::LazyLock;

static MERGED_BUNDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?:)?//cdn\.jsdelivr\.net/gh/[^/]+/[^/]+@[^/]+/_cache/merged/[^'\x22]+\.min\.js$")
        .unwrap()
});

static REQUIRE_JS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"require\.js(?:[?#]|$)").unwrap());

static TAG_MANAGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:https?:)?//(?:www\.)?googletagmanager\.com/").unwrap());

pub struct JavaScript;

/// `src` of an external script element matching `re`.
fn script_src<'a>(element: &'a str, re: &Regex) -> Option<&'a str> {
    tag::get(element, "src").filter(|src| re.is_match(src.trim()))
}

fn chunk_merged_bundles(html: String) -> Result<String, StageError> {
    let mut error = None;
    let html = rewrite_tags(html, &SCRIPT_ELEMENT, |caps| {
        let Some(src) = script_src(&caps[0], &MERGED_BUNDLE) else {
            return Rewrite::Keep;
        };
        match ScriptJson::new(src.trim()) {
            Ok(url) => Rewrite::Replace(format!(
                r#"<script type="module">{}</script>"#,
                CHUNKED_BUNDLE_JS.render(&BundleVars { url })
            )),
            Err(err) => {
                error.get_or_insert(err);
                Rewrite::Keep
            }
        }
    });
    match error {
        Some(err) => Err(err.into()),
        None => Ok(html),
    }
}

fn boost_require(mut html: String) -> String {
    if html.contains("__perfRequireBooster") {
        return html;
    }
    let end = SCRIPT_ELEMENT
        .find_iter(&html)
        .find(|m| script_src(m.as_str(), &REQUIRE_JS).is_some())
        .map(|m| m.end());
    if let Some(at) = end {
        html.insert_str(at, &script_tag(REQUIRE_BOOSTER_JS.text()));
    }
    html
}

fn delay_tag_manager(html: String) -> Result<String, StageError> {
    let mut error = None;
    let html = rewrite_tags(html, &SCRIPT_ELEMENT, |caps| {
        let Some(src) = script_src(&caps[0], &TAG_MANAGER) else {
            return Rewrite::Keep;
        };
        match ScriptJson::new(src.trim()) {
            Ok(src) => Rewrite::Replace(script_tag(&DELAYED_GTM_JS.render(&DelayedGtmVars { src }))),
            Err(err) => {
                error.get_or_insert(err);
                Rewrite::Keep
            }
        }
    });
    match error {
        Some(err) => Err(err.into()),
        None => Ok(html),
    }
}

impl Stage for JavaScript {
    fn apply(&self, html: String, _ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let html = chunk_merged_bundles(html)?;
        let html = boost_require(html);
        let html = inject_once(html, Anchor::HeadOpen, "__perfParseDelayer", PARSE_DELAYER_JS.text());
        delay_tag_manager(html)
    }
}

/// Background task queue before `</body>`.
pub struct TaskWorker;

impl Stage for TaskWorker {
    fn apply(&self, html: String, _ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        Ok(inject_once(html, Anchor::BodyClose, "__perfTaskWorker", TASK_WORKER_JS.text()))
    }
}
