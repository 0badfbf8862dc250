//! Preload hints for the resources first paint waits on.
//!
//! The first two stylesheets (print styles excluded) and the RequireJS and
//! jQuery scripts get `<link rel="preload">` tags before `</head>`. With
//! `http2_push` on, the same list also goes out as one `Link` header.

use super::{Stage, StageError};
use crate::config::Flag;
use crate::html::extract::{self, LINK_TAG};
use crate::html::rewrite::{Anchor, insert};
use crate::html::tag;
use crate::pipeline::StageContext;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use std::sync::LazyLock;

static ESSENTIAL_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:require\.js|jquery[^/]*\.js)$").unwrap());

/// Bytes escaped inside a `Link` header target. Non-ASCII is always escaped.
const LINK_TARGET: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>');

/// Number of leading stylesheets worth preloading.
const PRELOAD_STYLESHEETS: usize = 2;

pub struct CriticalPath;

#[derive(Debug, PartialEq, Eq)]
struct Preload {
    href: String,
    kind: &'static str,
}

impl Preload {
    fn tag(&self) -> String {
        let link = tag::set(r#"<link rel="preload">"#, "href", &self.href);
        let link = tag::set(&link, "as", self.kind);
        tag::set(&link, "crossorigin", "anonymous")
    }

    fn header_value(&self) -> String {
        let target = utf8_percent_encode(&self.href, LINK_TARGET);
        format!("<{target}>; rel=preload; as={}", self.kind)
    }
}

/// `href`s of `<link rel="preload">` tags already in the document.
fn existing_preloads(html: &str) -> Vec<&str> {
    LINK_TAG
        .find_iter(html)
        .map(|m| m.as_str())
        .filter(|raw| tag::is(raw, "rel", "preload"))
        .filter_map(|raw| tag::get(raw, "href"))
        .collect()
}

fn critical_resources(html: &str) -> Vec<Preload> {
    let styles = extract::stylesheets(html)
        .into_iter()
        .take(PRELOAD_STYLESHEETS)
        .filter(|sheet| !sheet.url.contains("print"))
        .map(|sheet| Preload {
            href: sheet.url,
            kind: "style",
        });
    let scripts = extract::scripts(html)
        .into_iter()
        .filter(|script| ESSENTIAL_SCRIPT.is_match(script.url.split(['?', '#']).next().unwrap_or_default()))
        .map(|script| Preload {
            href: script.url,
            kind: "script",
        });

    let existing = existing_preloads(html);
    let mut found: Vec<Preload> = Vec::new();
    for preload in styles.chain(scripts) {
        if !existing.contains(&preload.href.as_str()) && !found.contains(&preload) {
            found.push(preload);
        }
    }
    found
}

impl Stage for CriticalPath {
    fn apply(&self, html: String, ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let resources = critical_resources(&html);
        if resources.is_empty() {
            return Ok(html);
        }

        if ctx.flag(Flag::Http2Push) {
            let value = resources
                .iter()
                .map(Preload::header_value)
                .collect::<Vec<_>>()
                .join(", ");
            ctx.add_header("Link", value);
        }

        let tags: String = resources.iter().map(|r| r.tag() + "\n").collect();
        Ok(insert(html, Anchor::HeadClose, &tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flags;
    use crate::pipeline::stage::test_support::{PAGE, anchor_counts, run, run_with};

    #[test]
    fn test_preloads_first_two_styles_and_loaders() {
        let out = run(&CriticalPath, PAGE);
        assert!(out.contains(
            "<link rel=\"preload\" href=\"/static/css/styles-m.css\" as=\"style\" crossorigin=\"anonymous\">\n\
             <link rel=\"preload\" href=\"/static/css/styles-l.css\" as=\"style\" crossorigin=\"anonymous\">\n\
             <link rel=\"preload\" href=\"/static/requirejs/require.js\" as=\"script\" crossorigin=\"anonymous\">\n</head>"
        ));
        assert!(!out.contains(r#"rel="preload" href="https://cdn.example.com/css/widgets.css""#));
        assert_eq!(anchor_counts(&out), anchor_counts(PAGE));
    }

    #[test]
    fn test_print_sheet_skipped() {
        let html = r#"<html><head><link rel="stylesheet" href="/print.css"><link rel="stylesheet" href="/a.css"></head></html>"#;
        let out = run(&CriticalPath, html);
        assert!(!out.contains(r#"rel="preload" href="/print.css""#));
        assert!(out.contains(r#"rel="preload" href="/a.css""#));
    }

    #[test]
    fn test_link_header_only_with_push() {
        let flags = Flags::all().with(Flag::Http2Push, false);
        let (_, headers) = run_with(&CriticalPath, PAGE, flags);
        assert!(headers.is_empty());

        let (_, headers) = run_with(&CriticalPath, PAGE, Flags::all());
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0, "Link");
        assert_eq!(
            headers[0].1,
            "</static/css/styles-m.css>; rel=preload; as=style, \
             </static/css/styles-l.css>; rel=preload; as=style, \
             </static/requirejs/require.js>; rel=preload; as=script"
        );
    }

    #[test]
    fn test_link_header_escapes_non_ascii() {
        let html = r#"<html><head><link rel="stylesheet" href="/css/café.css"></head></html>"#;
        let (out, headers) = run_with(&CriticalPath, html, Flags::all());
        assert_eq!(headers[0].1, "</css/caf%C3%A9.css>; rel=preload; as=style");
        assert!(headers[0].1.is_ascii());
        assert!(out.contains(r#"rel="preload" href="/css/café.css""#));
    }

    #[test]
    fn test_jquery_matched() {
        let html = r#"<html><head><script src="/js/jquery-3.6.min.js?v=2"></script><script src="/js/jquery/ui/widget.js"></script></head></html>"#;
        let out = run(&CriticalPath, html);
        assert!(out.contains(r#"href="/js/jquery-3.6.min.js?v=2" as="script""#));
        assert!(!out.contains(r#"href="/js/jquery/ui/widget.js""#));
    }

    #[test]
    fn test_rerun_adds_nothing() {
        let once = run(&CriticalPath, PAGE);
        assert_eq!(run(&CriticalPath, &once), once);
    }
}
