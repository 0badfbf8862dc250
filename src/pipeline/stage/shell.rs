//! Extreme progressive loading.
//!
//! Replaces the document with a minimal shell: shell styles, a critical CSS
//! fetcher, the content above the first footer-like block (images deferred)
//! and a spinner. The original body travels as a JSON string in
//! `window.fullPageContent` and is swapped in after a second or on the first
//! interaction.
//!
//! `<meta charset>`, the viewport, the title, the CSP meta tag and the error
//! guard survive the rebuild; everything else in `<head>` is dropped.

use super::{PLACEHOLDER_SRC, Stage, StageError};
use crate::embed::css::SHELL_CSS;
use crate::embed::js::{
    CriticalCssVars, SHELL_CONTENT_JS, SHELL_CRITICAL_CSS_JS, SHELL_LOADER_JS, ShellContentVars,
};
use crate::embed::{ScriptJson, script_tag, style_tag};
use crate::html::extract::{self, IMG_TAG};
use crate::html::rewrite::{Anchor, Rewrite, replace_tags};
use crate::html::tag;
use crate::pipeline::StageContext;
use regex::Regex;
use std::sync::LazyLock;

/// Start of the first block that is never above the fold.
static FOLD_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div\b[^>]*\b(?:class|id)\s*=\s*["'](?:footer|sidebar|secondary|menu-footer|newsletter)"#)
        .unwrap()
});

static META_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<meta\b[^>]*>").unwrap());
static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>.*?</title\s*>").unwrap());
static INLINE_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());

/// Images narrower than this stay eager.
const MIN_DEFERRED_WIDTH: u32 = 60;

const REMAINING_CONTENT: &str = r#"<div id="remaining-content"><div class="lazy-load-spinner"><div class="spinner"></div></div></div>"#;

pub struct ExtremeShell;

/// Head elements that keep the page correct and safe.
fn carried_head(head: &str) -> String {
    let metas = META_TAG.find_iter(head).map(|m| m.as_str()).filter(|raw| {
        tag::has(raw, "charset")
            || tag::is(raw, "name", "viewport")
            || tag::is(raw, "http-equiv", "content-security-policy")
    });
    let title = TITLE.find(head).map(|m| m.as_str());
    let guard = INLINE_SCRIPT
        .find_iter(head)
        .map(|m| m.as_str())
        .filter(|raw| raw.contains("__perfErrorGuard"));

    metas.chain(title).chain(guard).collect()
}

fn defer_image(raw: &str) -> Rewrite {
    let Some(src) = tag::get(raw, "src").filter(|s| !s.is_empty() && !extract::is_data_uri(s))
    else {
        return Rewrite::Keep;
    };
    let narrow = tag::get(raw, "width")
        .and_then(|w| w.trim().parse::<u32>().ok())
        .is_some_and(|w| w < MIN_DEFERRED_WIDTH);
    if raw.contains("logo") || raw.contains("icon") || narrow || tag::has(raw, "data-src") {
        return Rewrite::Keep;
    }
    let out = tag::set(raw, "src", PLACEHOLDER_SRC);
    Rewrite::Replace(tag::set(&out, "data-src", src))
}

impl Stage for ExtremeShell {
    fn apply(&self, html: String, ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let open = Anchor::BodyOpen.offset(&html).ok_or(StageError::MissingAnchor("<body>"))?;
        let close = Anchor::BodyClose
            .offset(&html)
            .filter(|close| *close >= open)
            .ok_or(StageError::MissingAnchor("</body>"))?;
        let body = &html[open..close];
        let head = Anchor::HeadClose
            .offset(&html)
            .map_or("", |end| &html[..end.min(open)]);

        let above_fold = FOLD_BOUNDARY.find(body).map_or("", |m| &body[..m.start()]);
        let above_fold = replace_tags(above_fold, &IMG_TAG, |caps| defer_image(&caps[0]));

        let critical_css = SHELL_CRITICAL_CSS_JS.render(&CriticalCssVars {
            url: ScriptJson::new(&ctx.state.critical_stylesheet())?,
        });
        let content = SHELL_CONTENT_JS.render(&ShellContentVars {
            content: ScriptJson::split_string(body)?,
        });

        let mut shell = String::with_capacity(body.len() * 2 + SHELL_CSS.len() + 4096);
        shell.push_str("<!DOCTYPE html><html><head>");
        shell.push_str(&carried_head(head));
        shell.push_str(&style_tag(SHELL_CSS));
        shell.push_str(&script_tag(&critical_css));
        shell.push_str(&script_tag(SHELL_LOADER_JS.text()));
        shell.push_str("</head><body>");
        shell.push_str(&above_fold);
        shell.push_str(REMAINING_CONTENT);
        shell.push_str(&script_tag(&content));
        shell.push_str("</body></html>");
        Ok(shell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CspConfig, Flags};
    use crate::pipeline::DocumentState;
    use crate::pipeline::stage::test_support::{PAGE, anchor_counts, run};

    #[test]
    fn test_shell_layout() {
        let out = run(&ExtremeShell, PAGE);
        assert!(out.starts_with(r#"<!DOCTYPE html><html><head><meta charset="utf-8"><style>"#));
        assert!(out.ends_with("</script></body></html>"));
        assert!(out.contains("__perfShellCriticalCss"));
        assert!(out.contains("__perfShellLoader"));
        assert!(out.contains(r#""/static/css/styles-m.css""#));
        assert!(out.contains(REMAINING_CONTENT));
        assert_eq!(anchor_counts(&out), [1, 1, 1, 1]);
    }

    #[test]
    fn test_above_fold_stops_at_footer() {
        let out = run(&ExtremeShell, PAGE);
        let visible = &out[out.find("</head><body>").unwrap()..out.find(REMAINING_CONTENT).unwrap()];
        assert!(visible.contains(r#"<img src="/media/logo/store.png" alt="Store logo">"#));
        assert!(visible.contains(r#"data-src="/media/banner.jpg""#));
        assert!(!visible.contains("FOOTER"));
        assert!(!visible.contains("<link"));
    }

    #[test]
    fn test_full_body_is_split_json() {
        let html = r#"<html><head></head><body><p>"hi"</p><script src="/a.js"></script></body></html>"#;
        let out = run(&ExtremeShell, html);
        assert!(out.contains(r#"window.fullPageContent="<p>\"hi\"<\/p><scr" + "ipt src=\"/a.js\"><\/scr" + "ipt>""#)
            || out.contains(r#"window.fullPageContent = "<p>\"hi\"<\/p><scr" + "ipt src=\"/a.js\"><\/scr" + "ipt>""#));
        assert!(!out.contains("<script src"));
    }

    #[test]
    fn test_small_images_stay_eager() {
        let html = r#"<html><head></head><body><img src="/badge.png" width="40"><img src="/x.jpg" width="400"><div class="footer"></div></body></html>"#;
        let out = run(&ExtremeShell, html);
        assert!(out.contains(r#"<body><img src="/badge.png" width="40">"#));
        assert!(out.contains(r#"data-src="/x.jpg""#));
    }

    #[test]
    fn test_missing_body_is_error() {
        let csp = CspConfig::default();
        let mut ctx = StageContext::new(Flags::all(), &csp, DocumentState::default());
        let err = ExtremeShell.apply("<div>fragment</div>".into(), &mut ctx).unwrap_err();
        assert!(matches!(err, StageError::MissingAnchor("<body>")));
    }
}
