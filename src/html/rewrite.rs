//! Pattern rewriting over a document buffer.
//!
//! [`replace_all`] runs a callback for each non-overlapping regex match. The
//! callback decides per match whether to keep it or substitute new text, so
//! conditions the `regex` crate cannot express (look-ahead, attribute checks)
//! live in plain Rust. [`replace_tags`] adds a structural guard: a match whose
//! quotes do not balance was cut inside an attribute value and is kept as is.

use crate::utils::html::has_balanced_quotes;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

/// Outcome of a rewrite callback for one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Keep,
    Replace(String),
}

/// Replace matches of `re` in `html` as decided by `f`.
///
/// Returns `Cow::Borrowed` when nothing changed.
pub fn replace_all<'h, F>(html: &'h str, re: &Regex, mut f: F) -> Cow<'h, str>
where
    F: FnMut(&Captures<'_>) -> Rewrite,
{
    let mut out: Option<String> = None;
    let mut last = 0;

    for caps in re.captures_iter(html) {
        let Some(m) = caps.get(0) else { continue };
        if let Rewrite::Replace(text) = f(&caps) {
            let buf = out.get_or_insert_with(|| String::with_capacity(html.len()));
            buf.push_str(&html[last..m.start()]);
            buf.push_str(&text);
            last = m.end();
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&html[last..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(html),
    }
}

/// Like [`replace_all`], but matches with unbalanced quotes are never passed
/// to `f`.
pub fn replace_tags<'h, F>(html: &'h str, re: &Regex, mut f: F) -> Cow<'h, str>
where
    F: FnMut(&Captures<'_>) -> Rewrite,
{
    replace_all(html, re, |caps| {
        if has_balanced_quotes(&caps[0]) {
            f(caps)
        } else {
            Rewrite::Keep
        }
    })
}

/// Owned-buffer form of [`replace_tags`]; returns `html` itself when nothing
/// matched.
pub fn rewrite_tags<F>(html: String, re: &Regex, f: F) -> String
where
    F: FnMut(&Captures<'_>) -> Rewrite,
{
    let changed = match replace_tags(&html, re, f) {
        Cow::Owned(s) => Some(s),
        Cow::Borrowed(_) => None,
    };
    changed.unwrap_or(html)
}

/// Owned-buffer form of [`replace_all`].
pub fn rewrite_all<F>(html: String, re: &Regex, f: F) -> String
where
    F: FnMut(&Captures<'_>) -> Rewrite,
{
    let changed = match replace_all(&html, re, f) {
        Cow::Owned(s) => Some(s),
        Cow::Borrowed(_) => None,
    };
    changed.unwrap_or(html)
}

/// Apply byte-range replacements found on `html` in one pass.
///
/// Ranges must not overlap; they may come in any order.
pub fn splice(html: String, mut edits: Vec<(Range<usize>, String)>) -> String {
    if edits.is_empty() {
        return html;
    }
    edits.sort_by_key(|(range, _)| range.start);

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for (range, text) in edits {
        if range.start < last || range.end > html.len() {
            continue;
        }
        out.push_str(&html[last..range.start]);
        out.push_str(&text);
        last = range.end;
    }
    out.push_str(&html[last..]);
    out
}

// ============================================================================
// Anchors
// ============================================================================

static HEAD_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").unwrap());
static HEAD_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head\s*>").unwrap());
static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<body(?:\s[^>]*)?>").unwrap());
static BODY_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</body\s*>").unwrap());

/// Structural insertion points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Right after the first `<head …>`.
    HeadOpen,
    /// Right before the first `</head>`.
    HeadClose,
    /// Right after `</head>`.
    AfterHead,
    /// Right after the first `<body …>`.
    BodyOpen,
    /// Right before the last `</body>`.
    BodyClose,
}

impl Anchor {
    /// Byte offset where a snippet for this anchor goes.
    pub fn offset(self, html: &str) -> Option<usize> {
        match self {
            Self::HeadOpen => HEAD_OPEN.find(html).map(|m| m.end()),
            Self::HeadClose => HEAD_CLOSE.find(html).map(|m| m.start()),
            Self::AfterHead => HEAD_CLOSE.find(html).map(|m| m.end()),
            Self::BodyOpen => BODY_OPEN.find(html).map(|m| m.end()),
            Self::BodyClose => BODY_CLOSE.find_iter(html).last().map(|m| m.start()),
        }
    }
}

/// Insert `snippet` at `anchor`. A missing anchor leaves `html` untouched.
pub fn insert(mut html: String, anchor: Anchor, snippet: &str) -> String {
    if let Some(at) = anchor.offset(&html) {
        html.insert_str(at, snippet);
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    static IMG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());

    #[test]
    fn test_no_match_borrows() {
        let html = "<p>no images</p>";
        assert!(matches!(
            replace_all(html, &IMG, |_| Rewrite::Replace(String::new())),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_keep_everything_borrows() {
        let html = "<img src=a><img src=b>";
        assert!(matches!(replace_all(html, &IMG, |_| Rewrite::Keep), Cow::Borrowed(_)));
    }

    #[test]
    fn test_each_match_decided_independently() {
        let html = r#"<img src="a.jpg"><IMG src="logo.png"><img src="b.jpg">"#;
        let out = replace_all(html, &IMG, |caps| {
            if caps[0].contains("logo") {
                Rewrite::Keep
            } else {
                Rewrite::Replace("<x>".into())
            }
        });
        assert_eq!(out, r#"<x><IMG src="logo.png"><x>"#);
    }

    #[test]
    fn test_unbalanced_quotes_fail_closed() {
        let html = r#"<img alt="a > b" src="c.jpg"><img src="d.jpg">"#;
        let out = replace_tags(html, &IMG, |_| Rewrite::Replace("<x>".into()));
        assert_eq!(out, r#"<img alt="a > b" src="c.jpg"><x>"#);
    }

    #[test]
    fn test_rewrite_tags_returns_same_buffer() {
        let html = String::from("<p></p>");
        let ptr = html.as_ptr();
        let out = rewrite_tags(html, &IMG, |_| Rewrite::Keep);
        assert_eq!(out.as_ptr(), ptr);
    }

    #[test]
    fn test_splice_out_of_order() {
        let html = "<a><b><c>".to_string();
        let out = splice(html, vec![(6..9, String::new()), (0..3, "<x>".into())]);
        assert_eq!(out, "<x><b>");
    }

    #[test]
    fn test_splice_skips_overlap() {
        let html = "abcdef".to_string();
        let out = splice(html, vec![(0..3, "X".into()), (2..4, "Y".into())]);
        assert_eq!(out, "Xdef");
    }

    #[test]
    fn test_anchor_insertion() {
        let html = "<html><head lang=\"en\"><title>t</title></head><body class=\"x\"><header></header></body></html>".to_string();
        let html = insert(html, Anchor::HeadOpen, "[ho]");
        let html = insert(html, Anchor::HeadClose, "[hc]");
        let html = insert(html, Anchor::AfterHead, "[ah]");
        let html = insert(html, Anchor::BodyOpen, "[bo]");
        let html = insert(html, Anchor::BodyClose, "[bc]");
        assert_eq!(
            html,
            "<html><head lang=\"en\">[ho]<title>t</title>[hc]</head>[ah]<body class=\"x\">[bo]<header></header>[bc]</body></html>"
        );
    }

    #[test]
    fn test_header_is_not_head() {
        let html = "<header>menu</header>".to_string();
        assert_eq!(insert(html.clone(), Anchor::HeadOpen, "x"), html);
    }

    #[test]
    fn test_missing_anchor_is_noop() {
        let html = "<div>fragment</div>".to_string();
        for anchor in [
            Anchor::HeadOpen,
            Anchor::HeadClose,
            Anchor::AfterHead,
            Anchor::BodyOpen,
            Anchor::BodyClose,
        ] {
            assert_eq!(insert(html.clone(), anchor, "x"), html);
        }
    }
}
