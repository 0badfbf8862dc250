//! Rewriting stages.
//!
//! Each stage takes the whole buffer and returns the rewritten buffer. The
//! order they run in lives in [`super::STAGES`].
//!
//! | Stage            | Anchor / target                                  |
//! |------------------|--------------------------------------------------|
//! | `error_guard`    | `<head>` open                                    |
//! | `csp`            | `<head>` open                                    |
//! | `shell`          | whole document                                   |
//! | `payload`        | CDN bundles, non-critical stylesheets            |
//! | `streaming`      | `<head>` open, after `</head>`                   |
//! | `images`         | `<img>`, LQIP loader before `</head>`            |
//! | `javascript`     | merged bundles, RequireJS, GTM script            |
//! | `analytics`      | analytics scripts and inline tag snippets        |
//! | `critical_path`  | preload hints before `</head>`, `Link` header    |
//! | `tracking`       | remaining tracking scripts                       |
//! | `layout_shift`   | product images and wrappers                      |
//! | `above_fold`     | eager images, footer-like blocks                 |
//! | `progressive`    | `<body>` open, deferred stylesheets              |
//! | `lightweight`    | large-body fast path                             |

mod above_fold;
mod analytics;
mod critical_path;
mod csp;
mod error_guard;
mod images;
mod javascript;
mod layout_shift;
mod lightweight;
mod payload;
mod progressive;
mod shell;
mod streaming;
mod tracking;

pub use above_fold::AboveFold;
pub use analytics::Analytics;
pub use critical_path::CriticalPath;
pub use csp::CspMeta;
pub use error_guard::ErrorGuard;
pub use images::ImageLazyLoad;
pub use javascript::{JavaScript, TaskWorker};
pub use layout_shift::LayoutShift;
pub use lightweight::Lightweight;
pub use payload::PayloadSplit;
pub use progressive::Progressive;
pub use shell::ExtremeShell;
pub use streaming::Streaming;
pub use tracking::TrackingDeferral;

use super::StageContext;
use crate::embed::script_tag;
use crate::html::rewrite::{Anchor, insert};
use thiserror::Error;

/// 1x1 transparent SVG used in place of deferred image sources.
pub const PLACEHOLDER_SRC: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 1 1'%3E%3C/svg%3E";

/// One rewriting pass over the document buffer.
pub trait Stage: Sync {
    fn apply(&self, html: String, ctx: &mut StageContext<'_>) -> Result<String, StageError>;
}

/// Errors raised inside a stage. The pipeline keeps the pre-stage buffer.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to encode snippet data: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("document has no {0}")]
    MissingAnchor(&'static str),
}

/// Insert `code` as an inline script unless the document already carries
/// the snippet's `guard` property.
fn inject_once(html: String, anchor: Anchor, guard: &str, code: &str) -> String {
    if html.contains(guard) {
        return html;
    }
    insert(html, anchor, &script_tag(code))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::{CspConfig, Flags};
    use crate::pipeline::DocumentState;
    use regex::Regex;
    use std::sync::LazyLock;

    static ANCHORS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
        [
            Regex::new(r"(?i)<head(?:\s[^>]*)?>").unwrap(),
            Regex::new(r"(?i)</head\s*>").unwrap(),
            Regex::new(r"(?i)<body(?:\s[^>]*)?>").unwrap(),
            Regex::new(r"(?i)</body\s*>").unwrap(),
        ]
    });

    /// Counts of `<head>`, `</head>`, `<body>`, `</body>`.
    pub fn anchor_counts(html: &str) -> [usize; 4] {
        let mut counts = [0; 4];
        for (count, re) in counts.iter_mut().zip(ANCHORS.iter()) {
            *count = re.find_iter(html).count();
        }
        counts
    }

    /// Run `stage` once with every flag on.
    pub fn run(stage: &dyn Stage, html: &str) -> String {
        run_with(stage, html, Flags::all()).0
    }

    /// Run `stage` once, returning the buffer and queued headers.
    pub fn run_with(stage: &dyn Stage, html: &str, flags: Flags) -> (String, Vec<(String, String)>) {
        let csp = CspConfig::default();
        let mut ctx = StageContext::new(flags, &csp, DocumentState::from_document(html));
        let out = stage.apply(html.to_string(), &mut ctx).unwrap();
        (out, ctx.into_headers())
    }

    pub const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta charset="utf-8">
<link rel="stylesheet" href="/static/css/styles-m.css">
<link rel="stylesheet" href="/static/css/styles-l.css" media="screen and (min-width: 768px)">
<link rel="stylesheet" href="https://cdn.example.com/css/widgets.css">
<link rel="stylesheet" href="/static/css/print.css">
<script src="/static/requirejs/require.js"></script>
<script src="https://cdn.jsdelivr.net/gh/shop/theme@1.0/_cache/merged/abc.min.js"></script>
<script async src="https://www.googletagmanager.com/gtm.js?id=GTM-AB12CD"></script>
<script>window.dataLayer = window.dataLayer || []; function gtag(){dataLayer.push(arguments);}</script>
<script src="https://connect.facebook.net/en_US/fbevents.js"></script>
</head>
<body class="cms-index-index">
<header><img src="/media/logo/store.png" alt="Store logo"></header>
<div class="product-image-wrapper"><img class="product-image-photo" src="/media/catalog/p1.jpg" alt="P1"></div>
<img src="/media/banner.jpg" srcset="/media/banner-2x.jpg 2x" alt="Banner">
<img src="/media/hero.jpg" class="above-the-fold" alt="Hero">
<div class="footer-links">FOOTER</div>
</body></html>"#;
}
