//! Image lazy loading with low-quality placeholders.
//!
//! Every eager `<img>` gets the placeholder as `src`, its real URL in
//! `data-src` and `loading="lazy"`. Logos, icons and images that are already
//! lazy or explicitly high priority are left alone. Product gallery images
//! (`fotorama__img`) are promoted back to eager, high-priority loading.

use super::{PLACEHOLDER_SRC, Stage, StageError, inject_once};
use crate::embed::js::LQIP_JS;
use crate::html::extract::{self, IMG_TAG};
use crate::html::rewrite::{Anchor, Rewrite, rewrite_tags};
use crate::html::tag;
use crate::pipeline::StageContext;
use regex::Regex;
use std::sync::LazyLock;

static GALLERY_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:jpe?g|png|gif)$").unwrap());

pub struct ImageLazyLoad;

/// Whether an `<img>` must keep loading eagerly.
fn keep_eager(raw: &str) -> bool {
    raw.contains("logo")
        || raw.contains("icon")
        || tag::has(raw, "data-src")
        || tag::is(raw, "loading", "lazy")
        || tag::is(raw, "fetchpriority", "high")
}

fn lazify(raw: &str) -> Rewrite {
    let Some(src) = tag::get(raw, "src").filter(|s| !s.is_empty() && !extract::is_data_uri(s))
    else {
        return Rewrite::Keep;
    };
    if keep_eager(raw) {
        return Rewrite::Keep;
    }

    let out = tag::set(raw, "src", PLACEHOLDER_SRC);
    let out = tag::set(&out, "data-src", src);
    let out = tag::rename(&out, "srcset", "data-srcset");
    Rewrite::Replace(tag::set(&out, "loading", "lazy"))
}

fn promote_gallery_image(raw: &str) -> Rewrite {
    let in_gallery = tag::get(raw, "class").is_some_and(|c| c.contains("fotorama__img"));
    let Some(src) = tag::get(raw, "data-src").filter(|s| GALLERY_SOURCE.is_match(s.trim())) else {
        return Rewrite::Keep;
    };
    if !in_gallery {
        return Rewrite::Keep;
    }

    let out = tag::set(raw, "src", src);
    let out = tag::set(&out, "data-large", src);
    let out = tag::remove(&out, "data-src");
    let out = tag::rename(&out, "data-srcset", "srcset");
    let out = tag::remove(&out, "loading");
    let out = tag::add_class(&out, "product-critical-image");
    Rewrite::Replace(tag::set(&out, "fetchpriority", "high"))
}

impl Stage for ImageLazyLoad {
    fn apply(&self, html: String, _ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let html = inject_once(html, Anchor::HeadClose, "__perfLqip", LQIP_JS.text());
        let html = rewrite_tags(html, &IMG_TAG, |caps| lazify(&caps[0]));
        Ok(rewrite_tags(html, &IMG_TAG, |caps| promote_gallery_image(&caps[0])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::test_support::{PAGE, anchor_counts, run};

    #[test]
    fn test_eager_images_become_placeholders() {
        let out = run(&ImageLazyLoad, PAGE);
        assert!(out.contains(&format!(
            r#"<img src="{PLACEHOLDER_SRC}" data-srcset="/media/banner-2x.jpg 2x" alt="Banner" data-src="/media/banner.jpg" loading="lazy">"#
        )));
        assert!(out.contains(r#"data-src="/media/catalog/p1.jpg""#));
        assert!(out.find("__perfLqip") < out.find("</head>"));
        assert_eq!(anchor_counts(&out), anchor_counts(PAGE));
    }

    #[test]
    fn test_logos_and_icons_skipped() {
        let html = r#"<img src="/media/logo/store.png"><img class="icon-cart" src="/cart.svg"><img src="/a/icon.png">"#;
        assert_eq!(run(&ImageLazyLoad, html), html);
    }

    #[test]
    fn test_lazy_applied_exactly_once() {
        let once = run(&ImageLazyLoad, PAGE);
        let twice = run(&ImageLazyLoad, &once);
        assert_eq!(twice, once);
        assert_eq!(once.matches(r#"data-src="/media/banner.jpg""#).count(), 1);
        assert!(!once.contains(r#" src="/media/banner.jpg""#));
    }

    #[test]
    fn test_already_lazy_and_data_uri_untouched() {
        let html = r#"<img src="/a.jpg" loading="lazy"><img src="data:image/gif;base64,R0lG"><img src="/b.jpg" fetchpriority="high">"#;
        assert_eq!(run(&ImageLazyLoad, html), html);
    }

    #[test]
    fn test_gallery_image_promoted() {
        let html = r#"<img class="fotorama__img" src="/media/p/big.jpg" srcset="/media/p/big-2x.jpg 2x" alt="P">"#;
        let out = run(&ImageLazyLoad, html);
        assert_eq!(
            out,
            r#"<img class="fotorama__img product-critical-image" src="/media/p/big.jpg" srcset="/media/p/big-2x.jpg 2x" alt="P" data-large="/media/p/big.jpg" fetchpriority="high">"#
        );
        assert_eq!(run(&ImageLazyLoad, &out), out);
    }
}
