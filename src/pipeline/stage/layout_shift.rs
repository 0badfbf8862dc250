//! Cumulative layout shift fixes.

use super::{Stage, StageError};
use crate::embed::css::CLS_FIX_CSS;
use crate::html::extract::IMG_TAG;
use crate::html::rewrite::{Anchor, Rewrite, insert, rewrite_tags};
use crate::html::tag;
use crate::pipeline::StageContext;
use regex::Regex;
use std::sync::LazyLock;

static DIV_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<div\b[^>]*>").unwrap());

const STYLE_ID: &str = "perf-cls-fix";
const FIX_CLASS: &str = "image-cls-fix";
const SIZED_IMAGE_CLASSES: [&str; 3] = ["product-image", "category-image", "gallery-placeholder"];
const WRAPPER_CLASSES: [&str; 2] = ["product-image-wrapper", "image-container"];
const WRAPPER_STYLE: &str = "min-height:200px; position:relative;";

pub struct LayoutShift;

fn class_of(raw: &str) -> Option<String> {
    tag::get(raw, "class").map(str::to_ascii_lowercase)
}

fn fix_image(raw: &str) -> Rewrite {
    let Some(class) = class_of(raw) else {
        return Rewrite::Keep;
    };
    if !SIZED_IMAGE_CLASSES.iter().any(|c| class.contains(c))
        || class.split_whitespace().any(|c| c == FIX_CLASS)
        || (tag::has(raw, "width") && tag::has(raw, "height"))
    {
        return Rewrite::Keep;
    }

    let mut out = tag::add_class(raw, FIX_CLASS);
    if class.contains("product-image") {
        for dimension in ["width", "height"] {
            if !tag::has(&out, dimension) {
                out = tag::set(&out, dimension, "300");
            }
        }
    }
    Rewrite::Replace(out)
}

fn reserve_wrapper(raw: &str) -> Rewrite {
    let Some(class) = class_of(raw) else {
        return Rewrite::Keep;
    };
    if !WRAPPER_CLASSES.iter().any(|c| class.contains(c)) {
        return Rewrite::Keep;
    }
    let style = match tag::get(raw, "style").map(str::trim) {
        Some(existing) if existing.contains("min-height") => return Rewrite::Keep,
        Some(existing) if !existing.is_empty() => {
            format!("{}; {WRAPPER_STYLE}", existing.trim_end_matches(';'))
        }
        _ => WRAPPER_STYLE.to_string(),
    };
    Rewrite::Replace(tag::set(raw, "style", &style))
}

/// Add the CLS style block before `</head>` once.
pub(super) fn insert_styles(html: String) -> String {
    if html.contains(STYLE_ID) {
        return html;
    }
    let style = format!(r#"<style id="{STYLE_ID}">{CLS_FIX_CSS}</style>"#);
    insert(html, Anchor::HeadClose, &style)
}

impl Stage for LayoutShift {
    fn apply(&self, html: String, _ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let html = insert_styles(html);
        let html = rewrite_tags(html, &IMG_TAG, |caps| fix_image(&caps[0]));
        Ok(rewrite_tags(html, &DIV_OPEN, |caps| reserve_wrapper(&caps[0])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::test_support::{PAGE, anchor_counts, run};

    #[test]
    fn test_style_block_before_head_close() {
        let out = run(&LayoutShift, PAGE);
        assert!(out.contains(&format!(r#"<style id="perf-cls-fix">{CLS_FIX_CSS}</style>"#)));
        assert!(out.find(STYLE_ID) < out.find("</head>"));
        assert_eq!(anchor_counts(&out), anchor_counts(PAGE));
    }

    #[test]
    fn test_product_image_sized() {
        let out = run(&LayoutShift, PAGE);
        assert!(out.contains(
            r#"<img class="product-image-photo image-cls-fix" src="/media/catalog/p1.jpg" alt="P1" width="300" height="300">"#
        ));
    }

    #[test]
    fn test_category_image_gets_class_only() {
        let html = r#"<img class="category-image" src="/c.jpg">"#;
        assert_eq!(run(&LayoutShift, html), r#"<img class="category-image image-cls-fix" src="/c.jpg">"#);
    }

    #[test]
    fn test_sized_images_untouched() {
        let html = r#"<img class="product-image-photo" src="/p.jpg" width="240" height="300">"#;
        assert_eq!(run(&LayoutShift, html), html);
    }

    #[test]
    fn test_wrapper_styles() {
        assert_eq!(
            run(&LayoutShift, r#"<div class="product-image-wrapper">"#),
            r#"<div class="product-image-wrapper" style="min-height:200px; position:relative;">"#
        );
        assert_eq!(
            run(&LayoutShift, r#"<div class="image-container" style="color:red;">"#),
            r#"<div class="image-container" style="color:red; min-height:200px; position:relative;">"#
        );
        let sized = r#"<div class="image-container" style="min-height:120px">"#;
        assert_eq!(run(&LayoutShift, sized), sized);
    }

    #[test]
    fn test_rerun_adds_nothing() {
        let once = run(&LayoutShift, PAGE);
        assert_eq!(run(&LayoutShift, &once), once);
    }
}
