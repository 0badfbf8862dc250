//! Fast path for very large documents.
//!
//! Regex passes over multi-megabyte bodies cost more than they save, so only
//! three cheap fixes run: the error guard, the CLS style block and native
//! `loading="lazy"` on images that do not choose a loading mode.

use super::layout_shift::insert_styles;
use super::{ErrorGuard, Stage, StageError};
use crate::html::extract::IMG_TAG;
use crate::html::rewrite::{Rewrite, rewrite_tags};
use crate::html::tag;
use crate::pipeline::StageContext;

pub struct Lightweight;

impl Stage for Lightweight {
    fn apply(&self, html: String, ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let html = ErrorGuard.apply(html, ctx)?;
        let html = insert_styles(html);
        Ok(rewrite_tags(html, &IMG_TAG, |caps| {
            if tag::has(&caps[0], "loading") {
                Rewrite::Keep
            } else {
                Rewrite::Replace(tag::set(&caps[0], "loading", "lazy"))
            }
        }))
    }
}
