//! Network payload splitting.
//!
//! Large CDN bundles and every non-critical stylesheet leave the markup and
//! are handed to a loader that fetches them after first render: stylesheets
//! in parallel, scripts one by one in 100,000-character chunks.

use super::{Stage, StageError};
use crate::debug;
use crate::embed::js::{PAYLOAD_LOADER_JS, PayloadVars};
use crate::embed::{ScriptJson, script_tag};
use crate::html::extract;
use crate::html::rewrite::{Anchor, insert, splice};
use crate::pipeline::StageContext;
use serde::Serialize;

pub struct PayloadSplit;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum FileType {
    Js,
    Css,
}

/// One entry of the loader's file list.
#[derive(Debug, Serialize)]
struct DeferredFile {
    #[serde(rename = "type")]
    kind: FileType,
    url: String,
}

impl Stage for PayloadSplit {
    fn apply(&self, html: String, ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let mut files = Vec::new();
        let mut removed = Vec::new();

        for bundle in extract::large_bundles(&html) {
            removed.push((bundle.position..bundle.position + bundle.raw_tag.len(), String::new()));
            files.push(DeferredFile {
                kind: FileType::Js,
                url: bundle.url,
            });
        }

        for sheet in extract::stylesheets(&html) {
            // Stylesheets named "critical" stay blocking.
            if ctx.state.is_critical_stylesheet(&sheet.url) || sheet.url.contains("critical") {
                continue;
            }
            removed.push((sheet.position..sheet.position + sheet.raw_tag.len(), String::new()));
            files.push(DeferredFile {
                kind: FileType::Css,
                url: sheet.url,
            });
        }

        if files.is_empty() {
            return Ok(html);
        }
        debug!("pipeline"; "deferring {} large file(s)", files.len());

        let loader = PAYLOAD_LOADER_JS.render(&PayloadVars {
            files: ScriptJson::new(&files)?,
        });
        let html = splice(html, removed);
        Ok(insert(html, Anchor::HeadClose, &script_tag(&loader)))
    }
}
