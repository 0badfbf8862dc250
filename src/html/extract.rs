//! Resource discovery.
//!
//! Finds stylesheet links, external scripts and images in document order and
//! describes each one with a [`ResourceDescriptor`]. Only the first stylesheet
//! of a document is marked critical.

use super::tag;
use crate::utils::html::has_balanced_quotes;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// `<link …>` start tags.
pub static LINK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<link\b[^>]*>").unwrap());

/// Empty-bodied `<script …></script>` elements.
pub static SCRIPT_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<script\b[^>]*>\s*</script\s*>").unwrap());

/// `<img …>` tags.
pub static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());

static GTM_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)GTM-[A-Z0-9]+").unwrap());

/// Host keywords of analytics scripts.
const ANALYTICS_HOSTS: [&str; 5] = ["google", "gtag", "gtm", "analytics", "facebook"];

/// Host keywords of large CDN bundles.
const BUNDLE_HOSTS: [&str; 4] = ["jsdelivr", "cdn", "static", "_cache"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Stylesheet,
    Script,
    Image,
}

/// A resource reference found in the markup.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub url: String,
    /// The matched markup, byte-for-byte.
    pub raw_tag: String,
    pub attributes: FxHashMap<String, String>,
    /// Byte offset of `raw_tag` in the document.
    pub position: usize,
    pub critical: bool,
}

impl ResourceDescriptor {
    fn new(kind: ResourceKind, url: &str, raw_tag: &str, position: usize) -> Self {
        Self {
            kind,
            url: url.to_string(),
            raw_tag: raw_tag.to_string(),
            attributes: tag::to_map(raw_tag),
            position,
            critical: false,
        }
    }

    /// Host part of the URL, if it is absolute or protocol-relative.
    pub fn host(&self) -> Option<&str> {
        host(&self.url)
    }
}

fn collect<F>(html: &str, re: &Regex, mut describe: F) -> Vec<ResourceDescriptor>
where
    F: FnMut(&str, usize) -> Option<ResourceDescriptor>,
{
    re.find_iter(html)
        .filter(|m| has_balanced_quotes(m.as_str()))
        .filter_map(|m| describe(m.as_str(), m.start()))
        .collect()
}

/// `rel="stylesheet"` links with an `href`, first one critical.
pub fn stylesheets(html: &str) -> Vec<ResourceDescriptor> {
    let mut found = collect(html, &LINK_TAG, |raw, pos| {
        if !is_stylesheet_link(raw) {
            return None;
        }
        let href = tag::get(raw, "href").filter(|h| !h.is_empty())?;
        Some(ResourceDescriptor::new(ResourceKind::Stylesheet, href, raw, pos))
    });
    if let Some(first) = found.first_mut() {
        first.critical = true;
    }
    found
}

/// Whether a `<link>` tag is a stylesheet (rel token match, any case).
pub fn is_stylesheet_link(raw: &str) -> bool {
    tag::get(raw, "rel").is_some_and(|rel| {
        rel.split_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    })
}

/// External `<script src></script>` elements.
pub fn scripts(html: &str) -> Vec<ResourceDescriptor> {
    collect(html, &SCRIPT_ELEMENT, |raw, pos| {
        let src = tag::get(raw, "src").filter(|s| !s.is_empty())?;
        Some(ResourceDescriptor::new(ResourceKind::Script, src, raw, pos))
    })
}

/// `<img>` tags with a real (non-`data:`) `src`.
pub fn images(html: &str) -> Vec<ResourceDescriptor> {
    collect(html, &IMG_TAG, |raw, pos| {
        let src = tag::get(raw, "src").filter(|s| !s.is_empty() && !is_data_uri(s))?;
        Some(ResourceDescriptor::new(ResourceKind::Image, src, raw, pos))
    })
}

/// Scripts served from analytics/tag-manager hosts.
pub fn analytics_scripts(html: &str) -> Vec<ResourceDescriptor> {
    scripts(html)
        .into_iter()
        .filter(|s| host_matches(&s.url, &ANALYTICS_HOSTS))
        .collect()
}

/// Absolute scripts from CDN-like hosts.
pub fn large_bundles(html: &str) -> Vec<ResourceDescriptor> {
    scripts(html)
        .into_iter()
        .filter(|s| host_matches(&s.url, &BUNDLE_HOSTS))
        .collect()
}

/// First `GTM-…` container ID in any of `urls`, as written.
pub fn gtm_container_id<'a>(urls: impl IntoIterator<Item = &'a str>) -> Option<String> {
    urls.into_iter()
        .find_map(|url| GTM_ID.find(url).map(|m| m.as_str().to_string()))
}

pub fn is_data_uri(url: &str) -> bool {
    url.trim_start()
        .get(..5)
        .is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}

/// Host of an `http(s)://` or `//` URL. Relative URLs have none.
pub fn host(url: &str) -> Option<&str> {
    let rest = url.trim();
    let rest = if let Some(r) = strip_prefix_ci(rest, "https://") {
        r
    } else if let Some(r) = strip_prefix_ci(rest, "http://") {
        r
    } else {
        rest.strip_prefix("//")?
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..end];
    (!host.is_empty()).then_some(host)
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    s.get(..prefix.len())
        .filter(|p| p.eq_ignore_ascii_case(prefix))
        .map(|_| &s[prefix.len()..])
}

/// Whether the URL's host contains any of `keywords` (case-insensitive).
pub fn host_matches(url: &str, keywords: &[&str]) -> bool {
    host(url).is_some_and(|h| {
        let h = h.to_ascii_lowercase();
        keywords.iter().any(|k| h.contains(k))
    })
}
