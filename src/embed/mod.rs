//! Embedded client-side snippets.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `json` - Script-safe JSON for values pasted into snippets
//! - `js` - Inline script snippets injected by pipeline stages
//! - `css` - Inline style blocks
//! - `artifact` - Standalone files served next to the pages
//!
//! Sources live in `src/embed/{js,css,static}` and are minified by the build
//! script. Placeholders are bare `__PERF_*__` globals so they survive
//! minification.
//!
//! # Usage
//!
//! ```ignore
//! use embed::js::{CHUNKED_BUNDLE_JS, BundleVars};
//!
//! let vars = BundleVars { url: ScriptJson::new(url)? };
//! let tag = script_tag(&CHUNKED_BUNDLE_JS.render(&vars));
//! ```

mod json;
mod template;

pub use json::{ScriptJson, script_safe};
pub use template::{NoVars, Template, TemplateVars};

/// Wrap code in an inline `<script>` element.
pub fn script_tag(code: &str) -> String {
    format!("<script>{code}</script>")
}

/// Wrap rules in an inline `<style>` element.
pub fn style_tag(css: &str) -> String {
    format!("<style>{css}</style>")
}

macro_rules! minified {
    ($name:literal) => {
        include_str!(concat!(env!("OUT_DIR"), "/", $name))
    };
}

pub mod js {
    use super::{NoVars, ScriptJson, Template, TemplateVars};

    /// Hardens `querySelector`, `querySelectorAll` and `addEventListener`
    /// and stubs the common analytics globals.
    pub const ERROR_GUARD_JS: Template<NoVars> = Template::new(minified!("error_guard.min.js"));

    pub const STREAMING_JS: Template<NoVars> = Template::new(minified!("streaming.min.js"));

    /// Emitted right after `</head>` together with the flush comment.
    pub const STREAMING_FLUSH_JS: Template<NoVars> =
        Template::new(minified!("streaming_flush.min.js"));

    pub const LQIP_JS: Template<NoVars> = Template::new(minified!("lqip.min.js"));

    pub const REQUIRE_BOOSTER_JS: Template<NoVars> =
        Template::new(minified!("require_booster.min.js"));

    pub const PARSE_DELAYER_JS: Template<NoVars> =
        Template::new(minified!("parse_delayer.min.js"));

    pub const TASK_WORKER_JS: Template<NoVars> = Template::new(minified!("task_worker.min.js"));

    pub const TRACKING_LOADER_JS: Template<NoVars> =
        Template::new(minified!("tracking_loader.min.js"));

    pub const PROGRESSIVE_JS: Template<NoVars> = Template::new(minified!("progressive.min.js"));

    pub const SHELL_LOADER_JS: Template<NoVars> = Template::new(minified!("shell_loader.min.js"));

    /// Variables for payload_loader.js.
    pub struct PayloadVars {
        /// `[{ "type": "js" | "css", "url": "…" }, …]`
        pub files: ScriptJson,
    }

    impl TemplateVars for PayloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__PERF_FILES__", self.files.as_str())
        }
    }

    pub const PAYLOAD_LOADER_JS: Template<PayloadVars> =
        Template::new(minified!("payload_loader.min.js"));

    /// Variables for chunked_bundle.js.
    pub struct BundleVars {
        pub url: ScriptJson,
    }

    impl TemplateVars for BundleVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__PERF_BUNDLE_URL__", self.url.as_str())
        }
    }

    pub const CHUNKED_BUNDLE_JS: Template<BundleVars> =
        Template::new(minified!("chunked_bundle.min.js"));

    /// Variables for delayed_gtm.js.
    pub struct DelayedGtmVars {
        pub src: ScriptJson,
    }

    impl TemplateVars for DelayedGtmVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__PERF_GTM_SRC__", self.src.as_str())
        }
    }

    pub const DELAYED_GTM_JS: Template<DelayedGtmVars> =
        Template::new(minified!("delayed_gtm.min.js"));

    /// Variables for analytics_loader.js.
    pub struct AnalyticsVars {
        /// External analytics script URLs.
        pub scripts: ScriptJson,
        /// Bodies of removed inline tracking snippets.
        pub inline_scripts: ScriptJson,
        /// Container ID or `null` when no GTM URL was found.
        pub gtm_id: ScriptJson,
    }

    impl TemplateVars for AnalyticsVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__PERF_ANALYTICS_SCRIPTS__", self.scripts.as_str())
                .replace("__PERF_INLINE_SCRIPTS__", self.inline_scripts.as_str())
                .replace("__PERF_GTM_ID__", self.gtm_id.as_str())
        }
    }

    pub const ANALYTICS_LOADER_JS: Template<AnalyticsVars> =
        Template::new(minified!("analytics_loader.min.js"));

    /// Variables for the snippets that fetch the critical stylesheet.
    pub struct CriticalCssVars {
        /// Stylesheet URL or `null`.
        pub url: ScriptJson,
    }

    impl TemplateVars for CriticalCssVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__PERF_CRITICAL_CSS_URL__", self.url.as_str())
        }
    }

    pub const ABOVE_FOLD_JS: Template<CriticalCssVars> =
        Template::new(minified!("above_fold.min.js"));

    pub const SHELL_CRITICAL_CSS_JS: Template<CriticalCssVars> =
        Template::new(minified!("shell_critical_css.min.js"));

    /// Variables for shell_content.js.
    pub struct ShellContentVars {
        /// Built with [`ScriptJson::split_string`].
        pub content: ScriptJson,
    }

    impl TemplateVars for ShellContentVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__PERF_FULL_CONTENT__", self.content.as_str())
        }
    }

    pub const SHELL_CONTENT_JS: Template<ShellContentVars> =
        Template::new(minified!("shell_content.min.js"));
}

pub mod css {
    /// Layout-shift fixes for product images, wrappers and late widgets.
    pub const CLS_FIX_CSS: &str = minified!("cls_fix.min.css");

    /// Base styles for the progressive-loading shell.
    pub const SHELL_CSS: &str = minified!("shell.min.css");
}

pub mod artifact {
    /// Cache-first service worker for CDN, `/static/` and `/media/` requests.
    pub const CDN_CACHE_SW_JS: &str = minified!("cdn_cache_sw.min.js");

    /// Diagnostics script that beacons timings to `/performance-log`.
    pub const DIAGNOSTICS_JS: &str = minified!("diagnostics.min.js");

    /// URL path of the service worker.
    pub const CDN_CACHE_SW_PATH: &str = "/cdn-cache-sw.js";

    /// URL path of the diagnostics script.
    pub const DIAGNOSTICS_PATH: &str = "/diagnostics.js";

    /// Beacon endpoint the diagnostics script posts to.
    pub const PERFORMANCE_LOG_PATH: &str = "/performance-log";
}
