//! `[csp]` section configuration.
//!
//! Host allowlists merged into the relaxed Content-Security-Policy. Keyword
//! sources (`'self'`, `'unsafe-inline'`, `data:`) are added by the pipeline
//! and do not need to be listed.
//!
//! # Example
//!
//! ```toml
//! [csp]
//! script_src = ["*.googletagmanager.com", "*.jsdelivr.net"]
//! style_src = ["*.googleapis.com"]
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// Content-Security-Policy allowlists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CspConfig {
    pub connect_src: Vec<String>,
    pub img_src: Vec<String>,
    pub script_src: Vec<String>,
    pub style_src: Vec<String>,
    pub frame_src: Vec<String>,
}

fn hosts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for CspConfig {
    fn default() -> Self {
        Self {
            connect_src: hosts(&[
                "*.google.com",
                "*.google-analytics.com",
                "*.analytics.google.com",
                "*.googletagmanager.com",
                "*.doubleclick.net",
                "*.facebook.com",
                "*.facebook.net",
                "*.fbcdn.net",
                "connect.facebook.net",
                "*.googleapis.com",
                "*.gstatic.com",
                "*.ccm.collect",
                "*.nr-data.net",
                "*.newrelic.com",
            ]),
            img_src: hosts(&[
                "*.google.com",
                "*.google-analytics.com",
                "*.googletagmanager.com",
                "*.google.com.eg",
                "*.googleapis.com",
                "*.gstatic.com",
                "*.doubleclick.net",
                "*.facebook.com",
                "*.facebook.net",
                "*.fbcdn.net",
            ]),
            script_src: hosts(&[
                "*.google.com",
                "*.google-analytics.com",
                "*.googletagmanager.com",
                "*.googleapis.com",
                "*.gstatic.com",
                "*.doubleclick.net",
                "*.facebook.com",
                "*.facebook.net",
                "connect.facebook.net",
                "*.fbcdn.net",
                "*.tabby.ai",
                "*.jsdelivr.net",
            ]),
            style_src: hosts(&["*.googleapis.com", "*.gstatic.com", "*.jsdelivr.net"]),
            frame_src: hosts(&[
                "*.doubleclick.net",
                "*.google.com",
                "*.facebook.com",
                "*.facebook.net",
            ]),
        }
    }
}

impl CspConfig {
    /// Reject entries that would break out of the directive.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let lists = [
            ("csp.connect_src", &self.connect_src),
            ("csp.img_src", &self.img_src),
            ("csp.script_src", &self.script_src),
            ("csp.style_src", &self.style_src),
            ("csp.frame_src", &self.frame_src),
        ];
        for (field, list) in lists {
            for host in list {
                if host.is_empty() || host.contains([';', '"', '<', '>']) || host.contains(char::is_whitespace) {
                    diag.error_with_hint(
                        FieldPath::new(field),
                        format!("invalid source `{host}`"),
                        "sources must be a single host expression without `;`, quotes or spaces",
                    );
                }
            }
        }
    }
}
