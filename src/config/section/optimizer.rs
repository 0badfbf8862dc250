//! `[optimizer]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [optimizer]
//! enable = true                   # Master switch
//! performance = true              # Run the performance pipeline
//! progressive_loading = false     # Rebuild pages as a shell (replaces the standard passes)
//! image_optimization = true       # Lazy-load images behind placeholders
//! js_optimization = true          # Chunked bundles, RequireJS booster, delayed GTM
//! web_worker = false              # Background task queue (needs js_optimization)
//! critical_path = true            # Preload hints for critical resources
//! http2_push = false              # Also emit the preload list as a `Link:` header
//! large_body_threshold = 1000000  # Bodies above this many bytes get the lightweight pass
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// Pipeline switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub enable: bool,
    pub performance: bool,
    pub progressive_loading: bool,
    pub image_optimization: bool,
    pub js_optimization: bool,
    pub web_worker: bool,
    pub critical_path: bool,
    pub http2_push: bool,
    pub large_body_threshold: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            performance: true,
            progressive_loading: false,
            image_optimization: true,
            js_optimization: true,
            web_worker: false,
            critical_path: true,
            http2_push: false,
            large_body_threshold: 1_000_000,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.large_body_threshold == 0 {
            diag.error_with_hint(
                FieldPath::new("optimizer.large_body_threshold"),
                "must be greater than 0",
                "the default is 1000000 bytes",
            );
        }
        if self.web_worker && !self.js_optimization {
            diag.warn(
                FieldPath::new("optimizer.web_worker"),
                "has no effect while js_optimization is disabled",
            );
        }
        if self.http2_push && !self.critical_path {
            diag.warn(
                FieldPath::new("optimizer.http2_push"),
                "has no effect while critical_path is disabled",
            );
        }
    }
}
