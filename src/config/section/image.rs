//! `[image]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [image]
//! qualities = [70, 60, 80, 50, 90]    # Tried in this order
//! extensions = ["jpg", "jpeg", "png"] # Accepted source formats
//! speed = 6                           # Encoder speed, 1 (slow) to 10 (fast)
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// Image quality search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub qualities: Vec<u8>,
    pub extensions: Vec<String>,
    pub speed: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            qualities: vec![70, 60, 80, 50, 90],
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            speed: 6,
        }
    }
}

impl ImageConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.qualities.is_empty() {
            diag.error(FieldPath::new("image.qualities"), "must not be empty");
        }
        if let Some(q) = self.qualities.iter().find(|q| !(1..=100).contains(*q)) {
            diag.error(
                FieldPath::new("image.qualities"),
                format!("quality {q} is outside 1..=100"),
            );
        }
        if !(1..=10).contains(&self.speed) {
            diag.error(FieldPath::new("image.speed"), "must be between 1 and 10");
        }
        if self.extensions.is_empty() {
            diag.error(FieldPath::new("image.extensions"), "must not be empty");
        }
    }

    /// Whether `ext` is an accepted source extension (case-insensitive).
    pub fn accepts(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}
