//! Relaxed Content-Security-Policy meta tag.
//!
//! Widens the policy enough for the deferred loaders to fetch analytics,
//! CDN bundles and blob workers. Host lists come from `[csp]`.

use super::{Stage, StageError};
use crate::config::CspConfig;
use crate::html::rewrite::{Anchor, insert};
use crate::pipeline::StageContext;

pub struct CspMeta;

/// Policy text for the `content` attribute.
pub fn policy(csp: &CspConfig) -> String {
    fn directive(name: &str, hosts: &[String], keywords: &str) -> String {
        let mut out = String::from(name);
        for host in hosts {
            out.push(' ');
            out.push_str(host);
        }
        out.push(' ');
        out.push_str(keywords);
        out
    }

    [
        directive("connect-src", &csp.connect_src, "'self'"),
        directive("img-src", &csp.img_src, "data: 'self'"),
        directive("script-src", &csp.script_src, "'unsafe-inline' 'unsafe-eval' 'self'"),
        directive("style-src", &csp.style_src, "'unsafe-inline' 'self'"),
        directive("frame-src", &csp.frame_src, "'self'"),
        "worker-src blob: 'self'".to_string(),
        "child-src blob: 'self'".to_string(),
        "font-src * data: 'self'".to_string(),
    ]
    .join("; ")
}

impl Stage for CspMeta {
    fn apply(&self, html: String, ctx: &mut StageContext<'_>) -> Result<String, StageError> {
        let meta = format!(
            r#"<meta http-equiv="Content-Security-Policy" content="{}">"#,
            policy(ctx.csp)
        );
        Ok(insert(html, Anchor::HeadOpen, &meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::pipeline::stage::test_support::{PAGE, anchor_counts, run};

    #[test]
    fn test_policy_directives() {
        let policy = policy(&CspConfig::default());
        assert!(policy.starts_with("connect-src *.google.com "));
        assert!(policy.contains("script-src ") && policy.contains("*.jsdelivr.net 'unsafe-inline' 'unsafe-eval' 'self'"));
        assert!(policy.contains("; worker-src blob: 'self'; child-src blob: 'self'; font-src * data: 'self'"));
        assert!(!policy.contains('"'));
    }

    #[test]
    fn test_policy_uses_configured_hosts() {
        let config = test_parse_config("[csp]\nframe_src = [\"*.youtube.com\"]");
        assert!(policy(&config.csp).contains("frame-src *.youtube.com 'self'"));
    }

    #[test]
    fn test_meta_at_head_open() {
        let out = run(&CspMeta, "<html><head><title>t</title></head></html>");
        assert!(out.starts_with(r#"<html><head><meta http-equiv="Content-Security-Policy" content="connect-src"#));
        assert_eq!(anchor_counts(&run(&CspMeta, PAGE)), anchor_counts(PAGE));
    }
}
