//! `[serve]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5277                 # HTTP port number
//! root = "public"             # Directory of pre-rendered pages and assets
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// Preview server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Directory served as `/`, relative to the config file.
    pub root: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5277,
            root: PathBuf::from("public"),
        }
    }
}

impl ServeConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.port == 0 {
            diag.error_with_hint(
                FieldPath::new("serve.port"),
                "port 0 is not allowed",
                "pick a free port such as 5277",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use std::net::Ipv6Addr;

    #[test]
    fn test_serve_defaults_to_localhost_public() {
        let serve = test_parse_config("").serve;
        assert!(serve.interface.is_loopback());
        assert_eq!((serve.port, serve.root), (5277, PathBuf::from("public")));
    }

    #[test]
    fn test_serve_overrides() {
        let serve = test_parse_config("[serve]\ninterface = \"::1\"\nport = 8080\nroot = \"pub/static\"").serve;
        assert_eq!(serve.interface, IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(serve.port, 8080);
        assert_eq!(serve.root, PathBuf::from("pub/static"));
    }

    #[test]
    fn test_port_zero_rejected() {
        let config = test_parse_config("[serve]\nport = 0");
        let mut diag = ConfigDiagnostics::new();
        config.serve.validate(&mut diag);
        assert!(diag.has_errors());
    }
}
