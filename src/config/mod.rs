//! Optimizer configuration management for `perf.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── optimizer  # [optimizer]
//! │   ├── csp        # [csp]
//! │   ├── image      # [image]
//! │   └── serve      # [serve]
//! ├── error.rs       # ConfigError, diagnostics, field paths
//! ├── flag.rs        # Flag, FlagSource, Flags snapshot
//! └── mod.rs         # PerfConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section         | Purpose                                         |
//! |-----------------|-------------------------------------------------|
//! | `[optimizer]`   | Pipeline switches and large-body threshold      |
//! | `[csp]`         | Content-Security-Policy host allowlists         |
//! | `[image]`       | Quality candidates and accepted extensions      |
//! | `[serve]`       | Preview server (interface, port, root)          |

mod error;
mod flag;
pub mod section;

pub use flag::{Flag, FlagSource, Flags};
pub use section::{CspConfig, ImageConfig, OptimizerConfig, ServeConfig};
pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath, Severity};

use crate::cli::{Cli, Commands, FlagArgs};
use crate::log;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "perf.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing perf.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    #[serde(default)]
    pub csp: CspConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl PerfConfig {
    /// Load the config named on the command line, apply CLI overrides, then
    /// validate.
    pub fn load_with_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::read(cli.config.as_deref())?;
        config.apply_command_options(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    ///
    /// A path the user named explicitly must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE), false),
        };

        let mut config = if path.exists() || explicit {
            Self::from_path(&path)?
        } else {
            Self::default()
        };

        if let Some(config_path) = config.config_path.clone() {
            config.resolve_paths(config_path.parent().unwrap_or(Path::new(".")));
        }
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Make relative paths relative to the config file's directory.
    fn resolve_paths(&mut self, base: &Path) {
        if self.serve.root.is_relative() {
            self.serve.root = base.join(&self.serve.root);
        }
    }

    // ========================================================================
    // CLI overrides
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Optimize { flags, .. } => self.apply_flag_args(flags),
            Commands::Serve {
                flags,
                interface,
                port,
                root,
            } => {
                self.apply_flag_args(flags);
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.root, root.as_ref());
            }
            Commands::Convert { args } => {
                Self::update_option(&mut self.image.speed, args.speed.as_ref());
            }
        }
    }

    fn apply_flag_args(&mut self, args: &FlagArgs) {
        let optimizer = &mut self.optimizer;
        Self::update_option(&mut optimizer.progressive_loading, args.progressive_loading.as_ref());
        Self::update_option(&mut optimizer.image_optimization, args.image_optimization.as_ref());
        Self::update_option(&mut optimizer.js_optimization, args.js_optimization.as_ref());
        Self::update_option(&mut optimizer.web_worker, args.web_worker.as_ref());
        Self::update_option(&mut optimizer.critical_path, args.critical_path.as_ref());
        Self::update_option(&mut optimizer.http2_push, args.http2_push.as_ref());
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Validate every section, collecting all errors at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.optimizer.validate(&mut diag);
        self.csp.validate(&mut diag);
        self.image.validate(&mut diag);
        self.serve.validate(&mut diag);

        diag.print_warnings();
        diag.into_result().map_err(ConfigError::Diagnostics)
    }

    /// Snapshot of the optimizer switches.
    pub fn flags(&self) -> Flags {
        Flags::snapshot(&self.optimizer)
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> PerfConfig {
    let (parsed, ignored) = PerfConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) =
            PerfConfig::parse_with_ignored("[optimizer]\nenable = true\nturbo = true").unwrap();
        assert_eq!(ignored, vec!["optimizer.turbo".to_string()]);
    }

    #[test]
    fn test_from_str_rejects_bad_types() {
        let err = PerfConfig::from_str("[optimizer]\nenable = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_missing_default_file_uses_defaults() {
        let config = PerfConfig::load(None).unwrap();
        assert!(config.optimizer.enable);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = PerfConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn test_load_resolves_serve_root() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("perf.toml");
        fs::write(&path, "[serve]\nroot = \"site\"\n").unwrap();

        let config = PerfConfig::load(Some(&path)).unwrap();
        assert_eq!(config.serve.root, dir.path().join("site"));
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_reports_diagnostics() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("perf.toml");
        fs::write(&path, "[image]\nqualities = []\n").unwrap();

        let err = PerfConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Diagnostics(_)));
    }

    #[test]
    fn test_cli_overrides() {
        use clap::Parser;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("perf.toml");
        fs::write(&path, "[optimizer]\ncritical_path = true\n[serve]\nport = 9000\n").unwrap();
        let config_arg = path.to_string_lossy().into_owned();

        let cli = Cli::try_parse_from([
            "storefront-perf",
            "-C",
            config_arg.as_str(),
            "serve",
            "--critical-path=false",
            "--port",
            "8080",
        ])
        .unwrap();
        let config = PerfConfig::load_with_cli(&cli).unwrap();
        assert!(!config.optimizer.critical_path);
        assert!(config.optimizer.image_optimization);
        assert_eq!(config.serve.port, 8080);
    }

    #[test]
    fn test_flags_snapshot() {
        let config = test_parse_config("[optimizer]\nprogressive_loading = true");
        assert!(config.flags().get(Flag::ProgressiveLoading));
    }
}
