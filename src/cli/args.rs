//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Storefront HTML performance optimizer
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: perf.toml if present)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run an HTML document through the optimization pipeline
    #[command(visible_alias = "o")]
    Optimize {
        #[command(flatten)]
        args: OptimizeArgs,

        #[command(flatten)]
        flags: FlagArgs,
    },

    /// Convert images to AVIF at the smallest acceptable quality
    #[command(visible_alias = "c")]
    Convert {
        #[command(flatten)]
        args: ConvertArgs,
    },

    /// Serve a directory of rendered pages through the pipeline
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        flags: FlagArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory to serve
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        root: Option<PathBuf>,
    },
}

/// Optimize command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct OptimizeArgs {
    /// HTML file to optimize. Use `-` to read from stdin.
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Print the headers the pipeline would send (e.g. `Link`) to stderr
    #[arg(long)]
    pub headers: bool,
}

/// Convert command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Image files or directories to convert
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Encoder speed, 1 (smallest files) to 10 (fastest)
    #[arg(short, long)]
    pub speed: Option<u8>,

    /// Remove the source file after a successful conversion
    #[arg(long)]
    pub replace: bool,
}

/// Optimizer switch overrides shared by `optimize` and `serve`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FlagArgs {
    /// Rebuild pages as a minimal shell with deferred content
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub progressive_loading: Option<bool>,

    /// Lazy-load images behind placeholders
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub image_optimization: Option<bool>,

    /// Chunked bundles, RequireJS booster and delayed tag manager
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub js_optimization: Option<bool>,

    /// Inject the background task worker
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub web_worker: Option<bool>,

    /// Emit preload hints for critical resources
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub critical_path: Option<bool>,

    /// Also send the preload list as a `Link` header
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub http2_push: Option<bool>,
}
