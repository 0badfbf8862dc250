//! storefront-perf - storefront HTML performance optimizer.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use storefront_perf::cli::{self, Cli, Commands};
use storefront_perf::{PerfConfig, logger};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = PerfConfig::load_with_cli(&cli)?;

    match &cli.command {
        Commands::Optimize { args, .. } => cli::optimize::optimize_file(args, &config),
        Commands::Convert { args } => cli::convert::convert_images(args, &config),
        Commands::Serve { .. } => cli::serve::serve_site(&config),
    }
}
