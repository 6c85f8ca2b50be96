//! xmlcache - inspect, reformat and watch XML documents.

mod cli;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use xmlcache::CacheConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    xmlcache::logger::set_verbose(cli.command.file_args().verbose);

    let config = CacheConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Info { args } => cli::info::show_info(&args.file, config),
        Commands::Format {
            args,
            output,
            make_writable,
        } => cli::format::format_file(&args.file, output.as_deref(), *make_writable, config),
        Commands::Watch { args } => cli::watch::watch_file(&args.file, config),
    }
}
