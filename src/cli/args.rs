//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// XML document cache CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: nearest xmlcache.toml)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load a document and print a summary
    #[command(visible_alias = "i")]
    Info {
        #[command(flatten)]
        args: FileArgs,
    },

    /// Load a document and write it back with the configured formatting
    #[command(visible_alias = "f")]
    Format {
        #[command(flatten)]
        args: FileArgs,

        /// Write to this file instead of the input
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Clear the read-only attribute of the target before writing
        #[arg(long)]
        make_writable: bool,
    },

    /// Load a document and reload it whenever the file changes on disk
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        args: FileArgs,
    },
}

impl Commands {
    pub fn file_args(&self) -> &FileArgs {
        match self {
            Self::Info { args } | Self::Format { args, .. } | Self::Watch { args } => args,
        }
    }
}

/// Arguments shared by every subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct FileArgs {
    /// XML file path or file:// URL
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub file: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}
