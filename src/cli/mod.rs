//! Command-line interface module.

mod args;
pub mod format;
pub mod info;
pub mod watch;

pub use args::{Cli, Commands};
