//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction, GenerateArgs};
pub use commands::{
    collect_request, handle_config_action, resolve_settings, run_check_key, run_generate,
};
pub use enums::{ActionArg, AspectArg, GenderArg, LanguageArg};
