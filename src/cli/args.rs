//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{ActionArg, AspectArg, GenderArg, LanguageArg};

/// Turn garment photos into a short runway video
#[derive(Parser, Debug)]
#[command(name = "catwalk")]
#[command(version, about = "Virtual fashion show video generator", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a video from reference images
    #[command(after_help = "EXAMPLES:
    catwalk generate -i dress.png --gender female --action walk
    catwalk generate -i top.jpg -i skirt.jpg --gender female --action stretch -o show.mp4

ENVIRONMENT:
    GEMINI_API_KEY    Your Gemini API key (or the variable named in the config).")]
    Generate(GenerateArgs),
    /// Check that an API key is available
    CheckKey,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Reference image (PNG, JPEG or WebP, under 5 MB). Repeat for up to 4.
    #[arg(long = "image", short = 'i', required = true)]
    pub images: Vec<PathBuf>,

    /// Model gender
    #[arg(long)]
    pub gender: GenderArg,

    /// What the model does
    #[arg(long)]
    pub action: ActionArg,

    /// Output aspect ratio (multiple images always use 16:9)
    #[arg(long, default_value = "9:16")]
    pub aspect_ratio: AspectArg,

    /// Output file (default: <output_dir>/catwalk-<hash>.mp4)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Language for progress messages
    #[arg(long)]
    pub lang: Option<LanguageArg>,

    /// Give up after this many seconds (0 waits indefinitely)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Seconds between status checks
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
