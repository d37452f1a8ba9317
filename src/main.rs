use clap::Parser;

use catwalk::cli::{self, Args, Command};
use catwalk::config::Config;

/// Load .env file without overriding existing environment variables.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    if let Ok(path) = dotenv::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Load config. An explicit --config path must exist; the default path may not.
fn load_config(args: &Args) -> Result<Config, String> {
    let result = match &args.config {
        Some(path) => Config::load_from_explicit(path),
        None => Config::load(None),
    };
    result.map_err(|e| e.to_string())
}

fn run(args: &Args) -> Result<(), String> {
    match &args.command {
        Command::Config { action } => {
            cli::handle_config_action(action.clone(), args.config.as_deref())
        }
        Command::CheckKey => {
            let config = load_config(args)?;
            cli::run_check_key(&config)
        }
        Command::Generate(generate) => {
            let config = load_config(args)?;
            cli::run_generate(generate.clone(), &config)
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    load_env();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
