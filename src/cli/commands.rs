//! Subcommand handlers for generate, check-key and config actions.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::args::{ConfigAction, GenerateArgs};
use crate::collector::{CollectorError, GenerationRequest, ImageCandidate, InputCollector};
use crate::config::{default_path as get_config_path, Config};
use crate::keys::{key_from_env, KeyError, KeyProvider, PromptKey, StaticKey};
use crate::messages::{Language, Message};
use crate::orchestrator::{
    GenerationState, Orchestrator, OrchestratorError, OrchestratorSettings, StateKind,
};
use crate::veo::VeoClient;

/// Resolve orchestrator settings: CLI flags over config values.
pub fn resolve_settings(args: &GenerateArgs, config: &Config) -> OrchestratorSettings {
    let mut settings = config.generation.settings();
    if let Some(secs) = args.poll_interval {
        settings.poll_interval = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = args.timeout {
        settings.deadline = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if let Some(lang) = args.lang {
        settings.language = lang.into();
    }
    settings
}

/// Validate the images and selections into a request.
pub fn collect_request(args: &GenerateArgs, lang: Language) -> Result<GenerationRequest, String> {
    let mut collector = InputCollector::new();

    let candidates = args
        .images
        .iter()
        .map(|path| ImageCandidate::from_path(path))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    for result in collector.add_images(candidates) {
        result.map_err(|e| e.to_string())?;
    }

    let requested = args.aspect_ratio.into();
    let effective = collector.set_aspect_ratio(requested);
    if effective != requested {
        eprintln!(
            "Note: multiple reference images always produce {} video.",
            effective
        );
    }
    collector.set_gender(args.gender.into());
    collector.set_action(args.action.into());

    collector.build_request().map_err(|e| match e {
        CollectorError::NoImages => Message::ErrorEmpty.text(lang).to_string(),
        other => other.to_string(),
    })
}

fn output_path(args: &GenerateArgs, config: &Config, default_name: String) -> PathBuf {
    args.output
        .clone()
        .unwrap_or_else(|| config.generation.output_dir.join(default_name))
}

/// Run the generate command.
pub fn run_generate(args: GenerateArgs, config: &Config) -> Result<(), String> {
    let settings = resolve_settings(&args, config);
    let request = collect_request(&args, settings.language)?;
    let key = key_from_env(&config.api.key_env);

    if std::io::stdin().is_terminal() {
        generate_with(PromptKey::stdin(key), true, &args, config, settings, &request)
    } else {
        generate_with(StaticKey::new(key), false, &args, config, settings, &request)
    }
}

/// Offer interactive key selection. `Ok(false)` means the user declined.
fn offer_key_selection<K: KeyProvider>(
    orchestrator: &mut Orchestrator<VeoClient, K>,
) -> Result<bool, String> {
    eprintln!("Enter a new API key to retry, or press Enter to quit.");
    match orchestrator.select_key() {
        Ok(()) => Ok(true),
        Err(OrchestratorError::Key(KeyError::Empty)) => Ok(false),
        Err(e) => Err(e.to_string()),
    }
}

/// Error line for a generation that ended without a video.
fn failure_message(state: &GenerationState, lang: Language) -> String {
    state
        .error()
        .map(|e| e.describe(lang))
        .unwrap_or_else(|| Message::ErrorGen.text(lang).to_string())
}

fn generate_with<K: KeyProvider>(
    keys: K,
    interactive: bool,
    args: &GenerateArgs,
    config: &Config,
    settings: OrchestratorSettings,
    request: &GenerationRequest,
) -> Result<(), String> {
    let lang = settings.language;
    let client = VeoClient::with_base_url(config.api.base_url.clone())
        .map_err(|e| format!("Failed to create video client: {}", e))?;
    let mut orchestrator = Orchestrator::new(client, keys, settings);

    if let Some(notification) = orchestrator.check_key() {
        eprintln!("{}", notification);
        if !interactive || !offer_key_selection(&mut orchestrator)? {
            return Err(format!(
                "No API key. Set {} in the environment or a .env file.",
                config.api.key_env
            ));
        }
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling...");
        handler_token.cancel();
    })
    .map_err(|e| format!("Failed to install Ctrl-C handler: {}", e))?;

    loop {
        let kind = rt
            .block_on(orchestrator.generate(request, &cancel, |n| eprintln!("{}", n)))
            .map_err(|e| e.to_string())?
            .kind();

        match kind {
            StateKind::Succeeded => {
                let handle = orchestrator
                    .state()
                    .video()
                    .ok_or_else(|| "Generation finished without a video".to_string())?;
                let path = output_path(args, config, handle.default_file_name());
                handle
                    .save_to(&path)
                    .map_err(|e| format!("Failed to save video to {}: {}", path.display(), e))?;
                println!("{}", path.display());
                return Ok(());
            }
            StateKind::AwaitingKey => {
                if interactive && !cancel.is_cancelled() && offer_key_selection(&mut orchestrator)?
                {
                    continue;
                }
                return Err(Message::ErrorKey.text(lang).to_string());
            }
            _ => return Err(failure_message(orchestrator.state(), lang)),
        }
    }
}

/// Run the check-key command.
pub fn run_check_key(config: &Config) -> Result<(), String> {
    let client = VeoClient::with_base_url(config.api.base_url.clone())
        .map_err(|e| format!("Failed to create video client: {}", e))?;
    let keys = StaticKey::from_env(&config.api.key_env);
    let mut orchestrator = Orchestrator::new(client, keys, config.generation.settings());

    match orchestrator.check_key() {
        None => {
            println!("API key found ({:?})", orchestrator.keys().api_key());
            Ok(())
        }
        Some(notification) => Err(format!(
            "{}\nSet {} in the environment or a .env file.",
            notification, config.api.key_env
        )),
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: Option<&Path>) -> Result<(), String> {
    let path = config_path.map(PathBuf::from).unwrap_or_else(get_config_path);

    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(&path)).map_err(|e| e.to_string())?;
            let rendered = config.to_toml_string().map_err(|e| e.to_string())?;

            println!("Current configuration:");
            println!();
            print!("{}", rendered);
            println!();
            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found, showing defaults)", path.display());
            }
            Ok(())
        }
        ConfigAction::Init { force } => {
            Config::write_default(&path, force).map_err(|e| e.to_string())?;
            println!("Created config file: {}", path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::enums::{ActionArg, AspectArg, GenderArg, LanguageArg};
    use crate::model::AspectRatio;
    use crate::orchestrator::GenerationError;
    use tempfile::TempDir;

    fn args_for(images: Vec<PathBuf>) -> GenerateArgs {
        GenerateArgs {
            images,
            gender: GenderArg::Female,
            action: ActionArg::Walk,
            aspect_ratio: AspectArg::Portrait,
            output: None,
            lang: None,
            timeout: None,
            poll_interval: None,
        }
    }

    fn write_png(dir: &TempDir, name: &str, fill: u8) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, vec![fill; 32]).unwrap();
        path
    }

    #[test]
    fn test_resolve_settings_flags_override_config() {
        let mut args = args_for(vec![]);
        args.timeout = Some(90);
        args.poll_interval = Some(3);
        args.lang = Some(LanguageArg::En);

        let settings = resolve_settings(&args, &Config::default());
        assert_eq!(settings.deadline, Some(Duration::from_secs(90)));
        assert_eq!(settings.poll_interval, Duration::from_secs(3));
        assert_eq!(settings.language, Language::En);
    }

    #[test]
    fn test_resolve_settings_zero_timeout_is_unbounded() {
        let mut config = Config::default();
        config.generation.timeout_secs = 30;
        let mut args = args_for(vec![]);
        args.timeout = Some(0);
        assert_eq!(resolve_settings(&args, &config).deadline, None);
    }

    #[test]
    fn test_collect_request_single_image() {
        let dir = TempDir::new().unwrap();
        let args = args_for(vec![write_png(&dir, "a.png", 1)]);
        let request = collect_request(&args, Language::En).unwrap();
        assert_eq!(request.images().len(), 1);
        assert_eq!(request.aspect_ratio(), AspectRatio::Portrait);
    }

    #[test]
    fn test_collect_request_multi_image_forces_landscape() {
        let dir = TempDir::new().unwrap();
        let args = args_for(vec![
            write_png(&dir, "a.png", 1),
            write_png(&dir, "b.png", 2),
        ]);
        let request = collect_request(&args, Language::En).unwrap();
        assert_eq!(request.aspect_ratio(), AspectRatio::Landscape);
    }

    #[test]
    fn test_collect_request_rejects_unsupported_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        let err = collect_request(&args_for(vec![path]), Language::En).unwrap_err();
        assert!(err.contains("notes.txt"));
    }

    #[test]
    fn test_collect_request_missing_file() {
        let err = collect_request(
            &args_for(vec![PathBuf::from("/nonexistent/a.png")]),
            Language::En,
        )
        .unwrap_err();
        assert!(err.contains("a.png"));
    }

    #[test]
    fn test_collect_request_empty_uses_localized_message() {
        let err = collect_request(&args_for(vec![]), Language::En).unwrap_err();
        assert_eq!(err, "Please upload at least one reference image");
    }

    #[test]
    fn test_failure_message_without_provider_text() {
        let state = GenerationState::Failed(GenerationError::Provider {
            message: String::new(),
        });
        assert_eq!(
            failure_message(&state, Language::En),
            "Video generation failed"
        );

        let state = GenerationState::Failed(GenerationError::Provider {
            message: "Quota exceeded".to_string(),
        });
        assert_eq!(
            failure_message(&state, Language::En),
            "Video generation failed: Quota exceeded"
        );
        assert_eq!(
            failure_message(&GenerationState::Idle, Language::ZhCn),
            Message::ErrorGen.text(Language::ZhCn)
        );
    }

    #[test]
    fn test_output_path_defaults_to_output_dir() {
        let mut config = Config::default();
        config.generation.output_dir = PathBuf::from("/tmp/videos");
        let args = args_for(vec![]);
        assert_eq!(
            output_path(&args, &config, "catwalk-x.mp4".to_string()),
            PathBuf::from("/tmp/videos/catwalk-x.mp4")
        );

        let mut args = args_for(vec![]);
        args.output = Some(PathBuf::from("show.mp4"));
        assert_eq!(
            output_path(&args, &config, "ignored".to_string()),
            PathBuf::from("show.mp4")
        );
    }

    #[test]
    fn test_config_init_then_show() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        handle_config_action(ConfigAction::Init { force: false }, Some(&path)).unwrap();
        assert!(path.exists());
        handle_config_action(ConfigAction::Show, Some(&path)).unwrap();
        assert!(handle_config_action(ConfigAction::Init { force: false }, Some(&path)).is_err());
    }
}
