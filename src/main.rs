//! Parley - translation, speech-to-text and text-to-speech service
//!
//! Runs the HTTP API or a single operation from the command line.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parley::cli::{Args, Commands};
use parley::config::Config;
use parley::language::language_names;
use parley::server;
use parley::services::Services;
use parley::transcribe::AudioInput;

const DEFAULT_CONFIG_FILE: &str = "parley.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The guard flushes buffered file logs on exit
    let _log_guard = setup_logging(args.verbose)?;

    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let services = Arc::new(Services::from_config(&config)?);
            server::serve(&config.server, services).await?;
        }
        Commands::Translate {
            text,
            source,
            target,
        } => {
            let services = Services::from_config(&config)?;
            let source = match source {
                Some(source) => source,
                None => services
                    .detector
                    .detect(&text)
                    .await?
                    .context("Could not determine the source language; pass --source")?,
            };

            let translation = services.translator.translate(&text, &source, &target).await?;
            info!("Translated {} -> {} via {} route", source, target, translation.route.label());
            println!("{}", translation.text);
        }
        Commands::Transcribe { input } => {
            let services = Services::from_config(&config)?;
            let audio = AudioInput::from_path(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let transcript = services.transcriber.transcribe(&audio).await?;
            println!("{}", serde_json::to_string_pretty(&transcript)?);
        }
        Commands::Synthesize { text, lang, output } => {
            let services = Services::from_config(&config)?;
            let artifact = services.synthesizer.synthesize(&text, &lang).await?;

            tokio::fs::copy(&artifact.path, &output)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Wrote {} ({} voice, {})",
                output.display(),
                artifact.voice_language,
                artifact.engine
            );
        }
        Commands::Detect { text } => {
            let services = Services::from_config(&config)?;
            let lang = services
                .detector
                .detect(&text)
                .await?
                .unwrap_or_else(|| parley::detect::UNDETERMINED.to_string());
            println!("{}", lang);
        }
        Commands::Languages => {
            println!("{:<6} {}", "Code", "Language");
            println!("{}", "-".repeat(24));
            for (code, name) in language_names() {
                println!("{:<6} {}", code, name);
            }
        }
        Commands::Pairs => {
            let services = Services::from_config(&config)?;
            let translator = &services.translator;
            println!("Pivot language: {}", translator.pivot_language());
            for pair in translator.supported_pairs().sorted() {
                println!("{}", pair);
            }
        }
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists; use --force to overwrite", output.display());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// `--config` if given, else `parley.toml` in the working directory, else defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()));
    }

    if Path::new(DEFAULT_CONFIG_FILE).exists() {
        info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
        return Ok(Config::from_file(DEFAULT_CONFIG_FILE)?);
    }

    Ok(Config::default())
}

/// Setup logging to both console and a daily-rolling file under `.parley/log`
fn setup_logging(verbose: bool) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".parley").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "parley.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("parley.log").display()
    );

    Ok(guard)
}
