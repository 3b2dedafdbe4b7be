use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use scrapbook_common::telemetry::{self, TelemetryConfig};
use scrapbook_common::config::parse_endpoint;
use scrapbook_common::{Config, FileStore, ScrapbookError, coordinator_from_config};
use scrapbook_core::{
    ComposerHandle, ContentItem, IngestOrigin, PreviewManager, parse_content, submit,
};
use serde::Serialize;
use tracing::Level;

mod source;

use source::FileImage;

#[derive(Parser)]
#[command(version, about = "Scrapbook - collect text, links and images", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a .toml or .json config file
    #[arg(long, global = true, env = "SCRAPBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split text into text and link items
    Parse {
        /// Text to parse; read from stdin when omitted
        text: Option<String>,
    },
    /// Compose text and images and submit them
    Submit {
        /// Free text containing any mix of prose and links
        #[arg(long)]
        text: Option<String>,

        /// Image files to upload
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Override the upload endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Print upload metrics to stderr when done
        #[arg(long)]
        metrics: bool,
    },
    /// Inspect or create configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the default configuration to a file
    Init {
        /// Destination (.toml or .json); defaults to the user config directory
        path: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct SubmitOutput<'a> {
    items: &'a [ContentItem],
    failures: Vec<FailureOutput>,
}

#[derive(Serialize)]
struct FailureOutput {
    id: String,
    name: String,
    error: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => None,
        1 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    };
    let mut telemetry_config = TelemetryConfig::from_env("scrapbook");
    if let Some(level) = level {
        telemetry_config = telemetry_config.with_console_level(level);
    }
    telemetry::init(telemetry_config)?;

    match cli.command {
        Commands::Parse { text } => {
            let text = match text {
                Some(text) => text,
                None => read_stdin()?,
            };
            print_json(&parse_content(&text))?;
        }
        Commands::Submit {
            text,
            images,
            endpoint,
            metrics,
        } => {
            let mut config = load_config(cli.config.as_deref()).await?;
            if let Some(endpoint) = endpoint {
                config.upload.endpoint = parse_endpoint(&endpoint).map_err(ScrapbookError::from)?;
            }
            submit_content(&config, text, images).await?;
            if metrics {
                eprintln!("{}", telemetry::render().unwrap_or_default());
            }
        }
        Commands::Config { command } => match command {
            ConfigCommand::Show => {
                let config = load_config(cli.config.as_deref()).await?;
                print_json(&config)?;
            }
            ConfigCommand::Init { path } => {
                let path = match path.or(cli.config) {
                    Some(path) => path,
                    None => default_config_path()?,
                };
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).into_diagnostic()?;
                }
                Config::default()
                    .save(&FileStore::new(&path))
                    .await
                    .map_err(ScrapbookError::from)?;
                println!("Wrote default configuration to {}", path.display());
            }
        },
    }

    Ok(())
}

async fn submit_content(config: &Config, text: Option<String>, images: Vec<PathBuf>) -> Result<()> {
    let handle = ComposerHandle::new();
    if let Some(text) = text {
        handle.set_input_text(text);
    }

    let sources: Vec<FileImage> = images.iter().map(FileImage::new).collect();
    let added = PreviewManager::new()
        .ingest_into(&handle, IngestOrigin::FilePicker, &sources)
        .await;
    if added < sources.len() {
        tracing::warn!(
            skipped = sources.len() - added,
            "some files were not readable images and were skipped"
        );
    }

    if !handle.read(|s| s.can_submit()) {
        return Err(miette::miette!(
            help = "Pass --text and/or one or more --image paths",
            "nothing to submit"
        ));
    }

    let coordinator = coordinator_from_config(config);
    let report = submit(&handle, &coordinator).await;

    let state = handle.snapshot();
    let output = SubmitOutput {
        items: state.content_items(),
        failures: report
            .failures
            .iter()
            .map(|f| FailureOutput {
                id: f.id.to_string(),
                name: f.name.clone(),
                error: f.error.to_string(),
            })
            .collect(),
    };
    print_json(&output)?;

    if report.added == 0 {
        return Err(miette::miette!(
            "nothing was submitted: {} image(s) failed to upload",
            report.failures.len()
        ));
    }
    Ok(())
}

/// Explicit path first, then the user config file if present, then env on top.
async fn load_config(path: Option<&Path>) -> Result<Config> {
    let base = match path {
        Some(path) => Config::load(&FileStore::new(path))
            .await
            .map_err(ScrapbookError::from)?,
        None => match default_config_path() {
            Ok(path) if path.exists() => Config::load(&FileStore::new(&path))
                .await
                .map_err(ScrapbookError::from)?,
            _ => Config::default(),
        },
    };
    let config = base
        .with_overrides(|var| std::env::var(var).ok())
        .map_err(ScrapbookError::from)?;
    tracing::debug!(endpoint = %config.upload.endpoint, "configuration loaded");
    Ok(config)
}

fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("scrapbook").join("config.toml"))
        .ok_or_else(|| miette::miette!("Could not determine config directory"))
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|source| ScrapbookError::Io {
            path: PathBuf::from("<stdin>"),
            source,
        })?;
    Ok(text)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(ScrapbookError::from)?;
    println!("{json}");
    Ok(())
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_submit() {
        let cli = Cli::try_parse_from([
            "scrapbook",
            "submit",
            "--text",
            "hello https://example.com",
            "--image",
            "a.png",
            "--image",
            "b.png",
            "--endpoint",
            "http://localhost:9000/api/img",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Submit {
                text,
                images,
                endpoint,
                metrics,
            } => {
                assert_eq!(text.as_deref(), Some("hello https://example.com"));
                assert_eq!(images, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
                assert_eq!(endpoint.as_deref(), Some("http://localhost:9000/api/img"));
                assert!(!metrics);
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn test_cli_config_init_path() {
        let cli = Cli::try_parse_from(["scrapbook", "config", "init", "out.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommand::Init { path: Some(_) }
            }
        ));
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[upload]\nendpoint = \"https://img.example.com/api/img\"\nmax_bytes = 2048\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).await.unwrap();
        assert_eq!(config.upload.max_bytes, 2048);
    }

    #[tokio::test]
    async fn test_submit_with_nothing_is_an_error() {
        let err = submit_content(&Config::default(), Some("   ".into()), Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nothing to submit"));
    }
}
