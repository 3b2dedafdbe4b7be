use std::path::PathBuf;

use miette::Diagnostic;
use scrapbook_core::UploadError;
use thiserror::Error;

/// Top-level error type for scrapbook operations
#[derive(Debug, Error, Diagnostic)]
pub enum ScrapbookError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(scrapbook::upload))]
    Upload(#[from] UploadError),

    #[error("failed to read {}", path.display())]
    #[diagnostic(code(scrapbook::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize output")]
    #[diagnostic(code(scrapbook::serialize))]
    Serialize(#[from] serde_json::Error),

    #[error("failed to initialize telemetry: {0}")]
    #[diagnostic(code(scrapbook::telemetry))]
    Telemetry(String),
}

/// Configuration errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid configuration value for {field}: {message}")]
    #[diagnostic(code(config::invalid))]
    Invalid { field: &'static str, message: String },

    #[error("failed to parse URL: {url}")]
    #[diagnostic(
        code(config::url_parse),
        help("Upload endpoints must be absolute, e.g. http://localhost:3000/api/img")
    )]
    UrlParse { url: String, message: String },

    #[error("unsupported config file format: {}", path.display())]
    #[diagnostic(
        code(config::format),
        help("Config files must end in .json or .toml")
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to access config file {}", path.display())]
    #[diagnostic(code(config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {message}", path.display())]
    #[diagnostic(code(config::parse))]
    Parse { path: PathBuf, message: String },

    #[error("failed to write config file {}: {message}", path.display())]
    #[diagnostic(code(config::serialize))]
    Serialize { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, ScrapbookError>;
