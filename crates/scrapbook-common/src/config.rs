use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scrapbook_core::{ALLOWED_UPLOAD_TYPES, MAX_UPLOAD_BYTES, UploadConstraints};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use url::Url;

use crate::error::ConfigError;

/// Endpoint used when nothing else is configured.
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "http://localhost:3000/api/img";

/// Multipart field the endpoint reads the image from.
pub const DEFAULT_FIELD_NAME: &str = "file";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Upload endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Where images are POSTed as multipart form data.
    pub endpoint: Url,
    pub field_name: SmolStr,
    /// Per-image timeout. No timeout when unset.
    pub timeout_secs: Option<u64>,
    pub max_bytes: u64,
    pub allowed_types: Vec<SmolStr>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            field_name: SmolStr::new_static(DEFAULT_FIELD_NAME),
            timeout_secs: None,
            max_bytes: MAX_UPLOAD_BYTES,
            allowed_types: ALLOWED_UPLOAD_TYPES.iter().map(SmolStr::new).collect(),
        }
    }
}

impl UploadConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Local limits to check before sending anything.
    pub fn constraints(&self) -> UploadConstraints {
        UploadConstraints {
            max_bytes: self.max_bytes,
            allowed_types: self.allowed_types.clone(),
        }
    }
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_UPLOAD_ENDPOINT).expect("default endpoint is a valid URL")
}

impl Config {
    /// Load configuration from environment variables on top of the defaults.
    ///
    /// Optional env vars:
    /// - `SCRAPBOOK_UPLOAD_URL`: upload endpoint (default: `http://localhost:3000/api/img`)
    /// - `SCRAPBOOK_UPLOAD_FIELD`: multipart field name (default: `file`)
    /// - `SCRAPBOOK_UPLOAD_TIMEOUT_SECS`: per-image timeout in seconds
    /// - `SCRAPBOOK_UPLOAD_MAX_BYTES`: local size limit (default: 5 MiB)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::default().with_overrides(lookup)
    }

    /// Apply environment-style overrides to an already loaded config.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup("SCRAPBOOK_UPLOAD_URL") {
            self.upload.endpoint = parse_endpoint(&url)?;
        }

        if let Some(field) = lookup("SCRAPBOOK_UPLOAD_FIELD") {
            if field.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "SCRAPBOOK_UPLOAD_FIELD",
                    message: "field name cannot be empty".into(),
                });
            }
            self.upload.field_name = field.trim().into();
        }

        if let Some(secs) = lookup("SCRAPBOOK_UPLOAD_TIMEOUT_SECS") {
            self.upload.timeout_secs = Some(parse_number("SCRAPBOOK_UPLOAD_TIMEOUT_SECS", &secs)?);
        }

        if let Some(bytes) = lookup("SCRAPBOOK_UPLOAD_MAX_BYTES") {
            self.upload.max_bytes = parse_number("SCRAPBOOK_UPLOAD_MAX_BYTES", &bytes)?;
        }

        Ok(self)
    }

    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self, ConfigError> {
        loader.load().await
    }

    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<(), ConfigError> {
        saver.save(self).await
    }
}

/// Parse an endpoint URL, requiring an http(s) scheme.
pub fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::UrlParse {
        url: raw.to_string(),
        message: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UrlParse {
            url: raw.to_string(),
            message: format!("unsupported scheme {other}"),
        }),
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        field,
        message: e.to_string(),
    })
}

/// The trait for loading configuration data.
pub trait Loader {
    fn load(&self) -> impl Future<Output = Result<Config, ConfigError>> + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    fn save(&self, config: &Config) -> impl Future<Output = Result<(), ConfigError>> + Send;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
///
/// The format follows the file extension: `.json` or `.toml`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String, ConfigError> {
        std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn parse_error(&self, e: impl std::fmt::Display) -> ConfigError {
        ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }

    fn serialize_error(&self, e: impl std::fmt::Display) -> ConfigError {
        ConfigError::Serialize {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}

impl Loader for FileStore {
    async fn load(&self) -> Result<Config, ConfigError> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&self.read()?).map_err(|e| self.parse_error(e)),
            Some("toml") => toml::from_str(&self.read()?).map_err(|e| self.parse_error(e)),
            _ => Err(ConfigError::UnsupportedFormat {
                path: self.path.clone(),
            }),
        }
    }
}

impl Saver for FileStore {
    async fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                serde_json::to_string_pretty(config).map_err(|e| self.serialize_error(e))?
            }
            Some("toml") => toml::to_string_pretty(config).map_err(|e| self.serialize_error(e))?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: self.path.clone(),
                });
            }
        };
        std::fs::write(&self.path, contents).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
