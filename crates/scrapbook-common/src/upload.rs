//! HTTP image uploader speaking the multipart upload endpoint protocol.
//!
//! The endpoint takes a single multipart field (`file` by default) and answers
//! with JSON. Success bodies carry the remote reference in `secure_url`;
//! failures carry a human-readable `error`.

use reqwest::multipart::{Form, Part};
use scrapbook_core::{
    ImageUploader, PreviewImage, UploadCoordinator, UploadError, UploadFile, UploadObserver,
};
use serde::Deserialize;
use smol_str::SmolStr;
use url::Url;

use crate::config::{Config, DEFAULT_FIELD_NAME, UploadConfig};

#[derive(Debug, Default, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    error: Option<String>,
}

/// Uploads images to a multipart HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpImageUploader {
    client: reqwest::Client,
    endpoint: Url,
    field_name: SmolStr,
}

impl HttpImageUploader {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            field_name: SmolStr::new_static(DEFAULT_FIELD_NAME),
        }
    }

    pub fn with_field_name(mut self, field_name: impl Into<SmolStr>) -> Self {
        self.field_name = field_name.into();
        self
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.endpoint.clone()).with_field_name(config.field_name.clone())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send(&self, file: UploadFile) -> Result<String, UploadError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name)
            .mime_str(&file.mime_type)
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let form = Form::new().part(self.field_name.to_string(), part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let parsed: UploadResponse = serde_json::from_str(&body).unwrap_or_default();

        if !status.is_success() {
            let message = match parsed.error {
                Some(error) => error,
                None if !body.trim().is_empty() => body.trim().to_string(),
                None => status.canonical_reason().unwrap_or_default().to_string(),
            };
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        parsed
            .secure_url
            .or(parsed.url)
            .filter(|url| !url.is_empty())
            .ok_or(UploadError::MissingReference)
    }
}

impl ImageUploader for HttpImageUploader {
    async fn upload(&self, file: UploadFile) -> Result<String, UploadError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            name = %file.name,
            size = file.size(),
            mime_type = %file.mime_type,
            "uploading image"
        );
        self.send(file).await
    }
}

/// Counts every per-image result in `scrapbook_uploads_total`, labelled by outcome.
/// Does nothing unless the `telemetry` feature is on.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadMetrics;

impl UploadObserver for UploadMetrics {
    #[cfg(feature = "telemetry")]
    fn observe(&self, _preview: &PreviewImage, result: &Result<String, UploadError>) {
        metrics::counter!("scrapbook_uploads_total", "outcome" => outcome_label(result))
            .increment(1);
    }

    #[cfg(not(feature = "telemetry"))]
    fn observe(&self, _preview: &PreviewImage, _result: &Result<String, UploadError>) {}
}

/// Coordinator over the HTTP uploader, with upload metrics.
pub type HttpCoordinator = UploadCoordinator<HttpImageUploader, UploadMetrics>;

/// Build a coordinator wired to the configured endpoint, limits and timeout.
pub fn coordinator_from_config(config: &Config) -> HttpCoordinator {
    let coordinator = UploadCoordinator::new(HttpImageUploader::from_config(&config.upload))
        .with_constraints(config.upload.constraints())
        .with_observer(UploadMetrics);
    match config.upload.timeout() {
        Some(timeout) => coordinator.with_timeout(timeout),
        None => coordinator,
    }
}

#[cfg_attr(not(feature = "telemetry"), allow(dead_code))]
fn outcome_label(result: &Result<String, UploadError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(UploadError::Rejected { .. }) => "rejected",
        Err(UploadError::MissingReference) => "missing_reference",
        Err(UploadError::TooLarge { .. }) => "too_large",
        Err(UploadError::UnsupportedType { .. }) => "unsupported_type",
        Err(UploadError::TimedOut) => "timed_out",
        Err(UploadError::Decode(_)) => "decode",
        Err(_) => "transport",
    }
}
