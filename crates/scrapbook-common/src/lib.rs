//! Shared plumbing for scrapbook front ends: configuration, the HTTP image
//! uploader, error types and (optionally) telemetry.

pub mod config;
pub mod error;
#[cfg(feature = "telemetry")]
pub mod telemetry;
pub mod upload;

pub use crate::config::{Config, FileStore, Loader, Saver, UploadConfig};
pub use crate::error::{ConfigError, Result, ScrapbookError};
pub use crate::upload::{
    HttpCoordinator, HttpImageUploader, UploadMetrics, coordinator_from_config,
};
