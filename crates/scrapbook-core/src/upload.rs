//! Upload coordination: resolving pending previews into committed image items.
//!
//! The actual transfer is delegated to an [`ImageUploader`] implementation
//! (HTTP in `scrapbook-common`, fakes in tests). Each image is attempted once;
//! failures drop that image and never fail the batch.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use smol_str::SmolStr;
use thiserror::Error;

use crate::data_url::{self, DataUrlError};
use crate::types::{ContentItem, ItemId, PreviewImage};

/// Largest image the upload endpoint accepts (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// MIME types the upload endpoint accepts.
pub const ALLOWED_UPLOAD_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Why a single image failed to upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UploadError {
    /// The preview's embedded data could not be turned back into bytes.
    #[error("could not decode preview data: {0}")]
    Decode(#[from] DataUrlError),

    #[error("unsupported image type {mime_type}")]
    UnsupportedType { mime_type: SmolStr },

    #[error("image is {size} bytes, limit is {max}")]
    TooLarge { size: u64, max: u64 },

    /// The endpoint answered with a non-success status.
    #[error("upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response.
    #[error("upload transport error: {0}")]
    Transport(String),

    /// Success status, but no remote reference in the body.
    #[error("upload response did not include a remote reference")]
    MissingReference,

    #[error("upload timed out")]
    TimedOut,
}

/// An image ready to hand to the upload collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: SmolStr,
    pub bytes: Bytes,
}

impl UploadFile {
    /// Rebuild the binary file from a preview's data URI.
    pub fn from_preview(preview: &PreviewImage) -> Result<Self, UploadError> {
        let decoded = data_url::decode(&preview.data)?;
        Ok(Self {
            name: preview.name.clone(),
            mime_type: decoded.mime_type,
            bytes: decoded.bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// The external service that stores an image and returns a remote reference.
pub trait ImageUploader {
    /// Upload one image, returning its remote URL.
    fn upload(&self, file: UploadFile) -> impl Future<Output = Result<String, UploadError>>;
}

impl<U: ImageUploader + ?Sized> ImageUploader for &U {
    fn upload(&self, file: UploadFile) -> impl Future<Output = Result<String, UploadError>> {
        (**self).upload(file)
    }
}

impl<U: ImageUploader + ?Sized> ImageUploader for std::sync::Arc<U> {
    fn upload(&self, file: UploadFile) -> impl Future<Output = Result<String, UploadError>> {
        (**self).upload(file)
    }
}

/// Sees the result of every attempted image, including local rejections
/// and timeouts that never reach the uploader.
pub trait UploadObserver {
    fn observe(&self, preview: &PreviewImage, result: &Result<String, UploadError>);
}

impl UploadObserver for () {
    fn observe(&self, _: &PreviewImage, _: &Result<String, UploadError>) {}
}

/// Local pre-flight check mirroring the endpoint's published limits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadConstraints {
    pub max_bytes: u64,
    pub allowed_types: Vec<SmolStr>,
}

impl Default for UploadConstraints {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            allowed_types: ALLOWED_UPLOAD_TYPES.iter().map(|t| SmolStr::new(t)).collect(),
        }
    }
}

impl UploadConstraints {
    pub fn check(&self, file: &UploadFile) -> Result<(), UploadError> {
        if !self.allowed_types.iter().any(|t| t == &file.mime_type) {
            return Err(UploadError::UnsupportedType {
                mime_type: file.mime_type.clone(),
            });
        }
        if file.size() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: file.size(),
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// A preview that did not make it into the committed sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFailure {
    pub id: ItemId,
    pub name: String,
    pub error: UploadError,
}

/// Result of resolving a batch of previews.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Image items in the same order as the input previews, minus failures.
    pub items: Vec<ContentItem>,
    pub failures: Vec<UploadFailure>,
}

/// Resolves pending previews into image content items via an [`ImageUploader`].
#[derive(Clone, Debug)]
pub struct UploadCoordinator<U, O = ()> {
    uploader: U,
    observer: O,
    constraints: Option<UploadConstraints>,
    timeout: Option<Duration>,
}

impl<U: ImageUploader> UploadCoordinator<U> {
    pub fn new(uploader: U) -> Self {
        Self {
            uploader,
            observer: (),
            constraints: None,
            timeout: None,
        }
    }
}

impl<U: ImageUploader, O: UploadObserver> UploadCoordinator<U, O> {
    /// Report every per-image result to `observer`.
    pub fn with_observer<P: UploadObserver>(self, observer: P) -> UploadCoordinator<U, P> {
        UploadCoordinator {
            uploader: self.uploader,
            observer,
            constraints: self.constraints,
            timeout: self.timeout,
        }
    }

    /// Reject images locally when they break `constraints`, without a request.
    pub fn with_constraints(mut self, constraints: UploadConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Give up on any single upload after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Upload every preview concurrently.
    ///
    /// Successful uploads become image items carrying the preview's id and the
    /// remote URL. Output order follows input order regardless of which request
    /// finishes first.
    pub async fn resolve(&self, pending: &[PreviewImage]) -> UploadOutcome {
        let attempts = pending.iter().map(|preview| self.upload_one(preview));
        let results = n0_future::join_all(attempts).await;

        let mut outcome = UploadOutcome::default();
        for (preview, result) in pending.iter().zip(results) {
            self.observer.observe(preview, &result);
            match result {
                Ok(url) => {
                    tracing::debug!(id = %preview.id, url = %url, "image uploaded");
                    outcome
                        .items
                        .push(ContentItem::image(preview.id.clone(), url));
                }
                Err(error) => {
                    tracing::warn!(
                        id = %preview.id,
                        name = %preview.name,
                        error = %error,
                        "failed to upload image, dropping it"
                    );
                    outcome.failures.push(UploadFailure {
                        id: preview.id.clone(),
                        name: preview.name.clone(),
                        error,
                    });
                }
            }
        }
        outcome
    }

    async fn upload_one(&self, preview: &PreviewImage) -> Result<String, UploadError> {
        let file = UploadFile::from_preview(preview)?;
        if let Some(constraints) = &self.constraints {
            constraints.check(&file)?;
        }

        let upload = self.uploader.upload(file);
        match self.timeout {
            Some(limit) => n0_future::time::timeout(limit, upload)
                .await
                .map_err(|_| UploadError::TimedOut)?,
            None => upload.await,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Uploader that fails for names listed in `fail`, recording every call.
    #[derive(Default)]
    pub(crate) struct FakeUploader {
        pub fail: Vec<String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeUploader {
        pub fn failing(names: &[&str]) -> Self {
            Self {
                fail: names.iter().map(|n| n.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ImageUploader for FakeUploader {
        async fn upload(&self, file: UploadFile) -> Result<String, UploadError> {
            self.calls.lock().unwrap().push(file.name.clone());
            if self.fail.contains(&file.name) {
                return Err(UploadError::Rejected {
                    status: 500,
                    message: "Error uploading image".into(),
                });
            }
            Ok(format!("https://cdn.example.com/{}", file.name))
        }
    }

    /// Uploader that never finishes for names listed in `hang`.
    pub(crate) struct HangingUploader {
        hang: Vec<String>,
    }

    impl HangingUploader {
        pub fn on(names: &[&str]) -> Self {
            Self {
                hang: names.iter().map(|n| n.to_string()).collect(),
            }
        }
    }

    impl ImageUploader for HangingUploader {
        async fn upload(&self, file: UploadFile) -> Result<String, UploadError> {
            if self.hang.contains(&file.name) {
                std::future::pending::<()>().await;
            }
            Ok(format!("https://cdn.example.com/{}", file.name))
        }
    }

    /// Uploader that yields to the scheduler a few times before succeeding,
    /// so other tasks can run while an upload is in flight.
    #[derive(Default)]
    pub(crate) struct YieldingUploader {
        pub calls: Mutex<Vec<String>>,
    }

    impl ImageUploader for YieldingUploader {
        async fn upload(&self, file: UploadFile) -> Result<String, UploadError> {
            self.calls.lock().unwrap().push(file.name.clone());
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            Ok(format!("https://cdn.example.com/{}", file.name))
        }
    }

    pub(crate) fn png_preview(id: &str, name: &str) -> PreviewImage {
        PreviewImage {
            id: ItemId::from(id),
            data: data_url::encode("image/png", b"\x89PNG\r\n\x1a\n"),
            name: name.to_string(),
            size: 8,
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_order_and_ids() {
        let coordinator = UploadCoordinator::new(FakeUploader::failing(&["two.png"]));
        let pending = vec![
            png_preview("p1", "one.png"),
            png_preview("p2", "two.png"),
            png_preview("p3", "three.png"),
        ];

        let outcome = coordinator.resolve(&pending).await;

        assert_eq!(
            outcome.items,
            vec![
                ContentItem::image(ItemId::from("p1"), "https://cdn.example.com/one.png"),
                ContentItem::image(ItemId::from("p3"), "https://cdn.example.com/three.png"),
            ]
        );
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, "p2");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let coordinator = UploadCoordinator::new(FakeUploader::default());
        let outcome = coordinator.resolve(&[]).await;
        assert_eq!(outcome, UploadOutcome::default());
    }

    #[tokio::test]
    async fn test_corrupt_preview_is_dropped_without_request() {
        let uploader = FakeUploader::default();
        let coordinator = UploadCoordinator::new(&uploader);
        let mut broken = png_preview("p1", "broken.png");
        broken.data = "not a data uri".into();

        let outcome = coordinator.resolve(&[broken]).await;

        assert!(outcome.items.is_empty());
        assert!(matches!(outcome.failures[0].error, UploadError::Decode(_)));
        assert!(uploader.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_constraints_reject_locally() {
        let uploader = FakeUploader::default();
        let coordinator = UploadCoordinator::new(&uploader).with_constraints(UploadConstraints {
            max_bytes: 4,
            ..UploadConstraints::default()
        });
        let gif = PreviewImage {
            id: ItemId::from("g1"),
            data: data_url::encode("image/gif", b"GIF89a"),
            name: "anim.gif".into(),
            size: 6,
        };

        let outcome = coordinator
            .resolve(&[png_preview("p1", "big.png"), gif])
            .await;

        assert!(outcome.items.is_empty());
        assert_eq!(
            outcome.failures[0].error,
            UploadError::TooLarge { size: 8, max: 4 }
        );
        assert_eq!(
            outcome.failures[1].error,
            UploadError::UnsupportedType {
                mime_type: "image/gif".into()
            }
        );
        assert!(uploader.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hung_upload_times_out_alone() {
        let coordinator = UploadCoordinator::new(HangingUploader::on(&["stuck.png"]))
            .with_timeout(Duration::from_millis(10));
        let pending = vec![
            png_preview("p1", "stuck.png"),
            png_preview("p2", "fine.png"),
        ];

        let outcome = coordinator.resolve(&pending).await;

        assert_eq!(
            outcome.items,
            vec![ContentItem::image(
                ItemId::from("p2"),
                "https://cdn.example.com/fine.png"
            )]
        );
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, "p1");
        assert_eq!(outcome.failures[0].error, UploadError::TimedOut);
    }

    #[tokio::test]
    async fn test_observer_sees_every_result() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<(String, Result<String, UploadError>)>>);

        impl UploadObserver for &Recorder {
            fn observe(&self, preview: &PreviewImage, result: &Result<String, UploadError>) {
                self.0
                    .lock()
                    .unwrap()
                    .push((preview.name.clone(), result.clone()));
            }
        }

        let recorder = Recorder::default();
        let coordinator = UploadCoordinator::new(HangingUploader::on(&["stuck.png"]))
            .with_constraints(UploadConstraints {
                max_bytes: 4,
                ..UploadConstraints::default()
            })
            .with_timeout(Duration::from_millis(10))
            .with_observer(&recorder);
        let mut tiny = png_preview("p3", "tiny.png");
        tiny.data = data_url::encode("image/png", b"\x89PNG");

        let mut stuck = png_preview("p2", "stuck.png");
        stuck.data = tiny.data.clone();

        coordinator
            .resolve(&[png_preview("p1", "big.png"), stuck, tiny])
            .await;

        let seen = recorder.0.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (
                    "big.png".to_string(),
                    Err(UploadError::TooLarge { size: 8, max: 4 })
                ),
                ("stuck.png".to_string(), Err(UploadError::TimedOut)),
                (
                    "tiny.png".to_string(),
                    Ok("https://cdn.example.com/tiny.png".to_string())
                ),
            ]
        );
    }

    #[test]
    fn test_default_constraints_match_endpoint() {
        let constraints = UploadConstraints::default();
        let file = |mime: &str, len: usize| UploadFile {
            name: "x".into(),
            mime_type: mime.into(),
            bytes: Bytes::from(vec![0u8; len]),
        };

        assert!(constraints.check(&file("image/webp", 10)).is_ok());
        assert!(constraints.check(&file("image/jpeg", 5_242_880)).is_ok());
        assert!(constraints.check(&file("image/jpeg", 5_242_881)).is_err());
        assert!(constraints.check(&file("image/svg+xml", 10)).is_err());
    }
}
