//! Image ingestion: turning raw image sources into pending preview records.
//!
//! Sources come from three surfaces (file picker, clipboard paste, drag-and-drop)
//! and are handled identically once their bytes can be read. Ingestion is
//! best-effort: non-image sources and failed reads are dropped without error.

use std::future::Future;

use bytes::Bytes;
use mime_sniffer::MimeTypeSniffer;
use smol_str::SmolStr;
use thiserror::Error;

use crate::data_url;
use crate::id::{IdSource, RandomIds};
use crate::store::ComposerHandle;
use crate::types::{ItemId, PreviewImage};

/// Where an image entered the composer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOrigin {
    FilePicker,
    Paste,
    Drop,
}

/// Failure reading a raw image source.
#[derive(Error, Debug, Clone)]
#[error("failed to read image source: {0}")]
pub struct ReadError(pub String);

impl From<&str> for ReadError {
    fn from(s: &str) -> Self {
        ReadError(s.to_string())
    }
}

impl From<String> for ReadError {
    fn from(s: String) -> Self {
        ReadError(s)
    }
}

/// A raw image source whose bytes can be read asynchronously.
///
/// Implemented by platform layers: browser `File`s, files on disk, or plain
/// in-memory buffers.
pub trait RawImage {
    /// Original file name, if the source has one.
    fn name(&self) -> Option<&str>;

    /// MIME type reported by the source. Empty or absent means unknown, in
    /// which case the type is sniffed from the bytes.
    fn declared_mime(&self) -> Option<&str>;

    /// Read the full contents.
    fn read(&self) -> impl Future<Output = Result<Bytes, ReadError>>;
}

/// An image source already held in memory.
#[derive(Clone, Debug)]
pub struct InMemoryImage {
    name: Option<String>,
    mime_type: Option<SmolStr>,
    bytes: Bytes,
}

impl InMemoryImage {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            name: None,
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<SmolStr>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

impl RawImage for InMemoryImage {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn declared_mime(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    async fn read(&self) -> Result<Bytes, ReadError> {
        Ok(self.bytes.clone())
    }
}

/// Whether a MIME type names an image.
pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Converts raw image sources into [`PreviewImage`] records.
#[derive(Debug, Default)]
pub struct PreviewManager<I = RandomIds> {
    ids: I,
}

impl PreviewManager<RandomIds> {
    pub fn new() -> Self {
        Self { ids: RandomIds }
    }
}

impl<I: IdSource> PreviewManager<I> {
    /// Use a custom id source.
    pub fn with_ids(ids: I) -> Self {
        Self { ids }
    }

    /// Decode one source into a preview record.
    ///
    /// Returns `None` for non-image sources and for sources that could not
    /// be read.
    pub async fn ingest<R: RawImage>(
        &mut self,
        origin: IngestOrigin,
        source: &R,
    ) -> Option<PreviewImage> {
        let decoded = decode(origin, source).await?;
        Some(decoded.into_preview(self.ids.next_id()))
    }

    /// Decode several sources concurrently.
    ///
    /// Records come back in the order the sources were given, no matter which
    /// decode finishes first. Ids are assigned in that same order.
    pub async fn ingest_all<R: RawImage>(
        &mut self,
        origin: IngestOrigin,
        sources: &[R],
    ) -> Vec<PreviewImage> {
        let decodes = sources.iter().map(|source| decode(origin, source));
        n0_future::join_all(decodes)
            .await
            .into_iter()
            .flatten()
            .map(|decoded| decoded.into_preview(self.ids.next_id()))
            .collect()
    }

    /// Decode `sources` and append the resulting previews to the composer in
    /// one transition. Returns how many previews were appended.
    pub async fn ingest_into<R: RawImage>(
        &mut self,
        handle: &ComposerHandle,
        origin: IngestOrigin,
        sources: &[R],
    ) -> usize {
        let previews = self.ingest_all(origin, sources).await;
        if previews.is_empty() {
            return 0;
        }
        handle.add_preview_images(previews)
    }

    /// Drop a pending preview; absent ids are ignored.
    pub fn remove_preview_image(&self, handle: &ComposerHandle, id: &ItemId) -> bool {
        handle.remove_preview_image(id)
    }

    /// Drop every pending preview.
    pub fn clear_all_previews(&self, handle: &ComposerHandle) {
        handle.clear_previews();
    }
}

struct DecodedImage {
    data: String,
    name: String,
    size: u64,
}

impl DecodedImage {
    fn into_preview(self, id: ItemId) -> PreviewImage {
        PreviewImage {
            id,
            data: self.data,
            name: self.name,
            size: self.size,
        }
    }
}

async fn decode<R: RawImage>(origin: IngestOrigin, source: &R) -> Option<DecodedImage> {
    let declared = source.declared_mime().filter(|m| !m.is_empty());
    if let Some(mime) = declared {
        if !is_image_mime(mime) {
            tracing::debug!(mime, ?origin, "ignoring non-image source");
            return None;
        }
    }

    let bytes = match source.read().await {
        Ok(bytes) if !bytes.is_empty() => bytes,
        Ok(_) => {
            tracing::debug!(?origin, "ignoring empty image source");
            return None;
        }
        Err(e) => {
            tracing::debug!(error = %e, ?origin, "dropping unreadable image source");
            return None;
        }
    };

    let mime = match declared {
        Some(mime) => SmolStr::new(mime),
        None => {
            let sniffed = bytes.sniff_mime_type().filter(|m| is_image_mime(m));
            match sniffed {
                Some(mime) => SmolStr::new(mime),
                None => {
                    tracing::debug!(?origin, "ignoring source that does not sniff as an image");
                    return None;
                }
            }
        }
    };

    Some(DecodedImage {
        data: data_url::encode(&mime, &bytes),
        name: display_name(origin, source.name()),
        size: bytes.len() as u64,
    })
}

fn display_name(origin: IngestOrigin, name: Option<&str>) -> String {
    match (origin, name) {
        (IngestOrigin::Paste, _) => {
            format!("Pasted Image {}", chrono::Local::now().format("%H:%M:%S"))
        }
        (_, Some(name)) if !name.is_empty() => name.to_string(),
        _ => "image".to_string(),
    }
}
