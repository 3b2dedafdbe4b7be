//! scrapbook-core: Pure Rust composer logic without framework dependencies.
//!
//! This crate provides:
//! - `parse_content` - splits free text into ordered text and link items
//! - `next_id` / `IdSource` - item identifiers
//! - `PreviewManager` - raw image sources to in-memory previews
//! - `UploadCoordinator` - previews to committed image items via an `ImageUploader`
//! - `ComposerState` / `ComposerHandle` - the compose session's state and its operations
//! - `submit` - the end-to-end submit flow

pub mod compose;
pub mod data_url;
pub mod format;
pub mod id;
pub mod parse;
pub mod preview;
pub mod store;
pub mod types;
pub mod upload;

pub use compose::{SubmitReport, submit};
pub use data_url::{DataUrlError, DecodedDataUrl};
pub use format::format_file_size;
pub use id::{IdSource, RandomIds, next_id};
pub use parse::{parse_content, parse_content_with};
pub use preview::{InMemoryImage, IngestOrigin, PreviewManager, RawImage, ReadError, is_image_mime};
pub use smol_str::SmolStr;
pub use store::{ComposerHandle, ComposerState};
pub use types::{ContentDescriptor, ContentItem, ContentKind, Icon, ItemId, PreviewImage};
pub use upload::{
    ALLOWED_UPLOAD_TYPES, ImageUploader, MAX_UPLOAD_BYTES, UploadConstraints, UploadCoordinator,
    UploadError, UploadFailure, UploadFile, UploadObserver, UploadOutcome,
};
