//! Browser layer for the scrapbook composer.
//!
//! Bridges DOM file sources (file picker, clipboard paste, drag-and-drop)
//! into `scrapbook-core`'s preview pipeline. Assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! - `image`: `web_sys::File` as a [`RawImage`] and extraction from events
//! - `composer`: event handlers bound to a [`ComposerHandle`]

// Re-export core crate
pub use scrapbook_core;
pub use scrapbook_core::*;

pub mod composer;
pub mod image;

pub use composer::BrowserComposer;
pub use image::{
    BrowserImage, image_from_paste, images_from_drop, images_from_file_list, images_from_input,
};
