//! Browser `File`s as raw image sources.

use bytes::Bytes;
use js_sys::Uint8Array;
use scrapbook_core::{RawImage, ReadError, is_image_mime};
use web_sys::{ClipboardEvent, DragEvent, File, FileList, HtmlInputElement};

/// A `File` from a picker, drop or paste.
///
/// Name and type are captured up front so they can be borrowed.
#[derive(Debug, Clone)]
pub struct BrowserImage {
    file: File,
    name: String,
    mime_type: String,
}

impl BrowserImage {
    pub fn new(file: File) -> Self {
        Self {
            name: file.name(),
            mime_type: file.type_(),
            file,
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn size(&self) -> f64 {
        self.file.size()
    }
}

impl From<File> for BrowserImage {
    fn from(file: File) -> Self {
        Self::new(file)
    }
}

impl RawImage for BrowserImage {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn declared_mime(&self) -> Option<&str> {
        Some(&self.mime_type)
    }

    async fn read(&self) -> Result<Bytes, ReadError> {
        let buffer = wasm_bindgen_futures::JsFuture::from(self.file.array_buffer())
            .await
            .map_err(|e| ReadError(format!("{e:?}")))?;
        Ok(Bytes::from(Uint8Array::new(&buffer).to_vec()))
    }
}

/// Every file in a `FileList`, in list order.
pub fn images_from_file_list(files: &FileList) -> Vec<BrowserImage> {
    (0..files.length())
        .filter_map(|i| files.get(i))
        .map(BrowserImage::new)
        .collect()
}

/// Files selected in an `<input type="file">`.
pub fn images_from_input(input: &HtmlInputElement) -> Vec<BrowserImage> {
    input
        .files()
        .map(|files| images_from_file_list(&files))
        .unwrap_or_default()
}

/// Files carried by a drop event.
pub fn images_from_drop(evt: &DragEvent) -> Vec<BrowserImage> {
    evt.data_transfer()
        .and_then(|dt| dt.files())
        .map(|files| images_from_file_list(&files))
        .unwrap_or_default()
}

/// The first image on the clipboard, if any. Only one image is taken per paste.
pub fn image_from_paste(evt: &ClipboardEvent) -> Option<BrowserImage> {
    let items = evt.clipboard_data()?.items();
    (0..items.length())
        .filter_map(|i| items.get(i))
        .filter(|item| is_image_mime(&item.type_()))
        .find_map(|item| match item.get_as_file() {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!("clipboard item could not be read as a file: {:?}", e);
                None
            }
        })
        .map(BrowserImage::new)
}
