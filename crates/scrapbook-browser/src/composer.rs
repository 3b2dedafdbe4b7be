//! Event wiring between DOM surfaces and the composer store.
//!
//! Handlers are synchronous so they can be attached directly as event
//! listeners. Reading files and uploading happen on spawned local tasks and
//! land in the store when they finish.

use std::rc::Rc;

use scrapbook_common::HttpCoordinator;
use scrapbook_core::{ComposerHandle, IngestOrigin, PreviewManager, SubmitReport, submit};
use web_sys::{ClipboardEvent, DragEvent, HtmlInputElement};

use crate::image::{BrowserImage, image_from_paste, images_from_drop, images_from_input};

/// A compose session bound to an HTTP upload endpoint.
#[derive(Clone)]
pub struct BrowserComposer {
    handle: ComposerHandle,
    coordinator: Rc<HttpCoordinator>,
}

impl BrowserComposer {
    pub fn new(coordinator: HttpCoordinator) -> Self {
        Self::with_handle(ComposerHandle::new(), coordinator)
    }

    pub fn with_handle(handle: ComposerHandle, coordinator: HttpCoordinator) -> Self {
        Self {
            handle,
            coordinator: Rc::new(coordinator),
        }
    }

    pub fn handle(&self) -> &ComposerHandle {
        &self.handle
    }

    /// `change` on the hidden file input. Resets the input so picking the
    /// same file again fires another change.
    pub fn on_file_input(&self, input: &HtmlInputElement) {
        let images = images_from_input(input);
        input.set_value("");
        self.spawn_ingest(IngestOrigin::FilePicker, images);
    }

    /// `paste` on the text area. Text pastes fall through to the browser.
    pub fn on_paste(&self, evt: &ClipboardEvent) {
        if let Some(image) = image_from_paste(evt) {
            evt.prevent_default();
            self.spawn_ingest(IngestOrigin::Paste, vec![image]);
        }
    }

    pub fn on_drop(&self, evt: &DragEvent) {
        evt.prevent_default();
        self.spawn_ingest(IngestOrigin::Drop, images_from_drop(evt));
    }

    /// `dragover` must be cancelled for `drop` to fire.
    pub fn on_drag_over(&self, evt: &DragEvent) {
        evt.prevent_default();
    }

    pub fn on_input(&self, text: impl Into<String>) {
        self.handle.set_input_text(text);
    }

    /// Submit the current text and previews, waiting for uploads.
    pub async fn submit(&self) -> SubmitReport {
        submit(&self.handle, self.coordinator.as_ref()).await
    }

    /// Submit without waiting; failures are logged. Does nothing while a
    /// previous submit is still uploading.
    pub fn spawn_submit(&self) {
        if !self.handle.read(|s| s.can_submit()) {
            return;
        }
        let this = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let report = this.submit().await;
            if !report.failures.is_empty() {
                tracing::warn!(failed = report.failures.len(), "some images were not uploaded");
            }
        });
    }

    fn spawn_ingest(&self, origin: IngestOrigin, images: Vec<BrowserImage>) {
        if images.is_empty() {
            return;
        }
        let handle = self.handle.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let added = PreviewManager::new()
                .ingest_into(&handle, origin, &images)
                .await;
            tracing::debug!(?origin, added, "previews added");
        });
    }
}
