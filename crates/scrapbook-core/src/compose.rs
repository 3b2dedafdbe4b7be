//! The submit flow: classify input text, upload pending previews, merge results.

use crate::parse::parse_content;
use crate::store::ComposerHandle;
use crate::types::ItemId;
use crate::upload::{ImageUploader, UploadCoordinator, UploadFailure, UploadObserver};

/// What a submit did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitReport {
    /// Number of items appended to the committed sequence.
    pub added: usize,
    /// Previews that were dropped because their upload failed.
    pub failures: Vec<UploadFailure>,
    /// Another submit was already in flight, so this one did nothing.
    pub skipped: bool,
}

/// Clears the in-flight marker if the submit ends without committing,
/// including when its future is dropped mid-upload.
struct InFlight<'a>(&'a ComposerHandle);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.end_submit();
    }
}

/// Submit the current input text and pending previews.
///
/// Only one submit runs at a time per composer; a second call while one is
/// uploading returns a skipped report. Text and links come first, followed by
/// successfully uploaded images in preview order. Images whose preview was
/// removed during the upload are not committed, and previews added during the
/// upload stay pending. If nothing resolved (blank text, every upload failed)
/// the state is left untouched so the user can try again.
pub async fn submit<U: ImageUploader, O: UploadObserver>(
    handle: &ComposerHandle,
    coordinator: &UploadCoordinator<U, O>,
) -> SubmitReport {
    if !handle.try_begin_submit() {
        tracing::debug!("submit already in flight, ignoring");
        return SubmitReport {
            skipped: true,
            ..SubmitReport::default()
        };
    }
    let _in_flight = InFlight(handle);

    let (text, previews) =
        handle.read(|s| (s.input_text().to_string(), s.preview_images().to_vec()));
    let submitted: Vec<ItemId> = previews.iter().map(|p| p.id.clone()).collect();

    let text_items = if text.trim().is_empty() {
        Vec::new()
    } else {
        parse_content(&text)
    };

    let outcome = coordinator.resolve(&previews).await;

    if text_items.is_empty() && outcome.items.is_empty() {
        tracing::debug!(
            failed = outcome.failures.len(),
            "submit produced no content, leaving composer untouched"
        );
        return SubmitReport {
            failures: outcome.failures,
            ..SubmitReport::default()
        };
    }

    let added = handle.commit_submission(&text, &submitted, text_items, outcome.items);
    tracing::info!(added, failed = outcome.failures.len(), "content submitted");

    SubmitReport {
        added,
        failures: outcome.failures,
        skipped: false,
    }
}
