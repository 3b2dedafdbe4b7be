//! Composer state: the single source of truth for a compose session.
//!
//! Provides:
//! - `ComposerState` - plain aggregate with synchronous, all-or-nothing transitions
//! - `ComposerHandle` - shared container that applies each transition as one
//!   watch-channel update, so subscribers never observe a half-applied change

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::types::{ContentItem, ItemId, PreviewImage};

/// Everything the compose surface renders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ComposerState {
    input_text: String,
    /// Display order is insertion order.
    content_items: Vec<ContentItem>,
    preview_images: Vec<PreviewImage>,
    /// Reference (URL or data URI) of the committed image shown full size.
    full_screen_image: Option<String>,
    preview_full_screen_image: Option<PreviewImage>,
    /// A submit is waiting on uploads.
    submitting: bool,
}

impl ComposerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn content_items(&self) -> &[ContentItem] {
        &self.content_items
    }

    pub fn preview_images(&self) -> &[PreviewImage] {
        &self.preview_images
    }

    pub fn full_screen_image(&self) -> Option<&str> {
        self.full_screen_image.as_deref()
    }

    pub fn preview_full_screen_image(&self) -> Option<&PreviewImage> {
        self.preview_full_screen_image.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Whether a submit would have anything to work with and none is in flight.
    pub fn can_submit(&self) -> bool {
        !self.submitting
            && (!self.input_text.trim().is_empty() || !self.preview_images.is_empty())
    }

    /// Whether `clear_all` would change anything visible.
    pub fn can_clear(&self) -> bool {
        !self.content_items.is_empty() || !self.preview_images.is_empty()
    }

    /// Replace the input text verbatim.
    pub fn set_input_text(&mut self, text: impl Into<String>) {
        self.input_text = text.into();
    }

    /// Append committed items, then reset the compose surface.
    ///
    /// Input text and every pending preview are cleared regardless of what was
    /// appended. Items whose id is already committed are skipped. Returns the
    /// number of items appended.
    pub fn add_content_items(&mut self, items: impl IntoIterator<Item = ContentItem>) -> usize {
        let added = append_unique(&mut self.content_items, items, |item| &item.id);
        self.input_text.clear();
        self.preview_images.clear();
        added
    }

    /// Append pending previews. Previews whose id is already pending are skipped.
    pub fn add_preview_images(&mut self, images: impl IntoIterator<Item = PreviewImage>) -> usize {
        append_unique(&mut self.preview_images, images, |image| &image.id)
    }

    /// Remove a pending preview. Returns false if no preview had that id.
    pub fn remove_preview_image(&mut self, id: &ItemId) -> bool {
        let before = self.preview_images.len();
        self.preview_images.retain(|image| &image.id != id);
        self.preview_images.len() != before
    }

    /// Remove a committed item. Returns false if no item had that id.
    pub fn remove_content_item(&mut self, id: &ItemId) -> bool {
        let before = self.content_items.len();
        self.content_items.retain(|item| &item.id != id);
        self.content_items.len() != before
    }

    /// Drop every pending preview.
    pub fn clear_previews(&mut self) {
        self.preview_images.clear();
    }

    /// Empty committed items, pending previews and input text together.
    pub fn clear_all(&mut self) {
        self.content_items.clear();
        self.preview_images.clear();
        self.input_text.clear();
    }

    /// Mark a submit as in flight. Returns false if one already is.
    pub fn begin_submit(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        self.submitting = true;
        true
    }

    /// Clear the in-flight marker without committing anything.
    pub fn end_submit(&mut self) -> bool {
        std::mem::replace(&mut self.submitting, false)
    }

    /// Merge a finished submit.
    ///
    /// `submitted_text` and `submitted` are what the submit read when it
    /// started. Images are committed only if their preview is still pending,
    /// so a preview removed during the upload stays removed. Only the
    /// submitted previews are dropped; previews added meanwhile stay pending.
    /// The input text is cleared only if it was not edited in the meantime.
    /// Returns the number of items appended.
    pub fn commit_submission(
        &mut self,
        submitted_text: &str,
        submitted: &[ItemId],
        text_items: Vec<ContentItem>,
        images: Vec<ContentItem>,
    ) -> usize {
        let pending: HashSet<&ItemId> = self.preview_images.iter().map(|p| &p.id).collect();
        let (kept, withdrawn): (Vec<_>, Vec<_>) =
            images.into_iter().partition(|image| pending.contains(&image.id));
        for image in &withdrawn {
            tracing::debug!(id = %image.id, "preview removed during upload, not committing");
        }

        let added = append_unique(
            &mut self.content_items,
            text_items.into_iter().chain(kept),
            |item| &item.id,
        );

        let submitted: HashSet<&ItemId> = submitted.iter().collect();
        self.preview_images
            .retain(|preview| !submitted.contains(&preview.id));
        if self.input_text == submitted_text {
            self.input_text.clear();
        }
        self.submitting = false;
        added
    }

    /// Show a committed image full size, or close the viewer with `None`.
    pub fn set_full_screen_image(&mut self, image: Option<String>) {
        self.full_screen_image = image;
    }

    /// Show a pending preview full size, or close the viewer with `None`.
    pub fn set_preview_full_screen_image(&mut self, image: Option<PreviewImage>) {
        self.preview_full_screen_image = image;
    }
}

fn append_unique<T>(
    target: &mut Vec<T>,
    incoming: impl IntoIterator<Item = T>,
    id_of: impl Fn(&T) -> &ItemId,
) -> usize {
    let mut seen: HashSet<ItemId> = target.iter().map(|t| id_of(t).clone()).collect();
    let before = target.len();
    for entry in incoming {
        if seen.insert(id_of(&entry).clone()) {
            target.push(entry);
        } else {
            tracing::debug!(id = %id_of(&entry), "skipping entry with duplicate id");
        }
    }
    target.len() - before
}

/// Shared handle to a compose session's state.
///
/// Cheap to clone; every clone points at the same state. Each operation is a
/// single atomic transition, and subscribers see the state only between
/// transitions.
#[derive(Clone, Debug)]
pub struct ComposerHandle {
    state: Arc<watch::Sender<ComposerState>>,
}

impl Default for ComposerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposerHandle {
    /// Start an empty session.
    pub fn new() -> Self {
        Self::from_state(ComposerState::default())
    }

    pub fn from_state(state: ComposerState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Receive every committed transition, for reactive presentation.
    pub fn subscribe(&self) -> watch::Receiver<ComposerState> {
        self.state.subscribe()
    }

    /// Read the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&ComposerState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> ComposerState {
        self.state.borrow().clone()
    }

    pub fn set_input_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| s.set_input_text(text));
    }

    pub fn add_content_items(&self, items: Vec<ContentItem>) -> usize {
        let mut added = 0;
        self.state
            .send_modify(|s| added = s.add_content_items(items));
        added
    }

    pub fn add_preview_images(&self, images: Vec<PreviewImage>) -> usize {
        let mut added = 0;
        self.state
            .send_if_modified(|s| {
                added = s.add_preview_images(images);
                added > 0
            });
        added
    }

    pub fn remove_preview_image(&self, id: &ItemId) -> bool {
        self.state.send_if_modified(|s| s.remove_preview_image(id))
    }

    pub fn remove_content_item(&self, id: &ItemId) -> bool {
        self.state.send_if_modified(|s| s.remove_content_item(id))
    }

    pub fn clear_previews(&self) {
        self.state.send_modify(|s| s.clear_previews());
    }

    pub fn clear_all(&self) {
        self.state.send_modify(|s| s.clear_all());
    }

    pub fn try_begin_submit(&self) -> bool {
        self.state.send_if_modified(|s| s.begin_submit())
    }

    pub fn end_submit(&self) {
        self.state.send_if_modified(|s| s.end_submit());
    }

    pub fn commit_submission(
        &self,
        submitted_text: &str,
        submitted: &[ItemId],
        text_items: Vec<ContentItem>,
        images: Vec<ContentItem>,
    ) -> usize {
        let mut added = 0;
        self.state.send_modify(|s| {
            added = s.commit_submission(submitted_text, submitted, text_items, images)
        });
        added
    }

    pub fn set_full_screen_image(&self, image: Option<String>) {
        self.state.send_modify(|s| s.set_full_screen_image(image));
    }

    pub fn set_preview_full_screen_image(&self, image: Option<PreviewImage>) {
        self.state
            .send_modify(|s| s.set_preview_full_screen_image(image));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(id: &str) -> PreviewImage {
        PreviewImage {
            id: ItemId::from(id),
            data: "data:image/png;base64,AAAA".to_string(),
            name: format!("{id}.png"),
            size: 3,
        }
    }

    fn text(id: &str, value: &str) -> ContentItem {
        ContentItem::text(ItemId::from(id), value)
    }

    #[test]
    fn test_add_content_items_resets_compose_surface() {
        let mut state = ComposerState::new();
        state.set_input_text("draft https://a.b");
        state.add_preview_images([preview("p1"), preview("p2")]);

        let added = state.add_content_items([text("t1", "draft")]);

        assert_eq!(added, 1);
        assert_eq!(state.input_text(), "");
        assert!(state.preview_images().is_empty());
        assert_eq!(state.content_items().len(), 1);
    }

    #[test]
    fn test_add_content_items_clears_even_when_empty() {
        let mut state = ComposerState::new();
        state.set_input_text("   ");
        state.add_preview_images([preview("p1")]);

        state.add_content_items(Vec::new());

        assert_eq!(state.input_text(), "");
        assert!(state.preview_images().is_empty());
    }

    #[test]
    fn test_content_items_append_in_order() {
        let mut state = ComposerState::new();
        state.add_content_items([text("a", "1"), text("b", "2")]);
        state.add_content_items([text("c", "3")]);

        let ids: Vec<&str> = state.content_items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_ids_are_not_appended() {
        let mut state = ComposerState::new();
        assert_eq!(state.add_preview_images([preview("p1"), preview("p1")]), 1);
        assert_eq!(state.add_preview_images([preview("p1")]), 0);
        assert_eq!(state.preview_images().len(), 1);

        state.add_content_items([text("t1", "x")]);
        assert_eq!(state.add_content_items([text("t1", "y")]), 0);
        assert_eq!(state.content_items()[0].value, "x");
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let mut state = ComposerState::new();
        state.add_content_items([text("t1", "x"), text("t2", "y")]);
        state.add_preview_images([preview("p1")]);
        let before = state.clone();

        assert!(!state.remove_content_item(&ItemId::from("nope")));
        assert!(!state.remove_preview_image(&ItemId::from("nope")));
        assert_eq!(state, before);
    }

    #[test]
    fn test_remove_by_id() {
        let mut state = ComposerState::new();
        state.add_content_items([text("t1", "x"), text("t2", "y")]);
        state.add_preview_images([preview("p1"), preview("p2")]);

        assert!(state.remove_content_item(&ItemId::from("t1")));
        assert!(state.remove_preview_image(&ItemId::from("p2")));

        assert_eq!(state.content_items().len(), 1);
        assert_eq!(state.content_items()[0].id, "t2");
        assert_eq!(state.preview_images().len(), 1);
        assert_eq!(state.preview_images()[0].id, "p1");
    }

    #[test]
    fn test_clear_all_then_remove_is_noop() {
        let mut state = ComposerState::new();
        state.set_input_text("hello");
        state.add_content_items([text("t1", "x")]);
        state.add_preview_images([preview("p1")]);

        state.clear_all();
        assert_eq!(state, ComposerState::default());

        assert!(!state.remove_content_item(&ItemId::from("t1")));
        assert!(!state.remove_preview_image(&ItemId::from("p1")));
        assert_eq!(state, ComposerState::default());

        state.clear_all();
        assert_eq!(state, ComposerState::default());
    }

    #[test]
    fn test_full_screen_viewers() {
        let mut state = ComposerState::new();
        state.set_full_screen_image(Some("https://cdn.example.com/a.png".into()));
        assert_eq!(state.full_screen_image(), Some("https://cdn.example.com/a.png"));
        state.set_full_screen_image(None);
        assert_eq!(state.full_screen_image(), None);

        state.set_preview_full_screen_image(Some(preview("p1")));
        assert_eq!(state.preview_full_screen_image().map(|p| p.id.as_str()), Some("p1"));
        state.set_preview_full_screen_image(None);
        assert!(state.preview_full_screen_image().is_none());
    }

    #[test]
    fn test_submit_and_clear_availability() {
        let mut state = ComposerState::new();
        assert!(!state.can_submit());
        assert!(!state.can_clear());

        state.set_input_text("  ");
        assert!(!state.can_submit());

        state.add_preview_images([preview("p1")]);
        assert!(state.can_submit());
        assert!(state.can_clear());
    }

    #[test]
    fn test_only_one_submit_in_flight() {
        let mut state = ComposerState::new();
        state.set_input_text("note");

        assert!(state.begin_submit());
        assert!(!state.begin_submit());
        assert!(!state.can_submit());

        assert!(state.end_submit());
        assert!(!state.end_submit());
        assert!(state.can_submit());
    }

    #[test]
    fn test_commit_submission_respects_changes_made_meanwhile() {
        let mut state = ComposerState::new();
        state.set_input_text("draft");
        state.add_preview_images([preview("p1"), preview("p2")]);
        state.begin_submit();
        let submitted = [ItemId::from("p1"), ItemId::from("p2")];

        state.remove_preview_image(&ItemId::from("p2"));
        state.add_preview_images([preview("p3")]);
        state.set_input_text("draft, edited");

        let added = state.commit_submission(
            "draft",
            &submitted,
            vec![text("t1", "draft")],
            vec![
                ContentItem::image(ItemId::from("p1"), "https://cdn/p1.png"),
                ContentItem::image(ItemId::from("p2"), "https://cdn/p2.png"),
            ],
        );

        assert_eq!(added, 2);
        let ids: Vec<&str> = state.content_items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "p1"]);
        let pending: Vec<&str> = state.preview_images().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(pending, vec!["p3"]);
        assert_eq!(state.input_text(), "draft, edited");
        assert!(!state.is_submitting());
    }

    #[test]
    fn test_handle_clones_share_state() {
        let handle = ComposerHandle::new();
        let other = handle.clone();

        handle.set_input_text("hi");
        other.add_preview_images(vec![preview("p1")]);

        let snap = handle.snapshot();
        assert_eq!(snap.input_text(), "hi");
        assert_eq!(snap.preview_images().len(), 1);
    }

    #[test]
    fn test_handle_notifies_only_on_change() {
        let handle = ComposerHandle::new();
        let mut rx = handle.subscribe();
        rx.mark_unchanged();

        assert!(!handle.remove_content_item(&ItemId::from("missing")));
        assert!(!rx.has_changed().unwrap());

        handle.add_content_items(vec![text("t1", "x")]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().content_items().len(), 1);
    }
}
