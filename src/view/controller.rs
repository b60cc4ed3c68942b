//! Chat view controller: event routing and user actions.

use std::path::Path;

use chrono::Local;

use crate::api::UploadError;
use crate::models::{InboundEvent, OutboundEvent};

use super::attach::{AttachFlow, AttachState, ClipboardItem, Finished, PasteOutcome, UploadRequest};
use super::feed::render_message;
use super::input::Composer;
use super::notify::Severity;
use super::surface::ChatSurface;
use super::FeedEntry;

/// View state owned by the controller.
#[derive(Debug)]
struct ChatViewState {
    /// Username of the local user; marks own messages.
    current_user: String,
    attach: AttachFlow,
}

/// Routes inbound events and local actions to a [`ChatSurface`].
pub struct ChatView<S> {
    state: ChatViewState,
    surface: S,
}

impl<S: ChatSurface> ChatView<S> {
    pub fn new(current_user: impl Into<String>, surface: S) -> Self {
        Self {
            state: ChatViewState {
                current_user: current_user.into(),
                attach: AttachFlow::default(),
            },
            surface,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn current_user(&self) -> &str {
        &self.state.current_user
    }

    pub fn attach_state(&self) -> &AttachState {
        self.state.attach.state()
    }

    /// Uploads started and not yet answered.
    pub fn uploads_in_flight(&self) -> usize {
        self.state.attach.in_flight()
    }

    /// Handle one event from the realtime channel.
    pub fn dispatch(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Connected => {
                tracing::info!("Connected to server");
                self.surface.set_connected(true);
                self.surface
                    .show_notification("Connected to server", Severity::Info);
            }
            InboundEvent::Disconnected => {
                tracing::warn!("Disconnected from server");
                self.surface.set_connected(false);
                self.surface
                    .show_notification("Disconnected from server", Severity::Error);
            }
            InboundEvent::Message(msg) => {
                let entry = render_message(&msg, &self.state.current_user);
                self.surface.append_entry(entry);
            }
            InboundEvent::Status(text) | InboundEvent::System(text) => {
                self.surface.append_entry(FeedEntry::System(text));
            }
            InboundEvent::Error(text) => {
                self.surface.show_notification(&text, Severity::Error);
            }
            InboundEvent::UserList(users) => {
                self.surface.replace_roster(&users);
                self.surface.set_online_count(users.len());
            }
        }
    }

    /// Send the input as a text message.
    ///
    /// Whitespace-only input is left untouched and nothing is sent. The
    /// message is not rendered locally; the server echoes it back.
    pub fn send_text(&mut self, input: &mut Composer) -> Option<OutboundEvent> {
        let text = input.text().trim();
        if text.is_empty() {
            return None;
        }
        let event = OutboundEvent::text(text);
        input.clear();
        Some(event)
    }

    /// Enter in the input box: submit, or insert a line break when a
    /// modifier (Shift/Alt) is held.
    pub fn handle_enter(&mut self, input: &mut Composer, modified: bool) -> Option<OutboundEvent> {
        if modified {
            input.insert_newline();
            return None;
        }
        self.send_text(input)
    }

    /// Attach a file from disk. Unreadable paths are reported as a
    /// notification and leave the current attachment alone.
    pub fn select_file(&mut self, path: &Path) -> bool {
        match self.state.attach.select_path(path) {
            Ok(upload) => {
                self.surface.show_preview(&upload);
                true
            }
            Err(e) => {
                tracing::warn!("File selection failed: {:#}", e);
                self.surface
                    .show_notification(&format!("{:#}", e), Severity::Error);
                false
            }
        }
    }

    /// Offer clipboard content. The first image item becomes the pending
    /// upload; without one the caller performs its default paste.
    pub fn paste(&mut self, items: Vec<ClipboardItem>) -> PasteOutcome {
        match self.state.attach.paste(items, Local::now()) {
            Some(upload) => {
                tracing::debug!("Pasted image attached as {}", upload.name);
                self.surface.show_preview(&upload);
                PasteOutcome::Attached
            }
            None => PasteOutcome::Default,
        }
    }

    /// Start sending the pending file. The caller performs the request and
    /// reports back through [`ChatView::upload_finished`].
    pub fn confirm_upload(&mut self) -> Option<UploadRequest> {
        let request = self.state.attach.confirm()?;
        tracing::debug!(
            "Upload #{} requested for {}",
            request.id,
            request.upload.name
        );
        Some(request)
    }

    /// Apply the result of upload request `id`.
    pub fn upload_finished(&mut self, id: u64, result: Result<(), UploadError>) {
        let finished = self.state.attach.finish(id, result.is_ok());

        if let Err(ref e) = result {
            tracing::warn!("Upload #{} failed: {}", id, e);
            self.surface
                .show_notification(&e.user_message(), Severity::Error);
        }

        if finished == Finished::Cleared {
            self.surface.hide_preview();
        }
    }

    /// Discard the pending file and close the preview.
    pub fn cancel_upload(&mut self) {
        if self.state.attach.cancel() {
            tracing::debug!("Pending upload discarded");
        }
        self.surface.hide_preview();
    }
}
