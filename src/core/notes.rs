//! Appending and replacing device notes
//!
//! `update_device_notes` is a read-then-write round trip:
//!
//! ```text
//! fetch-current -> fetch-failed
//!               -> compose -> submit -> submit-network-error
//!                                    -> http-non-2xx
//!                                    -> success
//! ```
//!
//! Nothing is retried. Each terminal state is reported once as an [`Outcome`].

use crate::core::outcome::{Failure, Outcome, ResponseBody, Stage};
use crate::device::client::ApiClient;
use crate::device::models::NotesField;
use crate::device::traits::Transport;
use log::debug;
use serde_json::json;

/// Placed between the existing notes and each appended entry
pub const NOTES_SEPARATOR: &str = "\n\nFrom API Client:\n";

/// Append `addition` below `existing`, separated by [`NOTES_SEPARATOR`]
pub fn compose_notes(existing: &str, addition: &str) -> String {
    let mut notes = String::with_capacity(existing.len() + NOTES_SEPARATOR.len() + addition.len());
    notes.push_str(existing);
    notes.push_str(NOTES_SEPARATOR);
    notes.push_str(addition);
    notes
}

impl<T: Transport> ApiClient<T> {
    /// Append notes to a device, keeping whatever is already there
    pub fn update_device_notes(&self, udid: &str, notes: &str) -> Outcome {
        if udid.trim().is_empty() {
            return Failure::blank_identifier().into();
        }

        let record = match self.get_device(udid, false) {
            Outcome::Success { value, .. } => value,
            Outcome::Failure(failure) => {
                let detail = failure.error.clone().unwrap_or_else(|| "no detail".to_string());
                return Failure {
                    error: Some(format!("get_device failed: {}", detail)),
                    ..failure
                }
                .into();
            }
        };

        let existing = match record.notes_field() {
            NotesField::Text(text) => text,
            NotesField::Null => "",
            NotesField::Missing => {
                return Failure::unexpected_shape(
                    Stage::FetchCurrent,
                    "Unexpected get_device response structure",
                )
                .with_response(ResponseBody::Json(
                    json!({ "device": record.clone().into_value() }),
                ))
                .into();
            }
        };

        let composed = compose_notes(existing, notes);
        debug!(
            "Appending {} byte(s) to notes of {} ({} existing)",
            notes.len(),
            udid,
            existing.len()
        );

        self.post_device_notes(udid, &composed)
    }

    /// Overwrite the notes of a device
    ///
    /// Destructive: the previous notes are lost. The CSV workflow never calls
    /// this; it exists for the explicit `replace-notes` command.
    pub fn replace_device_notes(&self, udid: &str, notes: &str) -> Outcome {
        self.post_device_notes(udid, notes)
    }
}
