//! Request/response messages exchanged with host surfaces
//!
//! Hosts (a popup, a context menu, the command-line tool) send a [`Request`]
//! naming what they want and receive a [`Response`]. Every failure is
//! reported in the response; [`handle_request`] never returns an error.
//!
//! Messages use the JSON shape shared by all surfaces:
//!
//! ```json
//! {"type": "GET_PAGE_MARKDOWN"}
//! {"success": true, "markdown": "# Title\n\n...", "title": "Title", "url": "https://..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::content::PageSnapshot;
use crate::error::{ClipboardError, ConversionError};
use crate::pipeline::{Target, render};
use crate::settings::ExtensionSettings;

pub const NO_SELECTION: &str = "No text selected";
pub const CLIPBOARD_DENIED: &str = "Clipboard access denied";
pub const UNKNOWN_MESSAGE: &str = "Unknown message type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    GetPageMarkdown,
    GetSelectionMarkdown,
    CheckSelection,
    ConvertContextSelection,
    CopyPageAsMarkdown,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Request {
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_selection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Response {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn selection_state(has_selection: bool) -> Self {
        Self {
            success: true,
            has_selection: Some(has_selection),
            ..Default::default()
        }
    }

    pub fn markdown(markdown: String) -> Self {
        Self {
            success: true,
            markdown: Some(markdown),
            ..Default::default()
        }
    }
}

/// Destination for "copy as Markdown" requests
pub trait Clipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard that keeps the last written text in memory
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|guard| guard.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| ClipboardError("clipboard lock poisoned".to_string()))?;
        *guard = Some(text.to_string());
        Ok(())
    }
}

/// Answer `request` against `snapshot` using `settings`
pub fn handle_request(
    request: &Request,
    snapshot: &PageSnapshot,
    settings: &ExtensionSettings,
    clipboard: &dyn Clipboard,
) -> Response {
    debug!(message_type = ?request.message_type, url = %snapshot.url, "Handling request");

    match request.message_type {
        MessageType::CheckSelection => Response::selection_state(snapshot.has_selection()),
        MessageType::GetPageMarkdown => respond_with_markdown(Target::Page, snapshot, settings),
        MessageType::GetSelectionMarkdown => {
            respond_with_markdown(Target::Selection, snapshot, settings)
        }
        MessageType::ConvertContextSelection => {
            copy_to_clipboard(Target::Selection, snapshot, settings, clipboard)
        }
        MessageType::CopyPageAsMarkdown => {
            copy_to_clipboard(Target::Page, snapshot, settings, clipboard)
        }
        MessageType::Unknown => Response::failure(UNKNOWN_MESSAGE),
    }
}

fn respond_with_markdown(
    target: Target,
    snapshot: &PageSnapshot,
    settings: &ExtensionSettings,
) -> Response {
    match render(target, snapshot, settings, true) {
        Ok(rendered) => Response {
            success: true,
            markdown: Some(rendered.markdown),
            title: Some(rendered.title),
            url: Some(rendered.url),
            ..Default::default()
        },
        Err(err) => conversion_failure(err),
    }
}

fn copy_to_clipboard(
    target: Target,
    snapshot: &PageSnapshot,
    settings: &ExtensionSettings,
    clipboard: &dyn Clipboard,
) -> Response {
    let rendered = match render(target, snapshot, settings, true) {
        Ok(rendered) => rendered,
        Err(err) => return conversion_failure(err),
    };

    match clipboard.write_text(&rendered.markdown) {
        Ok(()) => Response::markdown(rendered.markdown),
        Err(err) => {
            warn!(error = %err, "Clipboard write failed");
            Response {
                success: false,
                markdown: Some(rendered.markdown),
                error: Some(CLIPBOARD_DENIED.to_string()),
                ..Default::default()
            }
        }
    }
}

fn conversion_failure(err: ConversionError) -> Response {
    match err {
        ConversionError::NoSelection => Response::failure(NO_SELECTION),
        other => {
            warn!(error = %other, code = other.code(), "Conversion failed");
            Response::failure(other.to_string())
        }
    }
}
