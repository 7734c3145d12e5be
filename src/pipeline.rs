//! Page and selection conversion, end to end
//!
//! Every entry point takes the settings for the request as a parameter;
//! nothing here reads configuration on its own. A whole-page conversion
//! locates the main content, prunes it and converts the result. A selection
//! is converted as captured, without pruning: the user chose that content
//! explicitly. Both go through the same converter rules for images, links and
//! tables.

use tracing::debug;

use crate::content::{PageDocument, PageSnapshot};
use crate::converter::MarkdownConverter;
use crate::error::ConversionError;
use crate::formatter::format_output;
use crate::settings::ExtensionSettings;

/// What part of the page to convert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Page,
    Selection,
}

/// Formatted Markdown with the page details it was produced from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub markdown: String,
    pub title: String,
    pub url: String,
}

/// Convert prepared markup or captured selection markup to Markdown
///
/// `is_selection` is informational: pruning has already happened (or been
/// skipped) by the time markup reaches this point.
pub fn convert(
    content_html: &str,
    is_selection: bool,
    settings: &ExtensionSettings,
) -> Result<String, ConversionError> {
    debug!(is_selection, bytes = content_html.len(), "Converting content");
    MarkdownConverter::from_settings(settings).convert_html(content_html)
}

/// Markdown body for the page's main content
pub fn page_markdown(
    snapshot: &PageSnapshot,
    settings: &ExtensionSettings,
) -> Result<String, ConversionError> {
    let page = PageDocument::from_snapshot(snapshot);
    page_body(&page, settings)
}

/// Markdown body for the current selection
///
/// Returns [`ConversionError::NoSelection`] for a missing or collapsed
/// selection.
pub fn selection_markdown(
    snapshot: &PageSnapshot,
    settings: &ExtensionSettings,
) -> Result<String, ConversionError> {
    let selection = snapshot.selection().ok_or(ConversionError::NoSelection)?;
    convert(selection, true, settings)
}

/// Convert `target` and optionally prefix the metadata block
pub fn render(
    target: Target,
    snapshot: &PageSnapshot,
    settings: &ExtensionSettings,
    include_metadata: bool,
) -> Result<Rendered, ConversionError> {
    let page = PageDocument::from_snapshot(snapshot);
    let title = page.title();

    let body = match target {
        Target::Page => page_body(&page, settings)?,
        Target::Selection => selection_markdown(snapshot, settings)?,
    };

    let markdown = if include_metadata {
        format_output(&body, settings, &title, &snapshot.url)
    } else {
        body
    };

    Ok(Rendered {
        markdown,
        title,
        url: snapshot.url.clone(),
    })
}

fn page_body(page: &PageDocument, settings: &ExtensionSettings) -> Result<String, ConversionError> {
    let root = page.locate_main_content(settings);
    let prepared = page.prepare(root, settings);
    convert(&prepared, false, settings)
}
