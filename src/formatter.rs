//! Metadata block prepended to converted Markdown

use crate::settings::ExtensionSettings;

/// Prefix `markdown` with the title heading and source line enabled in `settings`
///
/// ```rust
/// use page2md::formatter::format_output;
/// use page2md::settings::ExtensionSettings;
///
/// let output = format_output("Body", &ExtensionSettings::default(), "My Page", "https://a.b/c");
/// assert_eq!(output, "# My Page\n\n> Source: https://a.b/c\n\nBody");
/// ```
pub fn format_output(
    markdown: &str,
    settings: &ExtensionSettings,
    title: &str,
    url: &str,
) -> String {
    let mut output = String::with_capacity(markdown.len() + title.len() + url.len() + 16);

    if settings.include_title {
        output.push_str("# ");
        output.push_str(title);
        output.push_str("\n\n");
    }

    if settings.include_url {
        output.push_str("> Source: ");
        output.push_str(url);
        output.push_str("\n\n");
    }

    output.push_str(markdown);
    output
}
