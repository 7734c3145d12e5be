//! Character encoding detection for saved page snapshots
//!
//! Hosts hand the pipeline raw bytes (a saved `.html` file, a captured
//! response body). Before any selector matching can happen those bytes must
//! become UTF-8 text. The encoding is taken from the first of:
//!
//! 1. a byte-order mark;
//! 2. the `charset` parameter of a Content-Type value, when the host has one;
//! 3. a `<meta charset>` or `<meta http-equiv="Content-Type">` declaration
//!    near the top of the document;
//! 4. UTF-8.
//!
//! # Examples
//!
//! ```rust
//! use page2md::charset::{decode_html, detect_encoding};
//!
//! let encoding = detect_encoding(Some("text/html; charset=iso-8859-1"), b"").unwrap();
//! assert_eq!(encoding.name(), "windows-1252");
//!
//! let text = decode_html(b"<p>Caf\xE9</p>", Some("text/html; charset=ISO-8859-1")).unwrap();
//! assert_eq!(text, "<p>Café</p>");
//! ```

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::ConversionError;

/// Meta declarations are expected in the first kilobyte of the document
const META_SCAN_LIMIT: usize = 1024;

/// `<meta charset>` first, then the HTML4 `http-equiv` form
const META_PATTERNS: &[&str] = &[
    r#"(?i)<meta\s+charset\s*=\s*["']?([^"';>\s/]+)"#,
    r#"(?i)<meta\s+http-equiv\s*=\s*["']?content-type["']?\s+content\s*=\s*["']?[^"'>]*charset\s*=\s*([^"';>\s]+)"#,
];

fn meta_regexes() -> &'static [Regex] {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        META_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// `charset=` parameter of a Content-Type value, quoted or not
pub fn content_type_charset(content_type: &str) -> Option<&str> {
    static PARAM: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = PARAM
        .get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"';,\s]+)"#).ok())
        .as_ref()?;

    regex
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Charset label declared by a meta tag near the top of the document
pub fn meta_charset(html: &[u8]) -> Option<String> {
    let end = html.len().min(META_SCAN_LIMIT);
    // Meta declarations are ASCII, so lossy decoding cannot hide one
    let head = String::from_utf8_lossy(&html[..end]);

    meta_regexes().iter().find_map(|regex| {
        regex
            .captures(&head)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Pick the encoding for `html`
///
/// A declared label that `encoding_rs` does not know is an
/// [`ConversionError::EncodingError`] rather than a silent UTF-8 fallback.
pub fn detect_encoding(
    content_type: Option<&str>,
    html: &[u8],
) -> Result<&'static Encoding, ConversionError> {
    if let Some((encoding, _)) = Encoding::for_bom(html) {
        return Ok(encoding);
    }

    let declared = content_type
        .and_then(content_type_charset)
        .map(str::to_string)
        .or_else(|| meta_charset(html));

    match declared {
        Some(label) => Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            ConversionError::EncodingError(format!("Unsupported charset '{label}'"))
        }),
        None => Ok(UTF_8),
    }
}

/// Decode page bytes to UTF-8 text
///
/// Valid UTF-8 without a byte-order mark is borrowed as is. Bytes that are
/// invalid in the detected encoding are an `EncodingError`.
pub fn decode_html<'a>(
    html: &'a [u8],
    content_type: Option<&str>,
) -> Result<Cow<'a, str>, ConversionError> {
    let encoding = detect_encoding(content_type, html)?;
    let body = match Encoding::for_bom(html) {
        Some((_, bom_len)) => &html[bom_len..],
        None => html,
    };
    debug!(encoding = encoding.name(), bytes = body.len(), "Decoding page");

    if encoding == UTF_8 {
        return std::str::from_utf8(body).map(Cow::Borrowed).map_err(|e| {
            ConversionError::EncodingError(format!(
                "Invalid UTF-8 at byte position {}",
                e.valid_up_to()
            ))
        });
    }

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| {
            ConversionError::EncodingError(format!(
                "Invalid byte sequence for charset '{}'",
                encoding.name()
            ))
        })
}
