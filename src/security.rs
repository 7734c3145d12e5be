//! Guards applied while walking untrusted page markup
//!
//! Page content is arbitrary third-party HTML. The converter consults this
//! policy so that:
//!
//! - elements that never carry readable text (`script`, `iframe`, ...) are
//!   skipped together with their subtree;
//! - link and image targets with executable or local schemes never reach the
//!   Markdown output;
//! - pathologically deep trees are rejected instead of exhausting the stack.
//!
//! html5ever is an HTML parser, not an XML one, so entity expansion and
//! external DTD loading are not a concern here.

use crate::error::ConversionError;

/// Maximum element nesting accepted by the converter
pub const MAX_NESTING_DEPTH: usize = 256;

/// Elements whose subtree contributes nothing to Markdown output
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "iframe", "object", "embed", "applet", "link", "base", "head",
    "template",
];

/// URL schemes dropped from links and images
const DANGEROUS_URL_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:", "file:", "about:"];

#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    max_depth: usize,
}

impl SecurityPolicy {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// True for elements skipped along with their children
    ///
    /// ```
    /// use page2md::security::SecurityPolicy;
    ///
    /// let policy = SecurityPolicy::new();
    /// assert!(policy.is_skipped_element("script"));
    /// assert!(!policy.is_skipped_element("article"));
    /// ```
    pub fn is_skipped_element(&self, tag_name: &str) -> bool {
        SKIPPED_ELEMENTS.contains(&tag_name)
    }

    /// Case-insensitive scheme check, ignoring leading whitespace
    pub fn is_dangerous_url(&self, url: &str) -> bool {
        let url_lower = url.trim().to_lowercase();
        DANGEROUS_URL_SCHEMES
            .iter()
            .any(|scheme| url_lower.starts_with(scheme))
    }

    /// `Some(url)` when the URL may appear in output
    pub fn safe_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        if self.is_dangerous_url(url) {
            None
        } else {
            Some(url)
        }
    }

    pub fn check_depth(&self, depth: usize) -> Result<(), ConversionError> {
        if depth > self.max_depth {
            return Err(ConversionError::InvalidInput(format!(
                "HTML nesting depth {} exceeds maximum allowed depth {}",
                depth, self.max_depth
            )));
        }
        Ok(())
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::new()
    }
}
