//! page2md - readable web content to Markdown
//!
//! This library extracts the readable part of a web page (or a user's
//! selection), strips configurable clutter such as navigation, ads and
//! forms, and converts what remains to Markdown.
//!
//! # Architecture
//!
//! The library is structured into several modules, leaves first:
//! - `error`: error types shared by every module
//! - `settings`: user configuration, validation and persistence
//! - `site_rules`: per-domain content selectors with wildcard matching
//! - `exclusions`: exclusion selectors derived from settings
//! - `charset`: character encoding detection for page bytes
//! - `parser`: HTML5 parsing using html5ever
//! - `security`: skipped elements, URL scheme filtering, depth limits
//! - `rules`: per-node replacement rules (images, links, tables)
//! - `converter`: Markdown generation from a DOM tree
//! - `content`: page snapshots, main-content location and pruning
//! - `formatter`: title and source metadata block
//! - `filename`: download filenames derived from titles
//! - `pipeline`: page and selection conversion end to end
//! - `protocol`: request/response messages for host surfaces
//!
//! # Example
//!
//! ```rust
//! use page2md::{ExtensionSettings, PageSnapshot, Target, render};
//!
//! let snapshot = PageSnapshot::new(
//!     "<title>Greeting</title><nav>Menu</nav><main><p>Hello <b>World</b></p></main>",
//!     "https://example.com/hello",
//! );
//! let rendered = render(Target::Page, &snapshot, &ExtensionSettings::default(), true).unwrap();
//! assert_eq!(
//!     rendered.markdown,
//!     "# Greeting\n\n> Source: https://example.com/hello\n\nHello **World**"
//! );
//! ```

pub mod charset;
pub mod content;
pub mod converter;
pub mod error;
pub mod exclusions;
pub mod filename;
pub mod formatter;
pub mod parser;
pub mod pipeline;
pub mod protocol;
pub mod rules;
pub mod security;
pub mod settings;
pub mod site_rules;

// Re-export main types for convenience
pub use content::{PageDocument, PageSnapshot};
pub use converter::{MarkdownConverter, clean_whitespace};
pub use error::{ConversionError, SettingsError};
pub use parser::parse_html;
pub use pipeline::{Target, render};
pub use protocol::{Request, Response, handle_request};
pub use settings::{ExtensionSettings, SettingsStore, SiteRule};
