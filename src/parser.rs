//! HTML5 parsing into the tree walked by the Markdown converter
//!
//! Content reaching the converter is serialized markup: the inner HTML of a
//! pruned content root, or the captured contents of a selection. It is
//! re-parsed here with html5ever, which follows the WHATWG tree-building
//! rules, so unclosed or misnested tags in fragments are repaired the same
//! way a browser would repair them.
//!
//! Parsing never fails.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::RcDom;

/// Parse markup into a reference-counted DOM
///
/// Fragments are wrapped in the implied `html`/`head`/`body` elements.
pub fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}
