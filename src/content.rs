//! Page snapshots, main-content location and exclusion pruning
//!
//! A [`PageSnapshot`] is what a host observes on a page: its markup, its
//! address and the captured contents of the user's selection. The snapshot
//! is parsed once into a [`PageDocument`], which answers the questions the
//! pipeline asks of the page:
//!
//! - [`PageDocument::title`]: trimmed `<title>` text, empty when absent
//! - [`PageDocument::locate_main_content`]: the element holding the readable
//!   content, preferring a site rule for the page's host over the generic
//!   selector list and falling back to `body`
//! - [`PageDocument::prepare`]: a pruned copy of that element's markup with
//!   every exclusion match removed
//!
//! Pruning always works on a clone of the parsed page. The document held by
//! a `PageDocument` is never modified, so it can be located and prepared any
//! number of times.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::exclusions;
use crate::settings::ExtensionSettings;
use crate::site_rules;

/// Generic content containers, most specific first
pub const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "[role=\"main\"]",
    "article",
    ".main-content",
    "#main-content",
    ".content",
    "#content",
    ".post-content",
    ".article-content",
    ".entry-content",
];

/// Markup and location of a page, plus the current selection if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub html: String,
    pub url: String,
    /// Serialized contents of the selection range; `None` when collapsed
    pub selection_html: Option<String>,
}

impl PageSnapshot {
    pub fn new(html: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            url: url.into(),
            selection_html: None,
        }
    }

    pub fn with_selection(mut self, selection_html: impl Into<String>) -> Self {
        self.selection_html = Some(selection_html.into());
        self
    }

    /// Selection markup, or `None` for a missing or collapsed selection
    pub fn selection(&self) -> Option<&str> {
        self.selection_html.as_deref().filter(|html| !html.is_empty())
    }

    /// True when the selection contains visible text
    pub fn has_selection(&self) -> bool {
        self.selection().is_some_and(|html| {
            let fragment = Html::parse_fragment(html);
            fragment
                .root_element()
                .text()
                .any(|text| !text.trim().is_empty())
        })
    }
}

/// A parsed page snapshot
pub struct PageDocument {
    html: Html,
    url: String,
}

impl PageDocument {
    pub fn parse(html: &str, url: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            url: url.to_string(),
        }
    }

    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        Self::parse(&snapshot.html, &snapshot.url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> String {
        let Ok(selector) = Selector::parse("title") else {
            return String::new();
        };
        self.html
            .select(&selector)
            .next()
            .map(|title| title.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }

    /// Element holding the page's readable content
    ///
    /// A site rule for the page's host is tried first. A rule whose selector
    /// does not parse or matches nothing falls through to
    /// [`MAIN_CONTENT_SELECTORS`], then to `body`, then to the root element.
    pub fn locate_main_content(&self, settings: &ExtensionSettings) -> ElementRef<'_> {
        let user_rules = settings.user_site_rules();
        if let Some(domain) = site_rules::domain_from_url(&self.url)
            && let Some(selector) = site_rules::resolve(&domain, &user_rules)
        {
            if let Some(element) = self.first_match(selector) {
                debug!(domain = %domain, selector, "Main content located by site rule");
                return element;
            }
            debug!(domain = %domain, selector, "Site rule matched nothing, using generic selectors");
        }

        for selector in MAIN_CONTENT_SELECTORS {
            if let Some(element) = self.first_match(selector) {
                debug!(selector, "Main content located");
                return element;
            }
        }

        debug!("No content container found, falling back to body");
        self.first_match("body")
            .unwrap_or_else(|| self.html.root_element())
    }

    /// Pruned inner markup of `root`
    ///
    /// Each exclusion selector is applied in order to the descendants of
    /// `root` in a private copy of the page. Selectors that fail to parse are
    /// skipped. `root` itself is never removed.
    pub fn prepare(&self, root: ElementRef<'_>, settings: &ExtensionSettings) -> String {
        let root_id = root.id();
        let mut content = self.html.clone();

        for selector_text in exclusions::build(settings) {
            let selector = match Selector::parse(&selector_text) {
                Ok(selector) => selector,
                Err(err) => {
                    debug!(selector = %selector_text, error = ?err, "Skipping invalid exclusion selector");
                    continue;
                }
            };

            let matched: Vec<_> = match content.tree.get(root_id).and_then(ElementRef::wrap) {
                Some(root) => root
                    .select(&selector)
                    .map(|element| element.id())
                    .filter(|id| *id != root_id)
                    .collect(),
                None => break,
            };

            for id in matched {
                if let Some(mut node) = content.tree.get_mut(id) {
                    node.detach();
                }
            }
        }

        content
            .tree
            .get(root_id)
            .and_then(ElementRef::wrap)
            .map(|root| root.inner_html())
            .unwrap_or_default()
    }

    /// Outer markup of the first element matching `selector`
    ///
    /// Lets hosts without a live selection stand one in from a selector.
    pub fn capture_selection(&self, selector: &str) -> Option<String> {
        self.first_match(selector).map(|element| element.html())
    }

    fn first_match(&self, selector: &str) -> Option<ElementRef<'_>> {
        match Selector::parse(selector) {
            Ok(parsed) => self.html.select(&parsed).next(),
            Err(err) => {
                debug!(selector, error = ?err, "Ignoring invalid selector");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SiteRule, stringify_site_rules};

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>  Sample Page </title></head>
<body>
  <nav>Site navigation</nav>
  <div class="markdown-body"><p>Readme text</p></div>
  <main class="content">
    <h1>Heading</h1>
    <p>Body text</p>
    <aside>Related links</aside>
    <div class="ad-banner">Buy now</div>
    <div class="promo">Promo</div>
  </main>
  <footer>Footer</footer>
</body>
</html>"#;

    fn tag(element: ElementRef<'_>) -> String {
        element.value().name().to_string()
    }

    fn with_rules(rules: &[SiteRule]) -> ExtensionSettings {
        ExtensionSettings {
            site_rules: stringify_site_rules(rules),
            ..Default::default()
        }
    }

    #[test]
    fn test_title() {
        let page = PageDocument::parse(PAGE, "https://example.com/");
        assert_eq!(page.title(), "Sample Page");

        let untitled = PageDocument::parse("<p>no title</p>", "about:blank");
        assert_eq!(untitled.title(), "");
    }

    #[test]
    fn test_generic_locator_prefers_main() {
        let page = PageDocument::parse(PAGE, "https://example.com/");
        let root = page.locate_main_content(&ExtensionSettings::default());
        assert_eq!(tag(root), "main");
    }

    #[test]
    fn test_generic_locator_order() {
        let html = r#"<body><div id="content">id</div><article>art</article></body>"#;
        let page = PageDocument::parse(html, "https://example.com/");
        let root = page.locate_main_content(&ExtensionSettings::default());
        assert_eq!(tag(root), "article");
    }

    #[test]
    fn test_locator_falls_back_to_body() {
        let page = PageDocument::parse("<body><div>Only text</div></body>", "about:blank");
        let root = page.locate_main_content(&ExtensionSettings::default());
        assert_eq!(tag(root), "body");
    }

    #[test]
    fn test_built_in_site_rule_preempts_generic_list() {
        let page = PageDocument::parse(PAGE, "https://www.github.com/owner/repo");
        let root = page.locate_main_content(&ExtensionSettings::default());
        assert_eq!(root.value().attr("class"), Some("markdown-body"));
    }

    #[test]
    fn test_user_site_rule_preempts_built_in() {
        let settings = with_rules(&[SiteRule::new("github.com", "footer")]);
        let page = PageDocument::parse(PAGE, "https://github.com/owner/repo");
        let root = page.locate_main_content(&settings);
        assert_eq!(tag(root), "footer");
    }

    #[test]
    fn test_unmatched_or_invalid_site_rule_falls_through() {
        for selector in ["#does-not-exist", "[[invalid"] {
            let settings = with_rules(&[SiteRule::new("example.com", selector)]);
            let page = PageDocument::parse(PAGE, "https://example.com/");
            let root = page.locate_main_content(&settings);
            assert_eq!(tag(root), "main", "selector {selector}");
        }
    }

    #[test]
    fn test_url_without_host_skips_site_rules() {
        let settings = with_rules(&[SiteRule::new("example.com", "footer")]);
        let page = PageDocument::parse(PAGE, "not a url");
        assert_eq!(tag(page.locate_main_content(&settings)), "main");
    }

    #[test]
    fn test_prepare_removes_excluded_descendants() {
        let page = PageDocument::parse(PAGE, "https://example.com/");
        let root = page.locate_main_content(&ExtensionSettings::default());
        let prepared = page.prepare(root, &ExtensionSettings::default());

        assert!(prepared.contains("Heading"));
        assert!(prepared.contains("Body text"));
        assert!(prepared.contains("Promo"));
        assert!(!prepared.contains("Related links"));
        assert!(!prepared.contains("Buy now"));
    }

    #[test]
    fn test_prepare_leaves_page_untouched() {
        let page = PageDocument::parse(PAGE, "https://example.com/");
        let settings = ExtensionSettings::default();
        let first = page.prepare(page.locate_main_content(&settings), &settings);
        let second = page.prepare(page.locate_main_content(&settings), &settings);
        assert_eq!(first, second);

        let aside = Selector::parse("aside").unwrap();
        assert_eq!(page.html.select(&aside).count(), 1);
    }

    #[test]
    fn test_prepare_never_removes_root() {
        let settings = ExtensionSettings {
            custom_exclusions: "main\n.content".to_string(),
            ..Default::default()
        };
        let page = PageDocument::parse(PAGE, "https://example.com/");
        let root = page.locate_main_content(&settings);
        let prepared = page.prepare(root, &settings);
        assert!(prepared.contains("Body text"));
    }

    #[test]
    fn test_invalid_custom_selector_is_skipped() {
        let settings = ExtensionSettings {
            custom_exclusions: "[[broken\n.promo".to_string(),
            ..Default::default()
        };
        let page = PageDocument::parse(PAGE, "https://example.com/");
        let root = page.locate_main_content(&settings);
        let prepared = page.prepare(root, &settings);
        assert!(!prepared.contains("Promo"));
        assert!(prepared.contains("Body text"));
    }

    #[test]
    fn test_disabled_groups_are_kept() {
        let settings = ExtensionSettings {
            exclude_sidebar: false,
            exclude_ads: false,
            ..Default::default()
        };
        let page = PageDocument::parse(PAGE, "https://example.com/");
        let prepared = page.prepare(page.locate_main_content(&settings), &settings);
        assert!(prepared.contains("Related links"));
        assert!(prepared.contains("Buy now"));
    }

    #[test]
    fn test_selection_state() {
        let snapshot = PageSnapshot::new(PAGE, "https://example.com/");
        assert_eq!(snapshot.selection(), None);
        assert!(!snapshot.has_selection());

        let collapsed = snapshot.clone().with_selection("");
        assert_eq!(collapsed.selection(), None);

        let blank = snapshot.clone().with_selection("<p>  </p><img src=\"a.png\">");
        assert!(blank.selection().is_some());
        assert!(!blank.has_selection());

        let selected = snapshot.with_selection("<p>Picked <b>text</b></p>");
        assert!(selected.has_selection());
    }

    #[test]
    fn test_capture_selection() {
        let page = PageDocument::parse(PAGE, "https://example.com/");
        let captured = page.capture_selection("main h1").unwrap();
        assert_eq!(captured, "<h1>Heading</h1>");
        assert_eq!(page.capture_selection(".missing"), None);
        assert_eq!(page.capture_selection("[[bad"), None);
    }
}
