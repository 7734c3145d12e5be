//! Exclusion selectors derived from settings
//!
//! Each enabled exclusion flag contributes a fixed group of CSS selectors;
//! the user's custom selectors (one per non-blank line) follow last, in the
//! order they were written. Duplicates are left in place since removing an
//! element twice is harmless.

use crate::settings::ExtensionSettings;

pub const NAV_SELECTORS: &[&str] = &[
    "nav",
    "header nav",
    "[role=\"navigation\"]",
    ".navigation",
    ".nav",
    "#nav",
    "#navigation",
];

pub const FOOTER_SELECTORS: &[&str] = &["footer", "[role=\"contentinfo\"]", ".footer", "#footer"];

pub const SIDEBAR_SELECTORS: &[&str] = &[
    "aside",
    "[role=\"complementary\"]",
    ".sidebar",
    "#sidebar",
    ".side-bar",
];

pub const AD_SELECTORS: &[&str] = &[
    "[class*=\"ad-\"]",
    "[class*=\"ads-\"]",
    "[class*=\"advertisement\"]",
    "[id*=\"ad-\"]",
    "[id*=\"ads-\"]",
    "[id*=\"advertisement\"]",
    ".ad",
    ".ads",
    ".advert",
    ".banner-ad",
    "[data-ad]",
    "ins.adsbygoogle",
];

pub const COMMENT_SELECTORS: &[&str] = &[
    "#comments",
    ".comments",
    ".comment-section",
    "[id*=\"comment\"]",
    "#disqus_thread",
    ".disqus",
    "[class*=\"comment\"]",
];

pub const FORM_SELECTORS: &[&str] = &["form", "input", "button", "select", "textarea"];

pub const SCRIPT_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "link[rel=\"stylesheet\"]",
];

/// Ordered list of selectors whose matches are stripped from page content
pub fn build(settings: &ExtensionSettings) -> Vec<String> {
    let groups: [(bool, &[&str]); 7] = [
        (settings.exclude_nav, NAV_SELECTORS),
        (settings.exclude_footer, FOOTER_SELECTORS),
        (settings.exclude_sidebar, SIDEBAR_SELECTORS),
        (settings.exclude_ads, AD_SELECTORS),
        (settings.exclude_comments, COMMENT_SELECTORS),
        (settings.exclude_forms, FORM_SELECTORS),
        (settings.exclude_scripts, SCRIPT_SELECTORS),
    ];

    let mut selectors: Vec<String> = groups
        .iter()
        .filter(|(enabled, _)| *enabled)
        .flat_map(|(_, group)| group.iter().map(|s| s.to_string()))
        .collect();

    selectors.extend(custom_selectors(&settings.custom_exclusions));
    selectors
}

/// Split the free-text custom exclusions field into selectors
pub fn custom_selectors(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}
