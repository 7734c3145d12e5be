//! Per-site content selector resolution
//!
//! A site rule overrides generic main-content detection for one domain (or a
//! family of subdomains). Resolution runs in two tiers, the user's rules
//! first and the built-in list second, and within a tier:
//!
//! 1. the first rule whose domain equals the target (after stripping a
//!    leading `www.` from both, or verbatim) wins;
//! 2. otherwise the first wildcard rule `*.base` whose base the target is a
//!    strict subdomain of wins.
//!
//! A user rule always beats a built-in rule, however specific the built-in is.
//!
//! # Examples
//!
//! ```rust
//! use page2md::settings::SiteRule;
//! use page2md::site_rules::resolve;
//!
//! let rules = vec![SiteRule::new("*.example.com", ".post")];
//! assert_eq!(resolve("blog.example.com", &rules), Some(".post"));
//! assert_eq!(resolve("example.com", &rules), None);
//! assert_eq!(resolve("www.github.com", &rules), Some(".markdown-body"));
//! ```

use tracing::debug;
use url::Url;

use crate::settings::SiteRule;

/// Rules shipped with the crate, consulted after the user's own
pub const BUILT_IN_SITE_RULES: &[(&str, &str)] = &[
    ("github.com", ".markdown-body"),
    ("stackoverflow.com", "#mainbar"),
    ("*.stackexchange.com", "#mainbar"),
    ("*.wikipedia.org", "#mw-content-text"),
    ("developer.mozilla.org", ".main-page-content"),
    ("medium.com", "article"),
    ("*.medium.com", "article"),
    ("dev.to", "#article-body"),
    ("news.ycombinator.com", "#hnmain"),
    ("docs.rs", "#main-content"),
];

/// Built-in rules as owned [`SiteRule`] values
pub fn built_in_rules() -> Vec<SiteRule> {
    BUILT_IN_SITE_RULES
        .iter()
        .map(|(domain, selector)| SiteRule::new(*domain, *selector))
        .collect()
}

/// Comparison form of a domain: trimmed, lower-cased, leading `www.` removed
pub fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().to_ascii_lowercase();
    match lowered.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Host part of a page URL, if it has one
pub fn domain_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(str::to_string)
}

/// Find the content selector for `domain`
pub fn resolve<'a>(domain: &str, user_rules: &'a [SiteRule]) -> Option<&'a str> {
    let user: Vec<(&str, &str)> = user_rules
        .iter()
        .map(|rule| (rule.domain.as_str(), rule.content_selector.as_str()))
        .collect();

    if let Some(selector) = find_in_tier(domain, &user) {
        debug!(domain, selector, "matched user site rule");
        return Some(selector);
    }

    let selector = find_in_tier(domain, BUILT_IN_SITE_RULES)?;
    debug!(domain, selector, "matched built-in site rule");
    Some(selector)
}

fn find_in_tier<'a>(domain: &str, rules: &[(&'a str, &'a str)]) -> Option<&'a str> {
    let normalized = normalize_domain(domain);

    let exact = rules.iter().find(|(rule_domain, _)| {
        *rule_domain == domain || normalize_domain(rule_domain) == normalized
    });
    if let Some((_, selector)) = exact {
        return Some(*selector);
    }

    rules
        .iter()
        .find(|(rule_domain, _)| matches_wildcard(rule_domain, domain))
        .map(|(_, selector)| *selector)
}

/// `*.base` matches strict subdomains of `base`, never `base` itself
fn matches_wildcard(rule_domain: &str, domain: &str) -> bool {
    let Some(base) = rule_domain.trim().strip_prefix("*.") else {
        return false;
    };
    if base.is_empty() {
        return false;
    }

    let domain = domain.trim().to_ascii_lowercase();
    let suffix = format!(".{}", base.to_ascii_lowercase());
    domain.len() > suffix.len() && domain.ends_with(&suffix)
}
