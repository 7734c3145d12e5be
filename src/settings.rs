//! User configuration and its persistence
//!
//! Settings live in a key-value store keyed by the camelCase field names of
//! [`ExtensionSettings`]. Every surface (popup, options page, content script,
//! command-line host) loads them once per request and threads the value
//! through the pipeline explicitly; nothing in the conversion path looks
//! settings up on its own.
//!
//! # Validation
//!
//! A stored record is deserialized strictly: every flag must be a JSON
//! boolean and `customExclusions`/`siteRules` must be strings. A record that
//! is missing a field or carries a mistyped one is discarded wholesale and
//! the defaults are returned instead. There is no partial merge.
//!
//! # Examples
//!
//! ```rust
//! use page2md::settings::{MemoryStorage, SettingsStore};
//!
//! let store = SettingsStore::new(MemoryStorage::new());
//! let mut settings = store.load();
//! assert!(settings.include_links);
//!
//! settings.include_links = false;
//! store.save(&settings).expect("in-memory save succeeds");
//! assert!(!store.load().include_links);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SettingsError;

/// User-configurable switches for extraction and output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSettings {
    // Elements to exclude
    pub exclude_nav: bool,
    pub exclude_footer: bool,
    pub exclude_sidebar: bool,
    pub exclude_ads: bool,
    pub exclude_comments: bool,
    pub exclude_forms: bool,
    pub exclude_scripts: bool,

    /// One CSS selector per line
    pub custom_exclusions: String,
    /// JSON array of `{domain, contentSelector}` objects
    pub site_rules: String,

    // Output options
    pub include_images: bool,
    pub include_links: bool,
    pub preserve_tables: bool,
    pub include_title: bool,
    pub include_url: bool,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            exclude_nav: true,
            exclude_footer: true,
            exclude_sidebar: true,
            exclude_ads: true,
            exclude_comments: true,
            exclude_forms: true,
            exclude_scripts: true,
            custom_exclusions: String::new(),
            site_rules: "[]".to_string(),
            include_images: true,
            include_links: true,
            preserve_tables: true,
            include_title: true,
            include_url: true,
        }
    }
}

impl ExtensionSettings {
    /// Decode the user's site rules; malformed JSON yields no rules
    pub fn user_site_rules(&self) -> Vec<SiteRule> {
        parse_site_rules(&self.site_rules)
    }
}

/// A domain pattern paired with the selector of that site's main content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRule {
    /// Literal domain (`github.com`) or subdomain wildcard (`*.example.com`)
    pub domain: String,
    pub content_selector: String,
}

impl SiteRule {
    pub fn new(domain: impl Into<String>, content_selector: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            content_selector: content_selector.into(),
        }
    }

    /// Build a rule from raw form input. Rows with a blank field are dropped.
    pub fn from_form(domain: &str, content_selector: &str) -> Option<Self> {
        let domain = domain.trim();
        let content_selector = content_selector.trim();
        if domain.is_empty() || content_selector.is_empty() {
            return None;
        }
        Some(Self::new(domain, content_selector))
    }
}

/// Parse the `siteRules` field
///
/// Malformed JSON or a non-array value yields an empty list. Array entries
/// without a string `domain` and `contentSelector` are skipped.
pub fn parse_site_rules(json: &str) -> Vec<SiteRule> {
    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "site rules are not valid JSON, ignoring");
            return Vec::new();
        }
    };

    let Value::Array(entries) = value else {
        debug!("site rules are not a JSON array, ignoring");
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<SiteRule>(entry).ok())
        .collect()
}

/// Serialize site rules for storage in the `siteRules` field
pub fn stringify_site_rules(rules: &[SiteRule]) -> String {
    // Vec<SiteRule> of plain strings always serializes
    serde_json::to_string(rules).unwrap_or_else(|_| "[]".to_string())
}

/// Key-value backend holding the persisted settings record
///
/// Reads return the whole record; writes replace it in one transaction.
pub trait SettingsStorage {
    fn get_all(&self) -> Result<Map<String, Value>, SettingsError>;
    fn set_all(&self, values: Map<String, Value>) -> Result<(), SettingsError>;
}

/// In-process storage, used by tests and by hosts that persist elsewhere
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<Map<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an arbitrary raw record (which need not be valid settings)
    pub fn with_values(values: Map<String, Value>) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SettingsStorage for MemoryStorage {
    fn get_all(&self) -> Result<Map<String, Value>, SettingsError> {
        let values = self
            .values
            .lock()
            .map_err(|_| SettingsError::Storage("settings lock poisoned".to_string()))?;
        Ok(values.clone())
    }

    fn set_all(&self, values: Map<String, Value>) -> Result<(), SettingsError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|_| SettingsError::Storage("settings lock poisoned".to_string()))?;
        *guard = values;
        Ok(())
    }
}

/// Settings record kept as a JSON object on disk
///
/// A missing file reads as empty storage. Saves are written to a temporary
/// file in the same directory and renamed over the target, so a reader never
/// observes a half-written record. Concurrent writers race; the last rename wins.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStorage for JsonFileStorage {
    fn get_all(&self) -> Result<Map<String, Value>, SettingsError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(SettingsError::Storage(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn set_all(&self, values: Map<String, Value>) -> Result<(), SettingsError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let content = serde_json::to_string_pretty(&Value::Object(values))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| SettingsError::Io(e.error))?;
        Ok(())
    }
}

/// Validated load/save over a [`SettingsStorage`] backend
#[derive(Debug)]
pub struct SettingsStore<S> {
    storage: S,
}

impl<S: SettingsStorage> SettingsStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load settings, never returning a malformed value
    ///
    /// Empty, unreadable or corrupt storage and records failing validation
    /// all yield a fresh copy of the defaults.
    pub fn load(&self) -> ExtensionSettings {
        let stored = match self.storage.get_all() {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "failed to read settings, using defaults");
                return ExtensionSettings::default();
            }
        };

        if stored.is_empty() {
            return ExtensionSettings::default();
        }

        match serde_json::from_value::<ExtensionSettings>(Value::Object(stored)) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "stored settings failed validation, using defaults");
                ExtensionSettings::default()
            }
        }
    }

    /// Persist the whole settings record
    ///
    /// The returned `Result` is the completion acknowledgment: `Ok` once the
    /// record is durably written, `Err` describing why it was not.
    pub fn save(&self, settings: &ExtensionSettings) -> Result<(), SettingsError> {
        match serde_json::to_value(settings)? {
            Value::Object(map) => self.storage.set_all(map),
            other => Err(SettingsError::Storage(format!(
                "settings serialized to a non-object value: {other}"
            ))),
        }
    }

    /// Overwrite the stored record with the defaults and return them
    pub fn reset(&self) -> Result<ExtensionSettings, SettingsError> {
        let defaults = ExtensionSettings::default();
        self.save(&defaults)?;
        Ok(defaults)
    }
}
