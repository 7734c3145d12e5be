#![no_main]

use libfuzzer_sys::fuzz_target;
use page2md::settings::{ExtensionSettings, MemoryStorage, SettingsStore, parse_site_rules};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(Value::Object(record)) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let store = SettingsStore::new(MemoryStorage::with_values(record));
    let settings: ExtensionSettings = store.load();
    let _ = parse_site_rules(&settings.site_rules);
    let _ = settings.user_site_rules();
});
