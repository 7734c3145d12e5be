#![no_main]

use libfuzzer_sys::fuzz_target;
use page2md::{ExtensionSettings, PageSnapshot, Target, render};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (page, selection) = text.split_once('\u{0}').unwrap_or((text, ""));
    let snapshot = PageSnapshot::new(page, "https://fuzz.example/page").with_selection(selection);
    let settings = ExtensionSettings::default();

    let _ = render(Target::Page, &snapshot, &settings, true);
    let _ = render(Target::Selection, &snapshot, &settings, false);
});
