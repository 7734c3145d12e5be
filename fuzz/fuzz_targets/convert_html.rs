#![no_main]

use libfuzzer_sys::fuzz_target;
use page2md::charset::decode_html;
use page2md::{MarkdownConverter, clean_whitespace};

fuzz_target!(|data: &[u8]| {
    let Ok(html) = decode_html(data, None) else {
        return;
    };
    if let Ok(markdown) = MarkdownConverter::new().convert_html(&html) {
        assert!(!markdown.contains("\n\n\n"));
        assert_eq!(clean_whitespace(&markdown), markdown);
    }
});
