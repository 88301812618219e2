#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Fuzz the pattern translators with arbitrary strings
    // Translation must reject cleanly, never panic
    let _ = xqft::text::translate(data, true);
    let _ = xqft::text::translate(data, false);
    let _ = xqft::text::glob_to_regex(data);
});
