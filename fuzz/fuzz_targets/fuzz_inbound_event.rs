#![no_main]

use libfuzzer_sys::fuzz_target;

use pollbot::gateway::console::parse_event_line;

fuzz_target!(|data: &str| {
    // Arbitrary stdin lines must never panic the console reader.
    if let Some(event) = parse_event_line(data) {
        let _ = event.into_parts();
    }
});
