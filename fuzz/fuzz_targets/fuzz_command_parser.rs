#![no_main]

use libfuzzer_sys::fuzz_target;

use pollbot::polls::{parse_command, Command, PollEngine};

fuzz_target!(|data: &str| {
    // Parsing must be total, and whatever it produces must be safe to feed
    // through the engine.
    let engine = PollEngine::default();
    match parse_command(data) {
        Command::CreatePoll(request) => {
            if engine.create_poll("fuzz", "U1", request).is_ok() {
                let _ = engine.vote("fuzz", "U2", "1");
                assert!(engine.end_poll("fuzz").is_ok());
            }
        }
        Command::Vote(raw) => {
            let _ = engine.vote("fuzz", "U1", &raw);
        }
        Command::EndPoll => {
            assert!(engine.end_poll("fuzz").is_err());
        }
        Command::Malformed(_) | Command::Ignore => {}
    }
});
