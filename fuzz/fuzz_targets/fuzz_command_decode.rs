//! Fuzz target: `wire::decode_command`
//!
//! Drives arbitrary bytes through the inbound command decoder and asserts
//! that it never panics and that an accepted threshold is always usable.
//!
//! cargo fuzz run fuzz_command_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use tavolo::adapters::wire::decode_command;
use tavolo::app::commands::Command;

fuzz_target!(|data: &[u8]| {
    if let Ok(cmd) = decode_command(data, 0) {
        if let Command::SetThreshold(grams) = cmd.command {
            assert!(grams.is_finite() && grams > 0.0, "threshold must be positive");
        }
        // Tags round-trip through the parser.
        let value = match cmd.command {
            Command::SetThreshold(g) => Some(g.to_string()),
            _ => None,
        };
        assert_eq!(
            Command::parse(cmd.command.tag(), value.as_deref()).map(|c| c.tag()),
            Ok(cmd.command.tag())
        );
    }
});
