//! Fuzz target: `GpioCommand::parse`
//!
//! Feeds arbitrary text into the console command parser and checks that
//! it never panics and that an accepted command survives surrounding
//! whitespace.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use gpiotool::app::commands::GpioCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(cmd) = GpioCommand::parse(text) {
        let padded = format!("  {text}\t");
        assert_eq!(GpioCommand::parse(&padded), Ok(cmd));
    }
});
