//! gpiotool library.
//!
//! Line registry, line state accessor, change notifier and pulse
//! controller for the Raspberry Pi 40-pin header, plus the application
//! service the console binary drives.  Hardware sits behind the port
//! traits in [`app::ports`]; the simulator in [`adapters::sim`] is
//! always built, the character-device backend only with `cdev`.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod line;
pub mod notifier;
pub mod pins;
pub mod pulse;
pub mod registry;
pub mod task;
pub mod types;

pub use error::{GpioError, HwError, Result};
