//! Tool configuration.
//!
//! Loaded once at start-up from the JSON file named by `GPIOTOOL_CONFIG`.
//! Missing fields take their defaults; nothing is written back.

use serde::{Deserialize, Serialize};

use crate::error::{GpioError, Result};
use crate::line::WritePolicy;
use crate::pins::HeaderVariant;
use crate::pulse::{CancelCheck, PulseTiming};

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "GPIOTOOL_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    // --- Wiring ---
    /// Which header table to open.
    pub header: HeaderVariant,

    // --- Line policy ---
    pub write_policy: WritePolicy,

    // --- Pulse ---
    pub cancel_check: CancelCheck,
    /// Low phase used when `pulse` is given no intervals (milliseconds)
    pub default_low_ms: i64,
    /// High phase used when `pulse` is given no intervals (milliseconds)
    pub default_high_ms: i64,

    // --- Character device backend ---
    pub chip_path: String,
    /// Consumer label shown by `gpioinfo`
    pub consumer: String,

    // --- Logging ---
    /// Log at debug level instead of info.
    pub verbose: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            header: HeaderVariant::default(),
            write_policy: WritePolicy::default(),
            cancel_check: CancelCheck::default(),
            default_low_ms: 100,
            default_high_ms: 200,
            chip_path: "/dev/gpiochip0".into(),
            consumer: "gpiotool".into(),
            verbose: false,
        }
    }
}

impl ToolConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|_| GpioError::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_timing().is_err() {
            return Err(GpioError::Config("default pulse intervals must be positive"));
        }
        if self.chip_path.is_empty() {
            return Err(GpioError::Config("chip_path is empty"));
        }
        if self.consumer.is_empty() {
            return Err(GpioError::Config("consumer is empty"));
        }
        Ok(())
    }

    /// Intervals for a `pulse` command that names none.
    pub fn default_timing(&self) -> Result<PulseTiming> {
        PulseTiming::from_millis(self.default_low_ms, self.default_high_ms)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}
