//! Console logger for the host binary.
//!
//! `env_logger` on stderr with millisecond timestamps, the host stand-in
//! for the serial logger on a board.  The level comes from
//! [`ToolConfig::log_level`](crate::config::ToolConfig::log_level);
//! `RUST_LOG`, when set, overrides it.

use log::LevelFilter;

/// Install the console logger.  Later calls are ignored.
pub fn init(level: LevelFilter) {
    let installed = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
    if installed.is_err() {
        log::debug!("logger already installed");
    }
}
