//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements                | Connects to                 |
//! |---------------|---------------------------|-----------------------------|
//! | `sim`         | GpioController/LineHandle | In-process simulated lines  |
//! | `cdev`        | GpioController/LineHandle | Linux `/dev/gpiochipN`      |
//! | `log_sink`    | EventSink                 | `log` facade                |
//! | `console_log` | `env_logger` setup        | stderr                      |

#[cfg(feature = "cdev")]
pub mod cdev;
pub mod console_log;
pub mod log_sink;
pub mod sim;
