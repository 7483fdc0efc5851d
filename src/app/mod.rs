//! Application core: the command and query surface over the GPIO engine.
//!
//! Presentation (the console binary, or any other front end) talks to
//! [`service::GpioService`] with [`commands::GpioCommand`]s and an explicit
//! [`session::Session`].  Hardware is reached only through the port traits
//! in [`ports`], so the whole layer runs against the simulator in tests.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod session;
