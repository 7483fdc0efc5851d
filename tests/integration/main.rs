//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific component
//! against the mock controller.  All tests run on the host with no real
//! hardware required.

mod mock_hw;
mod pulse_tests;
mod registry_tests;
mod service_tests;
