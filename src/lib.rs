pub mod configuration;
pub mod domain;
pub mod helper;
pub mod ports;
pub mod repositories;
pub mod startup;
pub mod telemetry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
