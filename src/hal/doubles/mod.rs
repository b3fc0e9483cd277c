//! Test doubles for the HAL interfaces. Host only.
pub mod error;
pub mod flash;
pub mod gpio;
pub mod pwm;
pub mod thread;
pub mod time;
