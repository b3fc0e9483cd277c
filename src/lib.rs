//! # Smart Light Runtime Library
//!
//! This crate contains the on-device runtime glue of a Bluetooth Mesh
//! controlled smart light in library form: a cooperative work queue that
//! serializes deferred work, and the boot trailer protocol that confirms
//! firmware images and stages updates for the bootloader.
#![cfg_attr(test, allow(unused_imports))]

extern crate static_assertions;

#[macro_use]
pub mod utilities {
    pub mod macros;
    pub mod bitwise;
    pub mod guard;
    pub mod memory;
}

pub mod hal;
pub mod devices;
pub mod ports;
pub mod error;

/// Board configuration, generated at build time from the RON configuration file.
pub mod configuration {
    include!(concat!(env!("OUT_DIR"), "/configuration.rs"));
}
