#![cfg_attr(not(test), no_std)]
//! Voice calls and text messages through AT command GSM modems.
//!
//! The host opens a byte [`Channel`](asynch::Channel) to the modem (usually a
//! serial port) and hands it to [`GsmModem`](asynch::GsmModem) together with
//! the configuration. Supported hardware is listed in [`modules::Hardware`].

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod asynch;
pub mod command;
pub mod config;
pub mod error;
pub mod module_timing;
pub mod modules;

#[cfg(test)]
mod test_helpers;

pub use asynch::{EndedReason, GsmModem};
pub use error::Error;
