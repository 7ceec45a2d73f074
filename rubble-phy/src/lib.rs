//! A hardware-agnostic BLE PHY driver core.
//!
//! This crate sits between a BLE Link-Layer and a radio peripheral of the nRF5x kind. It schedules
//! radio enables with microsecond precision off a coarse 32.768 kHz counter and a fine 1 MHz
//! counter, chains transmissions and receptions together within the inter-frame space, wires the
//! inline AES-CCM cipher and the address resolver into the packet path, and enforces
//! wait-for-response deadlines.
//!
//! # Using the PHY
//!
//! The PHY does not touch any registers itself. Platform support implements the traits in [`hw`]
//! and binds them together in a [`Config`] implementation; `rubble-phy-nrf5x` does this for the
//! nRF52 family. The platform also forwards the radio interrupt to [`Phy::isr`], which reports
//! received packets, finished transmissions and timeouts to the Link-Layer through the
//! [`LinkLayer`] trait.
//!
//! [`hw`]: hw/index.html
//! [`Config`]: config/trait.Config.html
//! [`Phy::isr`]: phy/struct.Phy.html#method.isr
//! [`LinkLayer`]: link/trait.LinkLayer.html

// We're `#[no_std]`, except when we're testing
#![cfg_attr(not(test), no_std)]
// Deny a few warnings in doctests, since rustdoc `allow`s many warnings by default
#![doc(test(attr(deny(unused_imports, unused_must_use))))]
#![warn(rust_2018_idioms)]

#[macro_use]
mod log;
pub mod buffers;
pub mod channel;
pub mod config;
pub mod encryption;
mod errata;
mod error;
pub mod hw;
pub mod isr;
pub mod link;
pub mod mode;
pub mod phy;
pub mod privacy;
#[cfg(test)]
mod sim;
pub mod spin;
pub mod stats;
pub mod time;
pub mod timing;
pub mod wfr;
pub mod xcvr;

pub use self::error::Error;
