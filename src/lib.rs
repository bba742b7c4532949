//! Spray rover firmware
//!
//! A two-wheel robot with a spray servo, driven from a browser over the
//! robot's own Wi-Fi access point.
//!
//! - [`system`]: commands, the command store, duty mapping, the actuation loop
//!   and its spray sequence, and the HTTP control handler. Hardware independent
//!   and tested on the host.
//! - `task`: the embassy tasks wiring that core to the Pico 2 W (PWM outputs,
//!   CYW43 access point, DHCP and HTTP). Built with the `pico2_w` feature.

#![cfg_attr(not(test), no_std)]

pub mod system;

#[cfg(feature = "pico2_w")]
pub mod task;
