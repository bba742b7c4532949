//! Core system components for robot operation
pub mod logging;

pub mod actuation;
pub mod actuator;
pub mod command;
pub mod command_store;
pub mod config;
pub mod control;
pub mod duty;
pub mod spray;

#[cfg(feature = "pico2_w")]
pub mod motor;
#[cfg(feature = "pico2_w")]
pub mod resources;
