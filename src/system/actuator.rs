//! Actuator Driver Interface
//!
//! The three PWM outputs the robot drives. The actuation loop only talks to
//! this trait, so the RP2350 implementation in [`crate::system::motor`] and the
//! recording double used by the tests are interchangeable.

use core::fmt;

/// Result type for actuator writes
pub type Result<T> = core::result::Result<T, ActuatorError>;

/// PWM outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum Channel {
    /// Left drive motor
    LeftMotor,
    /// Right drive motor
    RightMotor,
    /// Spray servo
    Spray,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::LeftMotor, Channel::RightMotor, Channel::Spray];
}

/// Actuator write errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum ActuatorError {
    /// The output rejected the duty write
    WriteFailed(Channel),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorError::WriteFailed(channel) => write!(f, "duty write to {:?} failed", channel),
        }
    }
}

/// Servo-style PWM outputs addressed by duty value
pub trait Actuator {
    /// Sets one output to a duty value on the 16-bit scale
    fn set_duty(&mut self, channel: Channel, duty: u16) -> Result<()>;

    /// Sets both drive motors
    fn drive(&mut self, left: u16, right: u16) -> Result<()> {
        self.set_duty(Channel::LeftMotor, left)?;
        self.set_duty(Channel::RightMotor, right)
    }
}
