//! Duty Mapping
//!
//! Converts servo pulse widths into duty values on the 16-bit scale the PWM
//! driver works in, and derives the fixed duty table the robot uses for its
//! whole lifetime.

use crate::system::config;

/// Largest duty value (signal held high for the whole period)
pub const DUTY_MAX: u16 = u16::MAX;

/// Converts a pulse width into a duty value for the given PWM frequency.
///
/// The result is clamped to `0..=DUTY_MAX`, so a pulse longer than the period
/// saturates instead of wrapping. Non-positive or NaN inputs yield 0.
pub fn duty_for(pulse_ms: f32, pwm_frequency_hz: f32) -> u16 {
    if !(pulse_ms > 0.0 && pwm_frequency_hz > 0.0) {
        return 0;
    }

    let period_ms = 1000.0 / pwm_frequency_hz;
    let fraction = pulse_ms / period_ms;
    let duty = libm::roundf(fraction * DUTY_MAX as f32);

    if duty.is_nan() {
        0
    } else {
        duty.clamp(0.0, DUTY_MAX as f32) as u16
    }
}

/// Integer clock divider and counter top for a PWM frequency.
///
/// Picks the smallest divider that keeps the period inside the 16-bit counter,
/// which keeps the duty resolution as high as possible. Past the largest
/// divider the counter saturates at `u16::MAX`.
pub fn servo_timing(clock_freq_hz: u32, pwm_frequency_hz: u32) -> (u8, u16) {
    let divider = ((clock_freq_hz / pwm_frequency_hz) / 65_536 + 1).min(255);
    let top = (clock_freq_hz / (pwm_frequency_hz * divider)).saturating_sub(1);
    (divider as u8, top.min(u16::MAX as u32) as u16)
}

/// Rescales a 16-bit duty onto a counter running `0..=top`.
///
/// Full duty maps to `top + 1`, which holds the output high, except when
/// `top` is already `u16::MAX` and the compare value saturates.
pub fn compare_for(duty: u16, top: u16) -> u16 {
    let span = top as u32 + 1;
    ((duty as u32 * span) / DUTY_MAX as u32).min(u16::MAX as u32) as u16
}

/// Pulse widths (ms) for every actuator position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseWidths {
    pub motor_stop: f32,
    pub motor_forward: f32,
    pub motor_reverse: f32,
    pub spray_neutral: f32,
    pub spray_extend: f32,
    pub spray_retract: f32,
}

impl Default for PulseWidths {
    fn default() -> Self {
        Self {
            motor_stop: config::MOTOR_STOP_MS,
            motor_forward: config::MOTOR_FORWARD_MS,
            motor_reverse: config::MOTOR_REVERSE_MS,
            spray_neutral: config::SPRAY_NEUTRAL_MS,
            spray_extend: config::SPRAY_EXTEND_MS,
            spray_retract: config::SPRAY_RETRACT_MS,
        }
    }
}

/// Duty values derived once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyTable {
    /// Drive motors held still
    pub neutral: u16,
    /// Drive motor full forward
    pub forward: u16,
    /// Drive motor full reverse
    pub reverse: u16,
    /// Spray servo at rest
    pub spray_neutral: u16,
    /// Spray servo pressing
    pub spray_extend: u16,
    /// Spray servo pulled back
    pub spray_retract: u16,
    /// Right motor mounted mirrored
    pub right_inverted: bool,
}

impl DutyTable {
    pub fn new(pulses: &PulseWidths, pwm_frequency_hz: f32) -> Self {
        Self {
            neutral: duty_for(pulses.motor_stop, pwm_frequency_hz),
            forward: duty_for(pulses.motor_forward, pwm_frequency_hz),
            reverse: duty_for(pulses.motor_reverse, pwm_frequency_hz),
            spray_neutral: duty_for(pulses.spray_neutral, pwm_frequency_hz),
            spray_extend: duty_for(pulses.spray_extend, pwm_frequency_hz),
            spray_retract: duty_for(pulses.spray_retract, pwm_frequency_hz),
            right_inverted: false,
        }
    }

    /// Table built from [`crate::system::config`]
    pub fn from_config() -> Self {
        Self::new(&PulseWidths::default(), config::PWM_FREQUENCY_HZ)
            .with_right_inverted(config::RIGHT_MOTOR_INVERTED)
    }

    pub fn with_right_inverted(mut self, inverted: bool) -> Self {
        self.right_inverted = inverted;
        self
    }

    /// Full-forward duty for the right channel, honouring mirrored mounting
    pub fn right_forward(&self) -> u16 {
        if self.right_inverted {
            self.reverse
        } else {
            self.forward
        }
    }

    /// Full-reverse duty for the right channel, honouring mirrored mounting
    pub fn right_reverse(&self) -> u16 {
        if self.right_inverted {
            self.forward
        } else {
            self.reverse
        }
    }
}
