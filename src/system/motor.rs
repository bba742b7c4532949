//! PWM Actuator Driver
//!
//! Drives the three servo-style outputs from RP2350 PWM slices at the
//! configured servo frequency. Duty values arrive on the 16-bit scale of
//! [`crate::system::duty`] and are rescaled to each slice's counter range.

use crate::system::actuator::{self, Actuator, Channel};
use crate::system::config;
use crate::system::duty::{compare_for, servo_timing};
use crate::system::resources::ActuatorResources;
use crate::log_info;
use embassy_rp::pwm::{Config, Pwm};

/// One PWM output on channel A of its slice
struct Output {
    pwm: Pwm<'static>,
    config: Config,
}

impl Output {
    fn set(&mut self, duty: u16) {
        self.config.compare_a = compare_for(duty, self.config.top);
        self.pwm.set_config(&self.config);
    }
}

/// Left motor, right motor and spray servo outputs
pub struct PwmActuator {
    left: Output,
    right: Output,
    spray: Output,
}

impl PwmActuator {
    /// Configures the three slices, all outputs low until the first write.
    pub fn new(r: ActuatorResources) -> Self {
        let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();
        let (divider, top) = servo_timing(clock_freq_hz, config::PWM_FREQUENCY_HZ as u32);
        log_info!("servo PWM: divider {} top {}", divider, top);

        let mut pwm_config = Config::default();
        pwm_config.divider = divider.into();
        pwm_config.top = top;
        pwm_config.compare_a = 0;

        let left = Pwm::new_output_a(r.left_slice, r.left_pin, pwm_config.clone());
        let right = Pwm::new_output_a(r.right_slice, r.right_pin, pwm_config.clone());
        let spray = Pwm::new_output_a(r.spray_slice, r.spray_pin, pwm_config.clone());

        Self {
            left: Output {
                pwm: left,
                config: pwm_config.clone(),
            },
            right: Output {
                pwm: right,
                config: pwm_config.clone(),
            },
            spray: Output {
                pwm: spray,
                config: pwm_config,
            },
        }
    }
}

impl Actuator for PwmActuator {
    fn set_duty(&mut self, channel: Channel, duty: u16) -> actuator::Result<()> {
        match channel {
            Channel::LeftMotor => self.left.set(duty),
            Channel::RightMotor => self.right.set(duty),
            Channel::Spray => self.spray.set(duty),
        }
        Ok(())
    }
}
