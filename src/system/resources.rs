//! Hardware Resource Management
//!
//! Allocates the Pico 2 W pins and peripherals to the tasks that own them, so
//! that no two tasks can touch the same hardware.
//!
//! # Resource Groups
//! - Actuators: three PWM slices driving the servo-style outputs
//! - Wi-Fi: the CYW43439 radio on its PIO-driven SPI bus
//!
//! # Pin Mapping
//! - GPIO 16 (PWM_SLICE0 A): left drive motor
//! - GPIO 18 (PWM_SLICE1 A): right drive motor
//! - GPIO 20 (PWM_SLICE2 A): spray servo
//! - GPIO 23/24/25/29, PIO0, DMA_CH0: CYW43439 (fixed by the board)

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{self, PIO0};
use embassy_rp::pio::InterruptHandler as PioInterruptHandler;

assign_resources! {
    /// Servo-style PWM outputs
    actuators: ActuatorResources {
        left_slice: PWM_SLICE0,
        left_pin: PIN_16,
        right_slice: PWM_SLICE1,
        right_pin: PIN_18,
        spray_slice: PWM_SLICE2,
        spray_pin: PIN_20,
    },
    /// CYW43439 radio
    wifi: WifiResources {
        pwr_pin: PIN_23,
        dio_pin: PIN_24,
        cs_pin: PIN_25,
        clk_pin: PIN_29,
        pio: PIO0,
        dma: DMA_CH0,
    },
}

bind_interrupts!(pub struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});
