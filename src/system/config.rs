//! Configuration constants for the spray rover
//!
//! All tunable values live here: servo pulse widths, actuation timing and the
//! access point the robot opens for its controller. Pin assignment is kept in
//! [`crate::system::resources`].
//!
//! # Pulse widths
//!
//! The drive motors are continuous-rotation servos: 1.5 ms holds them still,
//! 2.0 ms is full speed one way and 1.0 ms full speed the other. The spray
//! servo uses the same convention for its extend and retract strokes.

use embassy_time::Duration;

// PWM Configuration
/// Servo PWM frequency in Hz (20 ms period)
pub const PWM_FREQUENCY_HZ: f32 = 50.0;

/// Drive motor pulse that holds the wheel still (ms)
pub const MOTOR_STOP_MS: f32 = 1.5;
/// Drive motor pulse for full forward (ms)
pub const MOTOR_FORWARD_MS: f32 = 2.0;
/// Drive motor pulse for full reverse (ms)
pub const MOTOR_REVERSE_MS: f32 = 1.0;

/// Spray servo resting pulse (ms)
pub const SPRAY_NEUTRAL_MS: f32 = 1.5;
/// Spray servo pulse that presses the trigger (ms)
pub const SPRAY_EXTEND_MS: f32 = 2.0;
/// Spray servo pulse that pulls back off the trigger (ms)
pub const SPRAY_RETRACT_MS: f32 = 1.0;

/// The right motor is mounted mirrored and turns the opposite way for the
/// same pulse. Swaps its forward and reverse duties when set.
pub const RIGHT_MOTOR_INVERTED: bool = false;

// Timing Configuration
/// Interval between two reads of the command store
pub const POLL_PERIOD: Duration = Duration::from_millis(10);

/// How long the spray servo holds the extended position
pub const SPRAY_EXTEND: Duration = Duration::from_millis(1500);

/// How long the spray servo holds the retracted position
pub const SPRAY_RETRACT: Duration = Duration::from_millis(1200);

// Network Configuration
/// Access point SSID
pub const AP_SSID: &str = "SprayRover";
/// Access point WPA2 passphrase (8-63 characters)
pub const AP_PASSWORD: &str = "12345678";
/// Access point radio channel
pub const AP_CHANNEL: u8 = 6;

/// Address of the robot on its own network (/24)
pub const AP_ADDRESS: [u8; 4] = [192, 168, 4, 1];
/// First address leased to a controller
pub const DHCP_RANGE_START: [u8; 4] = [192, 168, 4, 50];
/// Last address leased to a controller
pub const DHCP_RANGE_END: [u8; 4] = [192, 168, 4, 200];

/// Control panel port
pub const HTTP_PORT: u16 = 80;
/// Control connections served at once
pub const HTTP_WORKERS: usize = 2;
/// Idle timeout for one control connection; a silent preconnect holds a
/// worker for at most this long
pub const HTTP_SOCKET_TIMEOUT: Duration = Duration::from_secs(2);
/// Largest request head read from a client
pub const HTTP_REQUEST_MAX: usize = 1024;
