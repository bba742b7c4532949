//! Logging Macros
//!
//! One set of macros for every build of the crate:
//! - Firmware (`pico2_w`): forwards to defmt, transported over RTT
//! - Host tests: prints to stdout so failing tests show the trace
//! - Host non-test: compiled out
//!
//! Arguments must implement `defmt::Format` on the firmware and
//! `core::fmt::Debug`/`Display` on the host, so enums are logged with `{:?}`.

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "pico2_w")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "pico2_w"), test))]
        println!("[INFO] {}", format!($($arg)*));
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "pico2_w")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "pico2_w"), test))]
        println!("[WARN] {}", format!($($arg)*));
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "pico2_w")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "pico2_w"), test))]
        println!("[ERROR] {}", format!($($arg)*));
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "pico2_w")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "pico2_w"), test))]
        println!("[DEBUG] {}", format!($($arg)*));
    }};
}
