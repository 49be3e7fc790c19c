#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # AVRLite Core
//!
//! Minimal hardware abstraction for the ATmega328P: logical pin numbers,
//! an interrupt-driven millisecond/microsecond clock and PWM on the six
//! output-compare pins, all on top of raw memory-mapped registers.

pub mod hal;
pub mod types;
pub mod pins;
pub mod config;
pub mod clock;
pub mod pwm;
pub mod gpio;
pub mod serial;
pub mod board;


pub use types::*;
pub use pins::*;
pub use config::*;
pub use clock::*;
pub use pwm::*;
pub use gpio::*;
pub use serial::*;
pub use board::*;
pub use hal::{HalError, MmioRegisters, Register, Register16, RegisterAccess};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Arduino Uno timing: 16 MHz, /64 timers, 9600 baud
pub fn default_config() -> BoardConfig {
    BoardConfig {
        clock: ClockConfig {
            cpu_hz: 16_000_000,
            tick_prescaler: Prescaler::Div64,
            millis_prescaler: Prescaler::Div64,
        },
        serial: SerialConfig { baud: 9600 },
    }
}
