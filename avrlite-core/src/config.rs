//! Board configuration: CPU clock, timer prescalers and UART speed

use crate::hal::bits::*;
use crate::hal::HalError;

/// Timer clock-select settings shared by timer0 and timer1
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div1,
    Div8,
    Div64,
    Div256,
    Div1024,
}

impl Prescaler {
    pub const fn divisor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div64 => 64,
            Prescaler::Div256 => 256,
            Prescaler::Div1024 => 1024,
        }
    }

    /// CSn2:0 field (identical layout in TCCR0B and TCCR1B)
    pub const fn clock_select(self) -> u8 {
        match self {
            Prescaler::Div1 => bv(CS00),
            Prescaler::Div8 => bv(CS01),
            Prescaler::Div64 => bv(CS01) | bv(CS00),
            Prescaler::Div256 => bv(CS02),
            Prescaler::Div1024 => bv(CS02) | bv(CS00),
        }
    }
}

/// Monotonic clock configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// CPU frequency in Hz (F_CPU)
    pub cpu_hz: u32,
    /// Timer0 prescaler, sets the tick period
    pub tick_prescaler: Prescaler,
    /// Timer1 prescaler, combined with the compare value for 1 ms
    pub millis_prescaler: Prescaler,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            cpu_hz: 16_000_000,
            tick_prescaler: Prescaler::Div64,
            millis_prescaler: Prescaler::Div64,
        }
    }
}

impl ClockConfig {
    /// Microseconds per timer0 tick
    pub const fn micros_per_tick(&self) -> u32 {
        self.tick_prescaler.divisor() / (self.cpu_hz / 1_000_000)
    }

    /// OCR1A value giving a 1 ms compare period
    pub const fn millis_compare_value(&self) -> u32 {
        (self.cpu_hz / (self.millis_prescaler.divisor() * 1000)).saturating_sub(1)
    }

    /// Reject settings the timers cannot realize exactly
    pub fn validate(&self) -> Result<(), HalError> {
        if self.cpu_hz < 1_000_000 || self.cpu_hz % 1_000_000 != 0 {
            return Err(HalError::InvalidConfig);
        }
        let cycles_per_micro = self.cpu_hz / 1_000_000;
        if self.tick_prescaler.divisor() % cycles_per_micro != 0 || self.micros_per_tick() == 0 {
            return Err(HalError::InvalidConfig);
        }
        let millis_divisor = self.millis_prescaler.divisor() * 1000;
        if self.cpu_hz % millis_divisor != 0 {
            return Err(HalError::InvalidConfig);
        }
        let compare = self.millis_compare_value();
        if compare == 0 || compare > u32::from(u16::MAX) {
            return Err(HalError::InvalidConfig);
        }
        Ok(())
    }
}

/// UART configuration (always 8N1)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { baud: 9600 }
    }
}

impl SerialConfig {
    /// UBRR0 for normal-speed asynchronous mode
    pub fn baud_register(&self, cpu_hz: u32) -> Result<u16, HalError> {
        if self.baud == 0 {
            return Err(HalError::InvalidConfig);
        }
        let divisor = (cpu_hz / 16 / self.baud)
            .checked_sub(1)
            .ok_or(HalError::InvalidConfig)?;
        u16::try_from(divisor)
            .ok()
            .filter(|ubrr| *ubrr <= 0x0FFF)
            .ok_or(HalError::InvalidConfig)
    }
}

/// Complete board configuration
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    pub clock: ClockConfig,
    pub serial: SerialConfig,
}
