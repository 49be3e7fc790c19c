//! Digital I/O and blocking analog reads by logical pin

use crate::hal::bits::*;
use crate::hal::{HalError, Register, Register16, RegisterAccess};
use crate::pins::{pin_to_port_and_bit, AnalogPin, Pin};
use crate::types::{Level, PinMode};

/// Polls of ADSC before a conversion is declared failed
///
/// A conversion takes 13 ADC clocks (~104 µs at /128); this is far beyond that.
pub const ADC_TIMEOUT_POLLS: u32 = 100_000;

/// ADC clock /128: 125 kHz at 16 MHz
const ADC_PRESCALER: u8 = bv(ADPS2) | bv(ADPS1) | bv(ADPS0);

pub struct Gpio<R> {
    regs: R,
}

impl<R: RegisterAccess> Gpio<R> {
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Power up the ADC with AVcc reference
    pub fn enable_adc(&mut self) {
        self.regs.write(Register::Adcsra, bv(ADEN) | ADC_PRESCALER);
    }

    pub fn set_mode(&mut self, pin: Pin, mode: PinMode) {
        let desc = pin_to_port_and_bit(pin);
        let mask = desc.mask();
        match mode {
            PinMode::Output => self.regs.set_bits(desc.port.ddr(), mask),
            PinMode::Input => {
                self.regs.clear_bits(desc.port.ddr(), mask);
                self.regs.clear_bits(desc.port.port(), mask);
            }
            PinMode::InputPullUp => {
                self.regs.clear_bits(desc.port.ddr(), mask);
                self.regs.set_bits(desc.port.port(), mask);
            }
        }
    }

    pub fn write(&mut self, pin: Pin, level: Level) {
        let desc = pin_to_port_and_bit(pin);
        match level {
            Level::High => self.regs.set_bits(desc.port.port(), desc.mask()),
            Level::Low => self.regs.clear_bits(desc.port.port(), desc.mask()),
        }
    }

    pub fn read(&self, pin: Pin) -> Level {
        let desc = pin_to_port_and_bit(pin);
        Level::from(self.regs.read(desc.port.pin()) & desc.mask() != 0)
    }

    /// Flip an output in one write (PINx toggle)
    pub fn toggle(&mut self, pin: Pin) {
        let desc = pin_to_port_and_bit(pin);
        self.regs.write(desc.port.pin(), desc.mask());
    }

    /// 10-bit conversion of `pin` against AVcc
    pub fn analog_read(&mut self, pin: AnalogPin) -> Result<u16, HalError> {
        if self.regs.read(Register::Adcsra) & bv(ADEN) == 0 {
            return Err(HalError::NotInitialized);
        }

        self.regs.write(Register::Admux, bv(REFS0) | (pin.channel() & 0x07));
        self.regs.set_bits(Register::Adcsra, bv(ADSC));

        for _ in 0..ADC_TIMEOUT_POLLS {
            if self.regs.read(Register::Adcsra) & bv(ADSC) == 0 {
                return Ok(self.regs.read_u16(Register16::Adc));
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("adc conversion on {} timed out", pin);
        Err(HalError::ConversionTimeout)
    }
}
