//! Startup sequencing and the owned peripheral context

use embedded_hal::delay::DelayNs;

use crate::clock::{ClockCounters, MonotonicClock};
use crate::config::BoardConfig;
use crate::gpio::Gpio;
use crate::hal::bits::*;
use crate::hal::{HalError, Register, RegisterAccess};
use crate::pwm::PwmMultiplexer;
use crate::serial::Serial;

/// Every driver, initialized and ready
///
/// Pass this (or its fields) to application code instead of reaching for
/// globals; only the interrupt vectors touch [`ClockCounters`] directly.
pub struct Board<'c, R, D> {
    pub clock: MonotonicClock<'c, R, D>,
    pub pwm: PwmMultiplexer<R>,
    pub gpio: Gpio<R>,
    pub serial: Serial<R>,
}

impl<'c, R, D> Board<'c, R, D>
where
    R: RegisterAccess + Copy,
    D: DelayNs,
{
    /// Bring the board up with interrupts masked, then enable them last
    ///
    /// Must be called once, before anything else reads the clock.
    pub fn init(
        regs: R,
        spin: D,
        counters: &'c ClockCounters,
        config: BoardConfig,
    ) -> Result<Self, HalError> {
        config.clock.validate()?;
        config.serial.baud_register(config.clock.cpu_hz)?;

        let mut sreg = regs;
        sreg.clear_bits(Register::Sreg, bv(SREG_I));

        let clock = MonotonicClock::start(counters, regs, spin, config.clock)?;
        let pwm = PwmMultiplexer::new(regs, config.clock);

        let mut gpio = Gpio::new(regs);
        gpio.enable_adc();

        let mut serial = Serial::new(regs, config.clock.cpu_hz);
        serial.begin(config.serial)?;

        sreg.set_bits(Register::Sreg, bv(SREG_I));

        #[cfg(feature = "defmt")]
        defmt::info!(
            "board up: {} Hz, {} us/tick, {} baud",
            config.clock.cpu_hz,
            config.clock.micros_per_tick(),
            config.serial.baud
        );

        Ok(Self {
            clock,
            pwm,
            gpio,
            serial,
        })
    }
}
