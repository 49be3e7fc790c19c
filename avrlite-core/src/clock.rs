//! Interrupt-driven monotonic clock
//!
//! Timer0 free-runs and its overflow interrupt counts ticks of 256 timer
//! clocks; timer1 runs in CTC mode and its compare-A interrupt counts
//! milliseconds. The interrupt handlers only increment [`ClockCounters`];
//! every read from the main context happens inside a critical section that
//! restores the previous interrupt state on exit.

use core::cell::Cell;

use critical_section::{CriticalSection, Mutex};
use embedded_hal::delay::DelayNs;

use crate::config::ClockConfig;
use crate::hal::bits::*;
use crate::hal::{HalError, Register, Register16, RegisterAccess};

/// Counters shared between the timer interrupts and the main context
///
/// In firmware this lives in a `static` so the interrupt vectors can reach it.
pub struct ClockCounters {
    ticks: Mutex<Cell<u32>>,
    millis: Mutex<Cell<u32>>,
}

impl ClockCounters {
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(Cell::new(0)),
            millis: Mutex::new(Cell::new(0)),
        }
    }

    /// Timer0 overflow handler body
    pub fn on_tick_overflow(&self) {
        critical_section::with(|cs| {
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().wrapping_add(1));
        });
    }

    /// Timer1 compare-match A handler body
    pub fn on_millis_compare(&self) {
        critical_section::with(|cs| {
            let millis = self.millis.borrow(cs);
            millis.set(millis.get().wrapping_add(1));
        });
    }

    /// Zero both counters
    pub fn reset(&self) {
        critical_section::with(|cs| {
            self.ticks.borrow(cs).set(0);
            self.millis.borrow(cs).set(0);
        });
    }

    /// Preload both counters, e.g. to test wraparound
    #[cfg(feature = "test-utils")]
    pub fn preset(&self, ticks: u32, millis: u32) {
        critical_section::with(|cs| {
            self.ticks.borrow(cs).set(ticks);
            self.millis.borrow(cs).set(millis);
        });
    }

    fn ticks(&self, cs: CriticalSection<'_>) -> u32 {
        self.ticks.borrow(cs).get()
    }

    fn millis(&self, cs: CriticalSection<'_>) -> u32 {
        self.millis.borrow(cs).get()
    }
}

impl Default for ClockCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Elapsed-time reads and busy-wait delays
///
/// `R` reaches the timer registers, `D` supplies the one-microsecond spin
/// granule the sleeps are built from.
pub struct MonotonicClock<'c, R, D> {
    counters: &'c ClockCounters,
    regs: R,
    spin: D,
    config: ClockConfig,
}

impl<'c, R, D> MonotonicClock<'c, R, D>
where
    R: RegisterAccess,
    D: DelayNs,
{
    /// Wrap already-started timers. See [`MonotonicClock::start`].
    ///
    /// Rejects a `config` that [`ClockConfig::validate`] refuses.
    pub fn new(
        counters: &'c ClockCounters,
        regs: R,
        spin: D,
        config: ClockConfig,
    ) -> Result<Self, HalError> {
        config.validate()?;
        Ok(Self {
            counters,
            regs,
            spin,
            config,
        })
    }

    /// Configure both timers, zero the counters and unmask the two
    /// interrupt sources. Global interrupts are left to the caller.
    ///
    /// An invalid `config` is rejected before any register is touched.
    pub fn start(
        counters: &'c ClockCounters,
        regs: R,
        spin: D,
        config: ClockConfig,
    ) -> Result<Self, HalError> {
        let mut clock = Self::new(counters, regs, spin, config)?;
        clock.configure_timers();
        Ok(clock)
    }

    fn configure_timers(&mut self) {
        critical_section::with(|_| {
            let regs = &mut self.regs;

            // Timer0: normal mode, free running, overflow every 256 ticks
            regs.write(Register::Tccr0a, 0);
            regs.write(Register::Tccr0b, 0);
            regs.write(Register::Tcnt0, 0);
            regs.write(Register::Tifr0, bv(TOV0));
            regs.write(Register::Tccr0b, self.config.tick_prescaler.clock_select());

            // Timer1: CTC on OCR1A, one compare match per millisecond
            regs.write(Register::Tccr1a, 0);
            regs.write(Register::Tccr1b, 0);
            regs.write_u16(Register16::Tcnt1, 0);
            let compare = u16::try_from(self.config.millis_compare_value()).unwrap_or(u16::MAX);
            regs.write_u16(Register16::Ocr1a, compare);
            regs.write(Register::Tifr1, bv(OCF1A));
            regs.write(
                Register::Tccr1b,
                bv(WGM12) | self.config.millis_prescaler.clock_select(),
            );

            self.counters.reset();

            regs.set_bits(Register::Timsk0, bv(TOIE0));
            regs.set_bits(Register::Timsk1, bv(OCIE1A));
        });
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Milliseconds since start, wrapping after ~49.7 days
    pub fn elapsed_millis(&self) -> u32 {
        critical_section::with(|cs| self.counters.millis(cs))
    }

    /// Microseconds since start, wrapping after ~71.6 minutes
    ///
    /// Resolution is one tick (4 µs at 16 MHz, /64).
    pub fn elapsed_micros(&self) -> u32 {
        let (overflows, sub_tick) = critical_section::with(|cs| {
            let mut overflows = self.counters.ticks(cs);
            let sub_tick = self.regs.read(Register::Tcnt0);
            // The counter wrapped but the handler is held off by the mask:
            // the low sub-tick value already belongs to the next overflow.
            if self.regs.read(Register::Tifr0) & bv(TOV0) != 0 && sub_tick < u8::MAX {
                overflows = overflows.wrapping_add(1);
            }
            (overflows, sub_tick)
        });

        let ticks = (overflows << 8).wrapping_add(u32::from(sub_tick));
        ticks.wrapping_mul(self.config.micros_per_tick())
    }

    /// Busy-wait at least `ms` milliseconds
    ///
    /// Must be called with interrupts enabled; the wait is measured against
    /// [`elapsed_micros`](Self::elapsed_micros) one millisecond at a time.
    pub fn sleep_millis(&mut self, ms: u32) {
        let mut remaining = ms;
        let mut start = self.elapsed_micros();

        while remaining > 0 {
            self.spin.delay_us(1);
            while remaining > 0 && self.elapsed_micros().wrapping_sub(start) >= 1000 {
                remaining -= 1;
                start = start.wrapping_add(1000);
            }
        }
    }

    /// Busy-wait `us` microseconds in one-microsecond granules
    ///
    /// No clock correction: loop overhead accumulates, so keep this for
    /// short sub-millisecond waits.
    pub fn sleep_micros(&mut self, us: u32) {
        for _ in 0..us {
            self.spin.delay_us(1);
        }
    }
}

impl<R, D> DelayNs for MonotonicClock<'_, R, D>
where
    R: RegisterAccess,
    D: DelayNs,
{
    fn delay_ns(&mut self, ns: u32) {
        self.sleep_micros(ns.div_ceil(1000));
    }

    fn delay_us(&mut self, us: u32) {
        if us >= 1000 {
            self.sleep_millis(us / 1000);
            self.sleep_micros(us % 1000);
        } else {
            self.sleep_micros(us);
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleep_millis(ms);
    }
}
