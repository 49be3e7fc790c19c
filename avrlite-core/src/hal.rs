//! Register-level hardware abstraction for the ATmega328P
//!
//! Every peripheral in this crate is driven through [`RegisterAccess`], so the
//! same clock/PWM/GPIO code runs against real memory-mapped registers on the
//! target and against [`mock::MockMcu`] on the host.

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
    /// ADC conversion flag never cleared
    ConversionTimeout,
    /// Operation requires an enabled PWM channel
    ChannelDisabled,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::NotInitialized => write!(f, "Hardware not initialized"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
            HalError::ConversionTimeout => write!(f, "ADC conversion timed out"),
            HalError::ChannelDisabled => write!(f, "PWM channel is disabled"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Memory-mapped 8-bit registers, by data-space address
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    Pinb = 0x23,
    Ddrb = 0x24,
    Portb = 0x25,
    Pinc = 0x26,
    Ddrc = 0x27,
    Portc = 0x28,
    Pind = 0x29,
    Ddrd = 0x2A,
    Portd = 0x2B,
    Tifr0 = 0x35,
    Tifr1 = 0x36,
    Tifr2 = 0x37,
    Tccr0a = 0x44,
    Tccr0b = 0x45,
    Tcnt0 = 0x46,
    Ocr0a = 0x47,
    Ocr0b = 0x48,
    Sreg = 0x5F,
    Timsk0 = 0x6E,
    Timsk1 = 0x6F,
    Timsk2 = 0x70,
    Adcl = 0x78,
    Adch = 0x79,
    Adcsra = 0x7A,
    Adcsrb = 0x7B,
    Admux = 0x7C,
    Tccr1a = 0x80,
    Tccr1b = 0x81,
    Tccr1c = 0x82,
    Tcnt1l = 0x84,
    Tcnt1h = 0x85,
    Ocr1al = 0x88,
    Ocr1ah = 0x89,
    Ocr1bl = 0x8A,
    Ocr1bh = 0x8B,
    Tccr2a = 0xB0,
    Tccr2b = 0xB1,
    Tcnt2 = 0xB2,
    Ocr2a = 0xB3,
    Ocr2b = 0xB4,
    Ucsr0a = 0xC0,
    Ucsr0b = 0xC1,
    Ucsr0c = 0xC2,
    Ubrr0l = 0xC4,
    Ubrr0h = 0xC5,
    Udr0 = 0xC6,
}

impl Register {
    /// Data-space address of this register
    pub const fn addr(self) -> usize {
        self as usize
    }
}

/// 16-bit registers accessed through the shared TEMP byte
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register16 {
    Tcnt1,
    Ocr1a,
    Ocr1b,
    Adc,
}

impl Register16 {
    pub const fn low(self) -> Register {
        match self {
            Register16::Tcnt1 => Register::Tcnt1l,
            Register16::Ocr1a => Register::Ocr1al,
            Register16::Ocr1b => Register::Ocr1bl,
            Register16::Adc => Register::Adcl,
        }
    }

    pub const fn high(self) -> Register {
        match self {
            Register16::Tcnt1 => Register::Tcnt1h,
            Register16::Ocr1a => Register::Ocr1ah,
            Register16::Ocr1b => Register::Ocr1bh,
            Register16::Adc => Register::Adch,
        }
    }
}

/// Bit positions of the register fields this crate touches
pub mod bits {
    // SREG
    pub const SREG_I: u8 = 7;

    // TCCR0A / TCCR0B / TIMSK0 / TIFR0
    pub const WGM00: u8 = 0;
    pub const WGM01: u8 = 1;
    pub const COM0B1: u8 = 5;
    pub const COM0A1: u8 = 7;
    pub const CS00: u8 = 0;
    pub const CS01: u8 = 1;
    pub const CS02: u8 = 2;
    pub const TOIE0: u8 = 0;
    pub const TOV0: u8 = 0;

    // TCCR1A / TCCR1B / TIMSK1 / TIFR1
    pub const WGM10: u8 = 0;
    pub const WGM11: u8 = 1;
    pub const COM1B1: u8 = 5;
    pub const COM1A1: u8 = 7;
    pub const CS10: u8 = 0;
    pub const CS11: u8 = 1;
    pub const CS12: u8 = 2;
    pub const WGM12: u8 = 3;
    pub const WGM13: u8 = 4;
    pub const OCIE1A: u8 = 1;
    pub const OCF1A: u8 = 1;

    // TCCR2A / TCCR2B
    pub const WGM20: u8 = 0;
    pub const WGM21: u8 = 1;
    pub const COM2B1: u8 = 5;
    pub const COM2A1: u8 = 7;
    pub const CS20: u8 = 0;
    pub const CS21: u8 = 1;
    pub const CS22: u8 = 2;

    // ADMUX / ADCSRA
    pub const REFS0: u8 = 6;
    pub const ADEN: u8 = 7;
    pub const ADSC: u8 = 6;
    pub const ADPS2: u8 = 2;
    pub const ADPS1: u8 = 1;
    pub const ADPS0: u8 = 0;

    // UCSR0A / UCSR0B / UCSR0C
    pub const UDRE0: u8 = 5;
    pub const RXEN0: u8 = 4;
    pub const TXEN0: u8 = 3;
    pub const UCSZ01: u8 = 2;
    pub const UCSZ00: u8 = 1;

    /// Mask with a single bit set
    pub const fn bv(bit: u8) -> u8 {
        1 << bit
    }
}

/// Trait for raw peripheral register access
pub trait RegisterAccess {
    /// Read an 8-bit register
    fn read(&self, reg: Register) -> u8;

    /// Write an 8-bit register
    fn write(&mut self, reg: Register, value: u8);

    /// Read-modify-write
    fn modify<F>(&mut self, reg: Register, f: F)
    where
        F: FnOnce(u8) -> u8,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// OR `mask` into the register, leaving other bits alone
    fn set_bits(&mut self, reg: Register, mask: u8) {
        self.modify(reg, |v| v | mask);
    }

    /// Clear `mask` in the register, leaving other bits alone
    fn clear_bits(&mut self, reg: Register, mask: u8) {
        self.modify(reg, |v| v & !mask);
    }

    /// Read a 16-bit register (low byte latches the high byte)
    fn read_u16(&self, reg: Register16) -> u16 {
        let low = self.read(reg.low());
        let high = self.read(reg.high());
        u16::from_le_bytes([low, high])
    }

    /// Write a 16-bit register (high byte goes to TEMP first)
    fn write_u16(&mut self, reg: Register16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write(reg.high(), high);
        self.write(reg.low(), low);
    }
}

/// Volatile access to the real register file
///
/// Zero-sized and `Copy`: each peripheral driver holds its own handle and
/// touches only the registers it owns.
#[derive(Copy, Clone, Debug)]
pub struct MmioRegisters {
    _private: (),
}

static MMIO_TAKEN: portable_atomic::AtomicBool = portable_atomic::AtomicBool::new(false);

impl MmioRegisters {
    /// Take the register file once. Returns `None` on every later call.
    pub fn take() -> Option<Self> {
        if MMIO_TAKEN.swap(true, portable_atomic::Ordering::AcqRel) {
            None
        } else {
            Some(Self { _private: () })
        }
    }

    /// Create a handle without the ownership check
    ///
    /// # Safety
    /// Only valid on the ATmega328P; the caller guarantees no other code
    /// reconfigures the same registers behind this handle's back.
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for MmioRegisters {
    #[inline(always)]
    fn read(&self, reg: Register) -> u8 {
        // SAFETY: `Register` only names valid ATmega328P I/O addresses.
        unsafe { core::ptr::read_volatile(reg.addr() as *const u8) }
    }

    #[inline(always)]
    fn write(&mut self, reg: Register, value: u8) {
        // SAFETY: as above.
        unsafe { core::ptr::write_volatile(reg.addr() as *mut u8, value) }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Simulated ATmega328P for host testing
    //!
    //! Models the register file, timer0 (8-bit, overflow flag), timer1
    //! (16-bit, normal/CTC/8-bit PWM top, compare A flag), interrupt delivery
    //! gated by `SREG.I`, the ADC and the UART transmitter. Time only moves
    //! when [`MockMcu::advance_micros`] or a [`DelayNs`] call says so.

    use super::bits::*;
    use super::*;
    use crate::clock::ClockCounters;
    use core::cell::{Cell, RefCell};
    use embedded_hal::delay::DelayNs;
    use std::vec::Vec;

    const REGISTER_SPACE: usize = 0x100;
    const DEFAULT_CPU_HZ: u32 = 16_000_000;

    pub struct MockMcu {
        regs: RefCell<[u8; REGISTER_SPACE]>,
        cpu_hz: u32,
        cycles: Cell<u64>,
        timer0_residual: Cell<u64>,
        timer1_residual: Cell<u64>,
        counters: ClockCounters,
        adc_inputs: RefCell<[u16; 8]>,
        adc_stalled: Cell<bool>,
        uart_tx: RefCell<Vec<u8>>,
    }

    impl Default for MockMcu {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockMcu {
        pub fn new() -> Self {
            Self::with_cpu_hz(DEFAULT_CPU_HZ)
        }

        pub fn with_cpu_hz(cpu_hz: u32) -> Self {
            let mut regs = [0u8; REGISTER_SPACE];
            // Reset value: transmit buffer empty
            regs[Register::Ucsr0a.addr()] = bv(UDRE0);
            Self {
                regs: RefCell::new(regs),
                cpu_hz,
                cycles: Cell::new(0),
                timer0_residual: Cell::new(0),
                timer1_residual: Cell::new(0),
                counters: ClockCounters::new(),
                adc_inputs: RefCell::new([0; 8]),
                adc_stalled: Cell::new(false),
                uart_tx: RefCell::new(Vec::new()),
            }
        }

        /// Counters advanced by the simulated interrupt handlers
        pub fn counters(&self) -> &ClockCounters {
            &self.counters
        }

        /// Raw register value, bypassing read side effects
        pub fn peek(&self, reg: Register) -> u8 {
            self.regs.borrow()[reg.addr()]
        }

        /// Raw register store, bypassing write side effects
        pub fn poke(&self, reg: Register, value: u8) {
            self.regs.borrow_mut()[reg.addr()] = value;
        }

        /// Simulated CPU cycles since construction
        pub fn cycles(&self) -> u64 {
            self.cycles.get()
        }

        /// Simulated wall time in microseconds since construction
        pub fn now_micros(&self) -> u64 {
            self.cycles.get() * 1_000_000 / u64::from(self.cpu_hz)
        }

        pub fn interrupts_enabled(&self) -> bool {
            self.peek(Register::Sreg) & bv(SREG_I) != 0
        }

        /// Clear `SREG.I`; flags keep latching but no handler runs
        pub fn mask_interrupts(&self) {
            self.regs.borrow_mut()[Register::Sreg.addr()] &= !bv(SREG_I);
        }

        /// Set `SREG.I` and service whatever became pending meanwhile
        pub fn unmask_interrupts(&self) {
            self.regs.borrow_mut()[Register::Sreg.addr()] |= bv(SREG_I);
            self.service_interrupts();
        }

        /// Drive an external level onto an input pin
        pub fn set_input(&self, port_pin: Register, bit: u8, high: bool) {
            let mut regs = self.regs.borrow_mut();
            if high {
                regs[port_pin.addr()] |= bv(bit);
            } else {
                regs[port_pin.addr()] &= !bv(bit);
            }
        }

        /// Value the ADC returns for `channel`
        pub fn set_analog_input(&self, channel: u8, value: u16) {
            self.adc_inputs.borrow_mut()[usize::from(channel & 0x07)] = value & 0x03FF;
        }

        /// Make conversions hang with ADSC stuck high
        pub fn stall_adc(&self, stalled: bool) {
            self.adc_stalled.set(stalled);
        }

        /// Bytes written to UDR0 so far
        pub fn uart_output(&self) -> Vec<u8> {
            self.uart_tx.borrow().clone()
        }

        pub fn uart_output_string(&self) -> String {
            String::from_utf8_lossy(&self.uart_tx.borrow()).into_owned()
        }

        pub fn advance_micros(&self, micros: u64) {
            self.advance_cycles(micros * u64::from(self.cpu_hz) / 1_000_000);
        }

        /// Run the timers for `cycles` CPU cycles, one timer clock at a time
        pub fn advance_cycles(&self, cycles: u64) {
            self.cycles.set(self.cycles.get() + cycles);

            if let Some(divider) = clock_divider(self.peek(Register::Tccr0b)) {
                let total = self.timer0_residual.get() + cycles;
                self.timer0_residual.set(total % divider);
                for _ in 0..total / divider {
                    self.tick_timer0();
                    self.service_interrupts();
                }
            }

            if let Some(divider) = clock_divider(self.peek(Register::Tccr1b)) {
                let total = self.timer1_residual.get() + cycles;
                self.timer1_residual.set(total % divider);
                for _ in 0..total / divider {
                    self.tick_timer1();
                    self.service_interrupts();
                }
            }
        }

        fn tick_timer0(&self) {
            let mut regs = self.regs.borrow_mut();
            let next = regs[Register::Tcnt0.addr()].wrapping_add(1);
            regs[Register::Tcnt0.addr()] = next;
            if next == 0 {
                regs[Register::Tifr0.addr()] |= bv(TOV0);
            }
        }

        fn tick_timer1(&self) {
            let mut regs = self.regs.borrow_mut();
            let read16 = |regs: &[u8; REGISTER_SPACE], reg: Register16| {
                u16::from_le_bytes([regs[reg.low().addr()], regs[reg.high().addr()]])
            };

            let tccr1a = regs[Register::Tccr1a.addr()];
            let tccr1b = regs[Register::Tccr1b.addr()];
            let compare = read16(&*regs, Register16::Ocr1a);
            let top = if tccr1a & bv(WGM10) != 0 {
                0x00FF
            } else if tccr1b & bv(WGM12) != 0 {
                compare
            } else {
                0xFFFF
            };

            let count = read16(&*regs, Register16::Tcnt1);
            let next = if count >= top { 0 } else { count + 1 };
            let [low, high] = next.to_le_bytes();
            regs[Register::Tcnt1l.addr()] = low;
            regs[Register::Tcnt1h.addr()] = high;

            if next == compare {
                regs[Register::Tifr1.addr()] |= bv(OCF1A);
            }
        }

        fn service_interrupts(&self) {
            let (overflow, compare) = {
                let mut regs = self.regs.borrow_mut();
                if regs[Register::Sreg.addr()] & bv(SREG_I) == 0 {
                    return;
                }
                let overflow = regs[Register::Timsk0.addr()] & bv(TOIE0) != 0
                    && regs[Register::Tifr0.addr()] & bv(TOV0) != 0;
                if overflow {
                    regs[Register::Tifr0.addr()] &= !bv(TOV0);
                }
                let compare = regs[Register::Timsk1.addr()] & bv(OCIE1A) != 0
                    && regs[Register::Tifr1.addr()] & bv(OCF1A) != 0;
                if compare {
                    regs[Register::Tifr1.addr()] &= !bv(OCF1A);
                }
                (overflow, compare)
            };

            if overflow {
                self.counters.on_tick_overflow();
            }
            if compare {
                self.counters.on_millis_compare();
            }
        }

        fn start_conversion(&self, adcsra: u8) -> u8 {
            if adcsra & bv(ADEN) == 0 || self.adc_stalled.get() {
                return adcsra;
            }
            let channel = self.peek(Register::Admux) & 0x07;
            let [low, high] = self.adc_inputs.borrow()[usize::from(channel)].to_le_bytes();
            self.poke(Register::Adcl, low);
            self.poke(Register::Adch, high);
            adcsra & !bv(ADSC)
        }

        fn pin_read(&self, pin: Register, ddr: Register, port: Register) -> u8 {
            let regs = self.regs.borrow();
            let outputs = regs[ddr.addr()];
            (regs[port.addr()] & outputs) | (regs[pin.addr()] & !outputs)
        }
    }

    /// CPU cycles per timer clock for a CSn2:0 field
    fn clock_divider(control_b: u8) -> Option<u64> {
        match control_b & 0x07 {
            1 => Some(1),
            2 => Some(8),
            3 => Some(64),
            4 => Some(256),
            5 => Some(1024),
            _ => None,
        }
    }

    impl RegisterAccess for &MockMcu {
        fn read(&self, reg: Register) -> u8 {
            match reg {
                Register::Pinb => self.pin_read(Register::Pinb, Register::Ddrb, Register::Portb),
                Register::Pinc => self.pin_read(Register::Pinc, Register::Ddrc, Register::Portc),
                Register::Pind => self.pin_read(Register::Pind, Register::Ddrd, Register::Portd),
                _ => self.peek(reg),
            }
        }

        fn write(&mut self, reg: Register, value: u8) {
            match reg {
                // Writing one to PINx toggles PORTx
                Register::Pinb => self.poke(Register::Portb, self.peek(Register::Portb) ^ value),
                Register::Pinc => self.poke(Register::Portc, self.peek(Register::Portc) ^ value),
                Register::Pind => self.poke(Register::Portd, self.peek(Register::Portd) ^ value),
                // Interrupt flags clear by writing one
                Register::Tifr0 | Register::Tifr1 | Register::Tifr2 => {
                    self.poke(reg, self.peek(reg) & !value)
                }
                Register::Adcsra => {
                    let stored = if value & bv(ADSC) != 0 {
                        self.start_conversion(value)
                    } else {
                        value
                    };
                    self.poke(reg, stored);
                }
                Register::Udr0 => self.uart_tx.borrow_mut().push(value),
                Register::Sreg => {
                    self.poke(reg, value);
                    self.service_interrupts();
                }
                _ => self.poke(reg, value),
            }
        }
    }

    impl DelayNs for &MockMcu {
        fn delay_ns(&mut self, ns: u32) {
            let cycles = (u64::from(ns) * u64::from(self.cpu_hz)).div_ceil(1_000_000_000);
            self.advance_cycles(cycles);
        }
    }
}
