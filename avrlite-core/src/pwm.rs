//! PWM on the six output-compare pins, two channels per timer
//!
//! A timer's waveform-generation and clock-select bits are shared by both of
//! its channels, so they are only ever OR-ed in. Each channel owns its
//! compare-output bit and its duty register, and nothing else. Timer0 and
//! timer1 also drive the monotonic clock, so their clock-select bits come
//! from the same [`ClockConfig`].

use crate::config::ClockConfig;
use crate::hal::{HalError, Register, Register16, RegisterAccess};
use crate::types::{ChannelState, DutyRegister, PwmChannel, PwmTimer};

/// Largest representable duty value on every channel
pub const MAX_DUTY: u8 = u8::MAX;

/// Enable/disable/set-duty for the six PWM channels
///
/// Timer1 doubles as the millisecond timebase. While D9 or D10 is enabled it
/// runs in 8-bit fast PWM and the compare-A interrupt fires every 256 timer
/// clocks (~1.024 ms at 16 MHz). Once both are disabled again the timer goes
/// back to CTC on the 1 ms compare value. `elapsed_micros` and the sleeps
/// built on it are unaffected either way.
pub struct PwmMultiplexer<R> {
    regs: R,
    clock: ClockConfig,
    channels: [ChannelState; 6],
}

impl<R: RegisterAccess> PwmMultiplexer<R> {
    /// All channels start Disabled with duty 0
    pub fn new(regs: R, clock: ClockConfig) -> Self {
        Self {
            regs,
            clock,
            channels: [ChannelState::Disabled; 6],
        }
    }

    /// Start PWM output on `channel`
    ///
    /// Re-enabling an already enabled channel just updates its duty.
    pub fn enable(&mut self, channel: PwmChannel, duty: u16) {
        let duty = clamp_duty(duty);
        let timer = channel.timer();

        // Shared bits: idempotent, never cleared here
        self.regs.set_bits(timer.control_a(), timer.shared_mode_a());
        self.regs
            .set_bits(timer.control_b(), timer.shared_mode_b(&self.clock));

        self.write_duty(channel, duty);
        self.regs.set_bits(timer.control_a(), channel.compare_enable());
        self.channels[channel.index()] = ChannelState::Enabled(duty);

        #[cfg(feature = "defmt")]
        defmt::debug!("pwm {} enabled, duty {}", channel, duty);
    }

    /// Change the duty of an enabled channel; values above 255 clamp to 255
    pub fn set_duty(&mut self, channel: PwmChannel, duty: u16) -> Result<(), HalError> {
        if !self.channels[channel.index()].is_enabled() {
            return Err(HalError::ChannelDisabled);
        }
        let duty = clamp_duty(duty);
        self.write_duty(channel, duty);
        self.channels[channel.index()] = ChannelState::Enabled(duty);
        Ok(())
    }

    /// Stop PWM output on `channel`; the sibling keeps running
    pub fn disable(&mut self, channel: PwmChannel) {
        let timer = channel.timer();
        self.regs.clear_bits(timer.control_a(), channel.compare_enable());
        self.channels[channel.index()] = ChannelState::Disabled;

        if timer == PwmTimer::Timer1 && !self.state(channel.sibling()).is_enabled() {
            // OCR1A goes back to the clock rather than to zero
            self.regs.write_u16(Register16::Ocr1b, 0);
            self.release_timer1();
        } else {
            self.write_duty(channel, 0);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("pwm {} disabled", channel);
    }

    /// Analog-write semantics: zero disables, anything else enables
    pub fn write(&mut self, channel: PwmChannel, value: u16) {
        if value == 0 {
            self.disable(channel);
        } else {
            self.enable(channel, value);
        }
    }

    pub fn state(&self, channel: PwmChannel) -> ChannelState {
        self.channels[channel.index()]
    }

    /// Last duty written to an enabled channel
    pub fn duty(&self, channel: PwmChannel) -> Option<u8> {
        self.state(channel).duty()
    }

    fn write_duty(&mut self, channel: PwmChannel, duty: u8) {
        match channel.duty_register() {
            DutyRegister::Byte(reg) => self.regs.write(reg, duty),
            DutyRegister::Word(reg) => self.regs.write_u16(reg, u16::from(duty)),
        }
    }

    /// Put timer1 back in CTC on the 1 ms compare value
    fn release_timer1(&mut self) {
        let timer = PwmTimer::Timer1;
        let compare = u16::try_from(self.clock.millis_compare_value()).unwrap_or(u16::MAX);
        self.regs.write_u16(Register16::Ocr1a, compare);
        self.regs.clear_bits(Register::Tccr1a, timer.shared_mode_a());
        // Past the new TOP the counter would run on to 0xFFFF before matching
        if self.regs.read_u16(Register16::Tcnt1) > compare {
            self.regs.write_u16(Register16::Tcnt1, 0);
        }
    }
}

fn clamp_duty(duty: u16) -> u8 {
    u8::try_from(duty).unwrap_or(MAX_DUTY)
}
