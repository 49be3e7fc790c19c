//! Core data types shared by the GPIO and PWM drivers

use crate::config::ClockConfig;
use crate::hal::bits::*;
use crate::hal::{Register, Register16};
use crate::pins::Pin;

/// Pin direction
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// High-impedance input
    Input,
    /// Input with the internal pull-up enabled
    InputPullUp,
    /// Push-pull output
    Output,
}

/// Digital logic level
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl core::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Timers that can generate PWM
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmTimer {
    /// 8-bit, shared with the microsecond tick counter
    Timer0,
    /// 16-bit, shared with the millisecond compare counter
    Timer1,
    /// 8-bit, free for PWM
    Timer2,
}

impl PwmTimer {
    pub const fn control_a(self) -> Register {
        match self {
            PwmTimer::Timer0 => Register::Tccr0a,
            PwmTimer::Timer1 => Register::Tccr1a,
            PwmTimer::Timer2 => Register::Tccr2a,
        }
    }

    pub const fn control_b(self) -> Register {
        match self {
            PwmTimer::Timer0 => Register::Tccr0b,
            PwmTimer::Timer1 => Register::Tccr1b,
            PwmTimer::Timer2 => Register::Tccr2b,
        }
    }

    /// Waveform bits in TCCRnA shared by both channels (fast PWM, TOP = 0xFF)
    pub const fn shared_mode_a(self) -> u8 {
        match self {
            PwmTimer::Timer0 => bv(WGM00) | bv(WGM01),
            PwmTimer::Timer1 => bv(WGM10),
            PwmTimer::Timer2 => bv(WGM20) | bv(WGM21),
        }
    }

    /// Waveform and clock-select bits in TCCRnB shared by both channels
    ///
    /// Timer0 and timer1 reuse the clock-select the monotonic clock programmed
    /// from `clock`, so OR-ing these in never changes their rate. Timer2 runs
    /// at /8.
    pub const fn shared_mode_b(self, clock: &ClockConfig) -> u8 {
        match self {
            PwmTimer::Timer0 => clock.tick_prescaler.clock_select(),
            PwmTimer::Timer1 => bv(WGM12) | clock.millis_prescaler.clock_select(),
            PwmTimer::Timer2 => bv(CS21),
        }
    }
}

/// Compare unit of a timer
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompareOutput {
    A,
    B,
}

/// The six PWM-capable pins
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmChannel {
    /// OC2B
    D3,
    /// OC0B
    D5,
    /// OC0A
    D6,
    /// OC1A
    D9,
    /// OC1B
    D10,
    /// OC2A
    D11,
}

impl PwmChannel {
    pub const ALL: [PwmChannel; 6] = [
        PwmChannel::D3,
        PwmChannel::D5,
        PwmChannel::D6,
        PwmChannel::D9,
        PwmChannel::D10,
        PwmChannel::D11,
    ];

    /// PWM channel driving `pin`, if it has one
    pub const fn from_pin(pin: Pin) -> Option<PwmChannel> {
        match pin.number() {
            3 => Some(PwmChannel::D3),
            5 => Some(PwmChannel::D5),
            6 => Some(PwmChannel::D6),
            9 => Some(PwmChannel::D9),
            10 => Some(PwmChannel::D10),
            11 => Some(PwmChannel::D11),
            _ => None,
        }
    }

    pub const fn pin(self) -> Pin {
        match self {
            PwmChannel::D3 => Pin::D3,
            PwmChannel::D5 => Pin::D5,
            PwmChannel::D6 => Pin::D6,
            PwmChannel::D9 => Pin::D9,
            PwmChannel::D10 => Pin::D10,
            PwmChannel::D11 => Pin::D11,
        }
    }

    pub const fn timer(self) -> PwmTimer {
        match self {
            PwmChannel::D5 | PwmChannel::D6 => PwmTimer::Timer0,
            PwmChannel::D9 | PwmChannel::D10 => PwmTimer::Timer1,
            PwmChannel::D3 | PwmChannel::D11 => PwmTimer::Timer2,
        }
    }

    pub const fn output(self) -> CompareOutput {
        match self {
            PwmChannel::D6 | PwmChannel::D9 | PwmChannel::D11 => CompareOutput::A,
            PwmChannel::D3 | PwmChannel::D5 | PwmChannel::D10 => CompareOutput::B,
        }
    }

    /// The other channel on the same timer
    pub const fn sibling(self) -> PwmChannel {
        match self {
            PwmChannel::D5 => PwmChannel::D6,
            PwmChannel::D6 => PwmChannel::D5,
            PwmChannel::D9 => PwmChannel::D10,
            PwmChannel::D10 => PwmChannel::D9,
            PwmChannel::D3 => PwmChannel::D11,
            PwmChannel::D11 => PwmChannel::D3,
        }
    }

    /// Non-inverting compare-output bit in TCCRnA, owned by this channel alone
    pub const fn compare_enable(self) -> u8 {
        match self {
            PwmChannel::D6 => bv(COM0A1),
            PwmChannel::D5 => bv(COM0B1),
            PwmChannel::D9 => bv(COM1A1),
            PwmChannel::D10 => bv(COM1B1),
            PwmChannel::D11 => bv(COM2A1),
            PwmChannel::D3 => bv(COM2B1),
        }
    }

    /// Output-compare register holding this channel's duty value
    pub const fn duty_register(self) -> DutyRegister {
        match self {
            PwmChannel::D6 => DutyRegister::Byte(Register::Ocr0a),
            PwmChannel::D5 => DutyRegister::Byte(Register::Ocr0b),
            PwmChannel::D9 => DutyRegister::Word(Register16::Ocr1a),
            PwmChannel::D10 => DutyRegister::Word(Register16::Ocr1b),
            PwmChannel::D11 => DutyRegister::Byte(Register::Ocr2a),
            PwmChannel::D3 => DutyRegister::Byte(Register::Ocr2b),
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Output-compare register of a channel
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DutyRegister {
    /// 8-bit timers
    Byte(Register),
    /// Timer1, written through TEMP so the high byte is cleared too
    Word(Register16),
}

/// Per-channel PWM state
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    #[default]
    Disabled,
    Enabled(u8),
}

impl ChannelState {
    pub const fn is_enabled(&self) -> bool {
        matches!(self, ChannelState::Enabled(_))
    }

    pub const fn duty(&self) -> Option<u8> {
        match self {
            ChannelState::Enabled(duty) => Some(*duty),
            ChannelState::Disabled => None,
        }
    }
}
