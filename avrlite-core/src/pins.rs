//! Logical pin numbering and the static pin → (port, bit) table
//!
//! Digital pins D0..D19; the analog-capable lines A0..A5 are the same
//! physical pins as D14..D19 (PORTC bits 0..5).

use crate::hal::Register;

/// Number of logical pins (D0..D19)
pub const PIN_COUNT: usize = 20;

/// GPIO port of the ATmega328P
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    B,
    C,
    D,
}

impl Port {
    /// Data direction register
    pub const fn ddr(self) -> Register {
        match self {
            Port::B => Register::Ddrb,
            Port::C => Register::Ddrc,
            Port::D => Register::Ddrd,
        }
    }

    /// Output / pull-up register
    pub const fn port(self) -> Register {
        match self {
            Port::B => Register::Portb,
            Port::C => Register::Portc,
            Port::D => Register::Portd,
        }
    }

    /// Input register (writing one toggles the output)
    pub const fn pin(self) -> Register {
        match self {
            Port::B => Register::Pinb,
            Port::C => Register::Pinc,
            Port::D => Register::Pind,
        }
    }
}

/// Physical location of a logical pin
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinDescriptor {
    pub port: Port,
    pub bit: u8,
}

impl PinDescriptor {
    const fn new(port: Port, bit: u8) -> Self {
        Self { port, bit }
    }

    /// Single-bit mask within the port registers
    pub const fn mask(&self) -> u8 {
        1 << self.bit
    }
}

static PIN_TABLE: [PinDescriptor; PIN_COUNT] = [
    // D0..D7
    PinDescriptor::new(Port::D, 0),
    PinDescriptor::new(Port::D, 1),
    PinDescriptor::new(Port::D, 2),
    PinDescriptor::new(Port::D, 3),
    PinDescriptor::new(Port::D, 4),
    PinDescriptor::new(Port::D, 5),
    PinDescriptor::new(Port::D, 6),
    PinDescriptor::new(Port::D, 7),
    // D8..D13
    PinDescriptor::new(Port::B, 0),
    PinDescriptor::new(Port::B, 1),
    PinDescriptor::new(Port::B, 2),
    PinDescriptor::new(Port::B, 3),
    PinDescriptor::new(Port::B, 4),
    PinDescriptor::new(Port::B, 5),
    // D14..D19 == A0..A5
    PinDescriptor::new(Port::C, 0),
    PinDescriptor::new(Port::C, 1),
    PinDescriptor::new(Port::C, 2),
    PinDescriptor::new(Port::C, 3),
    PinDescriptor::new(Port::C, 4),
    PinDescriptor::new(Port::C, 5),
];

/// Logical pin number, always within D0..D19
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin(u8);

impl Pin {
    pub const D0: Pin = Pin(0);
    pub const D1: Pin = Pin(1);
    pub const D2: Pin = Pin(2);
    pub const D3: Pin = Pin(3);
    pub const D4: Pin = Pin(4);
    pub const D5: Pin = Pin(5);
    pub const D6: Pin = Pin(6);
    pub const D7: Pin = Pin(7);
    pub const D8: Pin = Pin(8);
    pub const D9: Pin = Pin(9);
    pub const D10: Pin = Pin(10);
    pub const D11: Pin = Pin(11);
    pub const D12: Pin = Pin(12);
    pub const D13: Pin = Pin(13);
    pub const D14: Pin = Pin(14);
    pub const D15: Pin = Pin(15);
    pub const D16: Pin = Pin(16);
    pub const D17: Pin = Pin(17);
    pub const D18: Pin = Pin(18);
    pub const D19: Pin = Pin(19);

    pub const A0: Pin = Pin::D14;
    pub const A1: Pin = Pin::D15;
    pub const A2: Pin = Pin::D16;
    pub const A3: Pin = Pin::D17;
    pub const A4: Pin = Pin::D18;
    pub const A5: Pin = Pin::D19;

    /// Checked conversion from a raw pin number
    pub const fn new(number: u8) -> Option<Pin> {
        if (number as usize) < PIN_COUNT {
            Some(Pin(number))
        } else {
            None
        }
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    /// ADC input multiplexed onto this pin, if any
    pub const fn analog(self) -> Option<AnalogPin> {
        AnalogPin::from_channel(self.0.wrapping_sub(Pin::A0.0))
    }

    /// Iterate D0..D19
    pub fn all() -> impl Iterator<Item = Pin> {
        (0..PIN_COUNT as u8).map(Pin)
    }
}

impl TryFrom<u8> for Pin {
    type Error = crate::hal::HalError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Pin::new(number).ok_or(crate::hal::HalError::InvalidConfig)
    }
}

/// Analog-capable pin (ADC channels 0..5)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogPin {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
}

impl AnalogPin {
    pub const fn from_channel(channel: u8) -> Option<AnalogPin> {
        match channel {
            0 => Some(AnalogPin::A0),
            1 => Some(AnalogPin::A1),
            2 => Some(AnalogPin::A2),
            3 => Some(AnalogPin::A3),
            4 => Some(AnalogPin::A4),
            5 => Some(AnalogPin::A5),
            _ => None,
        }
    }

    /// ADMUX channel number
    pub const fn channel(self) -> u8 {
        self as u8
    }

    /// Digital pin sharing this line
    pub const fn pin(self) -> Pin {
        Pin(Pin::A0.0 + self as u8)
    }
}

/// Map a logical pin to its port register and bit
pub fn pin_to_port_and_bit(pin: Pin) -> PinDescriptor {
    PIN_TABLE[usize::from(pin.number())]
}
