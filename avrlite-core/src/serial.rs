//! Polled UART0 transmitter
//!
//! Formatted output goes through [`core::fmt::Write`], so `write!` works
//! without a heap buffer.

use crate::config::SerialConfig;
use crate::hal::bits::*;
use crate::hal::{HalError, Register, RegisterAccess};

pub struct Serial<R> {
    regs: R,
    cpu_hz: u32,
}

impl<R: RegisterAccess> Serial<R> {
    pub fn new(regs: R, cpu_hz: u32) -> Self {
        Self { regs, cpu_hz }
    }

    /// 8N1 at `config.baud`, receiver and transmitter enabled
    pub fn begin(&mut self, config: SerialConfig) -> Result<(), HalError> {
        let [low, high] = config.baud_register(self.cpu_hz)?.to_le_bytes();
        self.regs.write(Register::Ubrr0h, high);
        self.regs.write(Register::Ubrr0l, low);
        self.regs.write(Register::Ucsr0b, bv(RXEN0) | bv(TXEN0));
        self.regs.write(Register::Ucsr0c, bv(UCSZ01) | bv(UCSZ00));
        Ok(())
    }

    /// Blocks until the data register is empty
    pub fn write_byte(&mut self, byte: u8) {
        while self.regs.read(Register::Ucsr0a) & bv(UDRE0) == 0 {}
        self.regs.write(Register::Udr0, byte);
    }

    /// Send `text`, expanding `\n` to `\r\n`
    pub fn print(&mut self, text: &str) {
        for byte in text.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }

    pub fn println(&mut self, text: &str) {
        self.print(text);
        self.print("\n");
    }
}

impl<R: RegisterAccess> core::fmt::Write for Serial<R> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.print(s);
        Ok(())
    }
}
