//! Demo applications: blink, LED chaser, PWM fade and serial uptime

use core::fmt::Write;

use avrlite_core::{Board, Level, Pin, PinMode, PwmChannel, RegisterAccess};
use embedded_hal::delay::DelayNs;
use heapless::String;

/// One endless-loop application
pub trait Demo {
    /// Runs once after board init
    fn setup<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs;

    /// One pass of the main loop
    fn step<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs;
}

/// Set up `demo` and step it forever
pub fn run<T, R, D>(demo: &mut T, board: &mut Board<'_, R, D>) -> !
where
    T: Demo,
    R: RegisterAccess + Copy,
    D: DelayNs,
{
    demo.setup(board);
    loop {
        demo.step(board);
    }
}

/// Toggle one LED with a fixed half period
pub struct Blink {
    pin: Pin,
    half_period_ms: u32,
}

impl Blink {
    pub const fn new(pin: Pin, half_period_ms: u32) -> Self {
        Self {
            pin,
            half_period_ms,
        }
    }
}

impl Default for Blink {
    fn default() -> Self {
        Self::new(Pin::D13, 1000)
    }
}

impl Demo for Blink {
    fn setup<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs,
    {
        board.gpio.set_mode(self.pin, PinMode::Output);
    }

    fn step<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs,
    {
        board.gpio.write(self.pin, Level::High);
        board.clock.sleep_millis(self.half_period_ms);
        board.gpio.write(self.pin, Level::Low);
        board.clock.sleep_millis(self.half_period_ms);
    }
}

/// Three LEDs lit in turn; the speed steps through the intervals and back
pub struct Chaser {
    leds: [Pin; 3],
    intervals_ms: [u32; 3],
    mode: usize,
    forward: bool,
    rounds: u8,
}

impl Chaser {
    /// Passes before the speed changes
    pub const ROUNDS_PER_MODE: u8 = 5;

    pub const fn new(leds: [Pin; 3], intervals_ms: [u32; 3]) -> Self {
        Self {
            leds,
            intervals_ms,
            mode: 0,
            forward: true,
            rounds: 0,
        }
    }

    pub fn mode(&self) -> usize {
        self.mode
    }

    fn advance_mode(&mut self) {
        let last = self.intervals_ms.len() - 1;
        if self.forward {
            self.mode += 1;
            if self.mode == last {
                self.forward = false;
            }
        } else {
            self.mode -= 1;
            if self.mode == 0 {
                self.forward = true;
            }
        }
    }
}

impl Default for Chaser {
    fn default() -> Self {
        Self::new([Pin::A0, Pin::A1, Pin::A2], [1000, 500, 100])
    }
}

impl Demo for Chaser {
    fn setup<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs,
    {
        for pin in self.leds {
            board.gpio.set_mode(pin, PinMode::Output);
        }
    }

    fn step<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs,
    {
        let interval = self.intervals_ms[self.mode];
        for pin in self.leds {
            board.gpio.write(pin, Level::High);
            board.clock.sleep_millis(interval);
            board.gpio.write(pin, Level::Low);
        }

        self.rounds += 1;
        if self.rounds >= Self::ROUNDS_PER_MODE {
            self.rounds = 0;
            self.advance_mode();
        }

        board.clock.sleep_micros(50);
    }
}

/// Ramp each PWM LED up and down in turn
pub struct Fade {
    leds: [PwmChannel; 3],
    intervals_ms: [u32; 4],
    fade_amount: u16,
    mode: usize,
    rounds: u8,
}

impl Fade {
    /// Passes before the ramp speed changes
    pub const ROUNDS_PER_MODE: u8 = 10;

    pub const fn new(leds: [PwmChannel; 3], intervals_ms: [u32; 4], fade_amount: u16) -> Self {
        Self {
            leds,
            intervals_ms,
            fade_amount,
            mode: 0,
            rounds: 0,
        }
    }

    pub fn mode(&self) -> usize {
        self.mode
    }
}

impl Default for Fade {
    fn default() -> Self {
        Self::new(
            [PwmChannel::D9, PwmChannel::D10, PwmChannel::D11],
            [1000, 500, 100, 50],
            5,
        )
    }
}

impl Demo for Fade {
    fn setup<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs,
    {
        for channel in self.leds {
            board.gpio.set_mode(channel.pin(), PinMode::Output);
        }
    }

    fn step<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs,
    {
        let pause = self.intervals_ms[self.mode] / 255;
        let amount = self.fade_amount.max(1);

        for channel in self.leds {
            let mut brightness = 0u16;
            while brightness <= 255 {
                board.pwm.write(channel, brightness);
                board.clock.sleep_millis(pause);
                brightness += amount;
            }
            // Back down from the top, ending with the channel switched off
            let mut brightness = 255u16;
            loop {
                board.pwm.write(channel, brightness);
                board.clock.sleep_millis(pause);
                if brightness < amount {
                    break;
                }
                brightness -= amount;
            }
            if brightness != 0 {
                board.pwm.write(channel, 0);
            }
        }

        self.rounds += 1;
        if self.rounds >= Self::ROUNDS_PER_MODE {
            self.rounds = 0;
            self.mode = (self.mode + 1) % self.intervals_ms.len();
        }

        board.clock.sleep_micros(50);
    }
}

/// Two u32 values in decimal plus the fixed text of the report line
const LINE_CAPACITY: usize = "uptime:  ms ( us)".len() + 2 * 10;

/// Report the clock over the UART once per period, blinking D13 alongside
pub struct Uptime {
    period_ms: u32,
}

impl Uptime {
    pub const fn new(period_ms: u32) -> Self {
        Self { period_ms }
    }
}

impl Default for Uptime {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl Demo for Uptime {
    fn setup<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs,
    {
        board.gpio.set_mode(Pin::D13, PinMode::Output);
        board.serial.println("avrlite uptime");
    }

    fn step<R, D>(&mut self, board: &mut Board<'_, R, D>)
    where
        R: RegisterAccess + Copy,
        D: DelayNs,
    {
        let mut line: String<LINE_CAPACITY> = String::new();
        write!(
            line,
            "uptime: {} ms ({} us)",
            board.clock.elapsed_millis(),
            board.clock.elapsed_micros()
        )
        .ok();
        board.serial.println(&line);
        board.gpio.toggle(Pin::D13);
        board.clock.sleep_millis(self.period_ms);
    }
}
