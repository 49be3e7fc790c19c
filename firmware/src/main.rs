#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

use avrlite_core::{default_config, Board, ClockCounters, MmioRegisters};
#[allow(unused_imports)]
use avrlite_firmware::demos::{self, Blink, Chaser, Fade, Uptime};
use embedded_hal::delay::DelayNs;
use panic_halt as _;

/// Shared with the two timer interrupt vectors below
static COUNTERS: ClockCounters = ClockCounters::new();

#[avr_device::interrupt(atmega328p)]
fn TIMER0_OVF() {
    COUNTERS.on_tick_overflow();
}

#[avr_device::interrupt(atmega328p)]
fn TIMER1_COMPA() {
    COUNTERS.on_millis_compare();
}

/// Spin granule for the clock's sleeps: one pass is roughly 4 cycles at 16 MHz
struct CycleDelay;

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        for _ in 0..ns / 250 {
            avr_device::asm::nop();
        }
    }
}

fn halt() -> ! {
    loop {
        avr_device::asm::nop();
    }
}

#[avr_device::entry]
fn main() -> ! {
    let Some(regs) = MmioRegisters::take() else {
        halt()
    };
    let Ok(mut board) = Board::init(regs, CycleDelay, &COUNTERS, default_config()) else {
        halt()
    };

    #[cfg(feature = "demo-uptime")]
    demos::run(&mut Uptime::default(), &mut board);

    #[cfg(all(feature = "demo-fade", not(feature = "demo-uptime")))]
    demos::run(&mut Fade::default(), &mut board);

    #[cfg(all(
        feature = "demo-chaser",
        not(any(feature = "demo-uptime", feature = "demo-fade"))
    ))]
    demos::run(&mut Chaser::default(), &mut board);

    #[cfg(not(any(
        feature = "demo-uptime",
        feature = "demo-fade",
        feature = "demo-chaser"
    )))]
    demos::run(&mut Blink::default(), &mut board);
}
