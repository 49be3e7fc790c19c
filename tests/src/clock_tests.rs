//! Monotonic clock properties: counting, monotonicity, the pending-overflow
//! boundary, wraparound and sleep accuracy

use avrlite_core::hal::bits::*;
use avrlite_core::hal::mock::MockMcu;
use avrlite_core::{ClockConfig, MonotonicClock, Prescaler, Register};
use proptest::prelude::*;
use rstest::rstest;

type MockClock<'a> = MonotonicClock<'a, &'a MockMcu, &'a MockMcu>;

fn running_clock(mcu: &MockMcu, config: ClockConfig) -> MockClock<'_> {
    let clock = MonotonicClock::start(mcu.counters(), mcu, mcu, config).unwrap();
    mcu.unmask_interrupts();
    clock
}

fn config_for(cpu_hz: u32) -> ClockConfig {
    ClockConfig {
        cpu_hz,
        tick_prescaler: Prescaler::Div64,
        millis_prescaler: Prescaler::Div64,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_synthetic_compare_events_counted(events in 0u32..5_000) {
        let mcu = MockMcu::new();
        let clock = running_clock(&mcu, ClockConfig::default());

        for _ in 0..events {
            mcu.counters().on_millis_compare();
        }
        prop_assert_eq!(clock.elapsed_millis(), events);
    }

    #[test]
    fn prop_clock_never_runs_backwards(steps in prop::collection::vec(1u64..3_000, 1..20)) {
        let mcu = MockMcu::new();
        let clock = running_clock(&mcu, ClockConfig::default());

        let mut last_millis = clock.elapsed_millis();
        let mut last_micros = clock.elapsed_micros();
        for step in steps {
            mcu.advance_micros(step);
            let millis = clock.elapsed_millis();
            let micros = clock.elapsed_micros();
            prop_assert!(millis >= last_millis);
            prop_assert!(micros >= last_micros);
            // Both counters describe the same simulated time
            prop_assert!(u64::from(micros) / 1000 + 1 >= u64::from(millis));
            prop_assert!(u64::from(millis) + 1 >= u64::from(micros) / 1000);
            last_millis = millis;
            last_micros = micros;
        }
    }

    #[test]
    fn prop_pending_overflow_not_lost(whole in 0u64..4, past_wrap in 1u64..=200) {
        let mcu = MockMcu::new();
        let clock = running_clock(&mcu, ClockConfig::default());

        // Stop one tick short of the wrap, then cross it with the handler held off
        let before_wrap = whole * 256 + 255;
        mcu.advance_micros(before_wrap * 4);
        mcu.mask_interrupts();
        mcu.advance_micros(past_wrap * 4);

        prop_assert_ne!(mcu.peek(Register::Tifr0) & bv(TOV0), 0);
        let expected = ((before_wrap + past_wrap) * 4) as u32;
        prop_assert_eq!(clock.elapsed_micros(), expected);

        mcu.unmask_interrupts();
        prop_assert_eq!(clock.elapsed_micros(), expected);
    }
}

#[test]
fn test_read_at_boundary_without_handler() {
    let mcu = MockMcu::new();
    let clock = running_clock(&mcu, ClockConfig::default());

    // Counter wrapped to zero, overflow flag up, handler not yet run
    mcu.mask_interrupts();
    mcu.advance_micros(256 * 4);
    assert_eq!(mcu.peek(Register::Tcnt0), 0);
    assert_eq!(clock.elapsed_micros(), 1024);
}

#[rstest]
#[case(16_000_000)]
#[case(8_000_000)]
fn test_fifteen_hundred_millis(#[case] cpu_hz: u32) {
    let mcu = MockMcu::with_cpu_hz(cpu_hz);
    let clock = running_clock(&mcu, config_for(cpu_hz));

    mcu.advance_micros(1_500_000);
    let millis = clock.elapsed_millis();
    assert!((1499..=1501).contains(&millis), "{cpu_hz} Hz: {millis} ms");
    assert_eq!(clock.elapsed_micros(), 1_500_000);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(10)]
#[case(100)]
#[case(250)]
fn test_sleep_millis_window(#[case] ms: u32) {
    let mcu = MockMcu::new();
    let mut clock = running_clock(&mcu, ClockConfig::default());
    mcu.advance_micros(37);

    let start_sim = mcu.now_micros();
    let start = clock.elapsed_micros();
    clock.sleep_millis(ms);
    let slept = clock.elapsed_micros().wrapping_sub(start);
    let slept_sim = mcu.now_micros() - start_sim;

    let target = ms * 1000;
    assert!(slept >= target, "woke early: {slept} < {target}");
    assert!(slept <= target + 8, "overran: {slept}");
    // Tick resolution can shave at most one tick off real time
    assert!(slept_sim + 4 >= u64::from(target));
    assert!(slept_sim <= u64::from(target) + 8);
}

#[test]
fn test_micros_wraparound() {
    let mcu = MockMcu::new();
    let mut clock = running_clock(&mcu, ClockConfig::default());

    // 2^24 overflows of 256 ticks of 4 us is exactly 2^32 us
    mcu.counters().preset((1 << 24) - 1, 0);
    assert_eq!(clock.elapsed_micros(), u32::MAX - 1023);

    mcu.advance_micros(2048);
    assert_eq!(clock.elapsed_micros(), 1024);

    mcu.counters().preset((1 << 24) - 1, 0);
    let start = clock.elapsed_micros();
    clock.sleep_millis(3);
    let slept = clock.elapsed_micros().wrapping_sub(start);
    assert!((3000..=3008).contains(&slept), "slept {slept} us across the wrap");
}

#[test]
fn test_millis_wraparound() {
    let mcu = MockMcu::new();
    let clock = running_clock(&mcu, ClockConfig::default());

    mcu.counters().preset(0, u32::MAX);
    mcu.advance_micros(1000);
    assert_eq!(clock.elapsed_millis(), 0);
}

#[test]
fn test_sleep_micros_has_no_correction() {
    let mcu = MockMcu::new();
    let mut clock = running_clock(&mcu, ClockConfig::default());

    let start = mcu.now_micros();
    clock.sleep_micros(50);
    assert_eq!(mcu.now_micros() - start, 50);
}

#[test]
fn test_masked_interrupts_freeze_millis() {
    let mcu = MockMcu::new();
    let clock = running_clock(&mcu, ClockConfig::default());

    mcu.mask_interrupts();
    mcu.advance_micros(5_000);
    // At most one compare flag can latch while masked
    assert_eq!(clock.elapsed_millis(), 0);
    mcu.unmask_interrupts();
    assert_eq!(clock.elapsed_millis(), 1);
}
