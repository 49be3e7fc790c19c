//! PWM multiplexer properties: sibling isolation, clamping and register
//! consistency under arbitrary operation sequences

use avrlite_core::hal::bits::*;
use avrlite_core::hal::mock::MockMcu;
use avrlite_core::{
    default_config, Board, BoardConfig, ChannelState, ClockConfig, DutyRegister, HalError,
    MonotonicClock, Prescaler, PwmChannel, PwmMultiplexer, Register, RegisterAccess,
    SerialConfig,
};
use proptest::prelude::*;
use rstest::rstest;

#[derive(Copy, Clone, Debug)]
enum Op {
    Enable(PwmChannel, u16),
    SetDuty(PwmChannel, u16),
    Disable(PwmChannel),
    Write(PwmChannel, u16),
}

fn any_channel() -> impl Strategy<Value = PwmChannel> {
    prop::sample::select(PwmChannel::ALL.to_vec())
}

fn any_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any_channel(), 0u16..400).prop_map(|(c, d)| Op::Enable(c, d)),
        (any_channel(), 0u16..400).prop_map(|(c, d)| Op::SetDuty(c, d)),
        any_channel().prop_map(Op::Disable),
        (any_channel(), 0u16..400).prop_map(|(c, d)| Op::Write(c, d)),
    ]
}

fn duty_in_hardware(mcu: &MockMcu, channel: PwmChannel) -> u16 {
    match channel.duty_register() {
        DutyRegister::Byte(reg) => u16::from(mcu.peek(reg)),
        DutyRegister::Word(reg) => (&mcu).read_u16(reg),
    }
}

/// What the duty register must hold, `None` where either value is legal
///
/// OCR1A is also the millisecond compare value: it holds 249 whenever timer1
/// belongs to the clock, and is only left alone by a D10-only PWM user.
fn expected_duty(model: &[ChannelState; 6], channel: PwmChannel) -> Option<u16> {
    match model[channel as usize] {
        ChannelState::Enabled(duty) => Some(u16::from(duty)),
        ChannelState::Disabled if channel == PwmChannel::D9 => {
            if model[PwmChannel::D10 as usize].is_enabled() {
                None
            } else {
                Some(249)
            }
        }
        ChannelState::Disabled => Some(0),
    }
}

fn output_enabled(mcu: &MockMcu, channel: PwmChannel) -> bool {
    mcu.peek(channel.timer().control_a()) & channel.compare_enable() != 0
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_registers_follow_channel_states(ops in prop::collection::vec(any_op(), 1..40)) {
        let mcu = MockMcu::new();
        let config = ClockConfig::default();
        let _clock = MonotonicClock::start(mcu.counters(), &mcu, &mcu, config).unwrap();
        let mut pwm = PwmMultiplexer::new(&mcu, config);
        let mut model = [ChannelState::Disabled; 6];

        for op in ops {
            match op {
                Op::Enable(channel, duty) => {
                    pwm.enable(channel, duty);
                    model[channel as usize] = ChannelState::Enabled(duty.min(255) as u8);
                }
                Op::SetDuty(channel, duty) => {
                    let result = pwm.set_duty(channel, duty);
                    if model[channel as usize].is_enabled() {
                        prop_assert!(result.is_ok());
                        model[channel as usize] = ChannelState::Enabled(duty.min(255) as u8);
                    } else {
                        prop_assert_eq!(result, Err(HalError::ChannelDisabled));
                    }
                }
                Op::Disable(channel) => {
                    pwm.disable(channel);
                    model[channel as usize] = ChannelState::Disabled;
                }
                Op::Write(channel, value) => {
                    pwm.write(channel, value);
                    model[channel as usize] = if value == 0 {
                        ChannelState::Disabled
                    } else {
                        ChannelState::Enabled(value.min(255) as u8)
                    };
                }
            }

            for channel in PwmChannel::ALL {
                let expected = model[channel as usize];
                prop_assert_eq!(pwm.state(channel), expected);
                prop_assert_eq!(output_enabled(&mcu, channel), expected.is_enabled());
                if let Some(duty) = expected_duty(&model, channel) {
                    prop_assert_eq!(duty_in_hardware(&mcu, channel), duty);
                }
                // Once a channel has run, its timer's shared mode bits stay put
                let timer = channel.timer();
                if expected.is_enabled() {
                    prop_assert_eq!(
                        mcu.peek(timer.control_a()) & timer.shared_mode_a(),
                        timer.shared_mode_a()
                    );
                    prop_assert_eq!(
                        mcu.peek(timer.control_b()) & timer.shared_mode_b(&config),
                        timer.shared_mode_b(&config)
                    );
                }
            }

            let timer1_idle = !model[PwmChannel::D9 as usize].is_enabled()
                && !model[PwmChannel::D10 as usize].is_enabled();
            if timer1_idle {
                prop_assert_eq!(mcu.peek(Register::Tccr1a) & bv(WGM10), 0);
            }
        }
    }

    #[test]
    fn prop_out_of_range_duty_clamps(channel in any_channel(), duty in 256u16..=u16::MAX) {
        let mcu = MockMcu::new();
        let mut pwm = PwmMultiplexer::new(&mcu, ClockConfig::default());

        pwm.enable(channel, 1);
        pwm.set_duty(channel, duty).unwrap();
        prop_assert_eq!(pwm.duty(channel), Some(255));
        prop_assert_eq!(duty_in_hardware(&mcu, channel), 255);
    }
}

#[rstest]
#[case(PwmChannel::D6, PwmChannel::D5)]
#[case(PwmChannel::D9, PwmChannel::D10)]
#[case(PwmChannel::D11, PwmChannel::D3)]
#[case(PwmChannel::D5, PwmChannel::D6)]
fn test_sibling_survives_enable_and_disable(#[case] a: PwmChannel, #[case] b: PwmChannel) {
    let mcu = MockMcu::new();
    let mut pwm = PwmMultiplexer::new(&mcu, ClockConfig::default());

    pwm.enable(a, 200);
    pwm.enable(b, 50);
    assert_eq!(pwm.state(a), ChannelState::Enabled(200));
    assert_eq!(duty_in_hardware(&mcu, a), 200);

    pwm.set_duty(b, 75).unwrap();
    assert_eq!(duty_in_hardware(&mcu, a), 200);

    pwm.disable(b);
    assert_eq!(pwm.state(a), ChannelState::Enabled(200));
    assert_eq!(pwm.state(b), ChannelState::Disabled);
    assert!(output_enabled(&mcu, a));
    assert!(!output_enabled(&mcu, b));
    assert_eq!(duty_in_hardware(&mcu, a), 200);
}

#[test]
fn test_pairs_do_not_leak_across_timers() {
    let mcu = MockMcu::new();
    let mut pwm = PwmMultiplexer::new(&mcu, ClockConfig::default());

    pwm.enable(PwmChannel::D3, 30);
    let timer0_a = mcu.peek(Register::Tccr0a);
    let timer1_a = mcu.peek(Register::Tccr1a);

    pwm.enable(PwmChannel::D11, 60);
    pwm.disable(PwmChannel::D3);
    assert_eq!(mcu.peek(Register::Tccr0a), timer0_a);
    assert_eq!(mcu.peek(Register::Tccr1a), timer1_a);
}

#[test]
fn test_reenable_after_disable_restores_output() {
    let mcu = MockMcu::new();
    let mut pwm = PwmMultiplexer::new(&mcu, ClockConfig::default());

    pwm.enable(PwmChannel::D10, 99);
    pwm.disable(PwmChannel::D10);
    pwm.enable(PwmChannel::D10, 12);
    assert!(output_enabled(&mcu, PwmChannel::D10));
    assert_eq!(pwm.duty(PwmChannel::D10), Some(12));
}

#[rstest]
#[case(16_000_000, Prescaler::Div256, Prescaler::Div64)]
#[case(8_000_000, Prescaler::Div8, Prescaler::Div64)]
#[case(16_000_000, Prescaler::Div64, Prescaler::Div8)]
fn test_pwm_keeps_clock_running_under_custom_prescalers(
    #[case] cpu_hz: u32,
    #[case] tick_prescaler: Prescaler,
    #[case] millis_prescaler: Prescaler,
) {
    let clock = ClockConfig {
        cpu_hz,
        tick_prescaler,
        millis_prescaler,
    };
    let config = BoardConfig {
        clock,
        serial: SerialConfig::default(),
    };
    let mcu = MockMcu::with_cpu_hz(cpu_hz);
    let mut board = Board::init(&mcu, &mcu, mcu.counters(), config).unwrap();

    mcu.advance_micros(4096);
    let before = board.clock.elapsed_micros();
    assert_eq!(before, 4096);

    for channel in [PwmChannel::D5, PwmChannel::D6, PwmChannel::D9, PwmChannel::D10] {
        board.pwm.enable(channel, 100);
    }
    assert_eq!(mcu.peek(Register::Tccr0b) & 0x07, tick_prescaler.clock_select());
    assert_eq!(mcu.peek(Register::Tccr1b) & 0x07, millis_prescaler.clock_select());

    mcu.advance_micros(10_000);
    assert_eq!(board.clock.elapsed_micros() - before, 10_000);

    let start = board.clock.elapsed_micros();
    board.clock.sleep_millis(5);
    assert!(board.clock.elapsed_micros() - start >= 5_000);
}

#[rstest]
#[case(&[PwmChannel::D10])]
#[case(&[PwmChannel::D9])]
#[case(&[PwmChannel::D9, PwmChannel::D10])]
#[case(&[PwmChannel::D10, PwmChannel::D9])]
fn test_millis_recalibrate_after_timer1_released(#[case] channels: &[PwmChannel]) {
    let mcu = MockMcu::new();
    let mut board = Board::init(&mcu, &mcu, mcu.counters(), default_config()).unwrap();

    mcu.advance_micros(300);
    for &channel in channels {
        board.pwm.enable(channel, 60);
    }
    mcu.advance_micros(500);
    for &channel in channels {
        board.pwm.disable(channel);
    }

    let before = board.clock.elapsed_millis();
    mcu.advance_micros(1_000_000);
    let elapsed = board.clock.elapsed_millis() - before;
    assert!((999..=1001).contains(&elapsed), "{elapsed} ms in one second");
}
