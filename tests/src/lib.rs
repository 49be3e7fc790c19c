//! Host-based integration tests for the clock, the PWM multiplexer and the
//! demo applications, all running against `MockMcu`.

#[cfg(test)]
mod clock_tests;
#[cfg(test)]
mod pwm_tests;
