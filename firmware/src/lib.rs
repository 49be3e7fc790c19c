#![no_std]

//! Demo applications for the Arduino Uno, written against `avrlite-core`
//!
//! Each demo is a small state machine whose `step` runs one pass of an
//! Arduino-style endless loop, so the binary can loop forever while host tests
//! drive a bounded number of passes against the simulated MCU.

pub use avrlite_core::*;

pub mod demos;
