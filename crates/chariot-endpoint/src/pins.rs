//! Pin I/O seam.
//!
//! The router only decides *which* pin operation the peer asked for; the
//! operation itself belongs to the board. [`SimulatedPins`] stands in for a
//! board when running against a bridge or in tests.

use std::collections::HashMap;

use chariot_protocol::PinMode;

/// Board pin access used by the command router.
pub trait PinIo {
    /// Read a digital level.
    fn digital_read(&mut self, pin: u8) -> bool;
    /// Drive a digital level.
    fn digital_write(&mut self, pin: u8, high: bool);
    /// Read an analog value.
    fn analog_read(&mut self, pin: u8) -> i32;
    /// Write an analog (PWM) value.
    fn analog_write(&mut self, pin: u8, value: i32);
    /// Configure a pin.
    fn set_mode(&mut self, pin: u8, mode: PinMode);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PinState {
    mode: PinMode,
    level: bool,
    analog: i32,
}

impl Default for PinState {
    fn default() -> Self {
        PinState {
            mode: PinMode::Input,
            level: false,
            analog: 0,
        }
    }
}

/// In-memory pin bank.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPins {
    pins: HashMap<u8, PinState>,
}

impl SimulatedPins {
    /// Create a bank with every pin an input at level low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode of `pin`.
    pub fn mode(&self, pin: u8) -> PinMode {
        self.pins.get(&pin).copied().unwrap_or_default().mode
    }

    /// Current digital level of `pin`.
    pub fn level(&self, pin: u8) -> bool {
        self.pins.get(&pin).copied().unwrap_or_default().level
    }

    /// Current analog value of `pin`.
    pub fn analog(&self, pin: u8) -> i32 {
        self.pins.get(&pin).copied().unwrap_or_default().analog
    }

    /// Set the value an analog read of `pin` returns.
    pub fn set_analog_input(&mut self, pin: u8, value: i32) {
        self.pins.entry(pin).or_default().analog = value;
    }

    /// Set the level a digital read of `pin` returns.
    pub fn set_digital_input(&mut self, pin: u8, high: bool) {
        self.pins.entry(pin).or_default().level = high;
    }
}

impl PinIo for SimulatedPins {
    fn digital_read(&mut self, pin: u8) -> bool {
        self.level(pin)
    }

    fn digital_write(&mut self, pin: u8, high: bool) {
        self.pins.entry(pin).or_default().level = high;
    }

    fn analog_read(&mut self, pin: u8) -> i32 {
        self.analog(pin)
    }

    fn analog_write(&mut self, pin: u8, value: i32) {
        self.pins.entry(pin).or_default().analog = value;
    }

    fn set_mode(&mut self, pin: u8, mode: PinMode) {
        self.pins.entry(pin).or_default().mode = mode;
    }
}
