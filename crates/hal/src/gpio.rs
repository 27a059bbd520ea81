// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::regs::{sio, SIO_GPIO_OE, SIO_GPIO_OUT};
use crate::Hardware;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Bit index into the 32-bit SIO GPIO registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin(u8);

impl Pin {
    /// Panics for `index >= 32`; in a `const` this is a compile error.
    pub const fn new(index: u8) -> Self {
        assert!(index < 32, "GPIO pin index out of range");
        Self(index)
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub const fn mask(self) -> u32 {
        1 << self.0
    }
}

/// A pin driven through SIO `GPIO_OE`/`GPIO_OUT` read-modify-writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPin {
    pin: Pin,
}

impl OutputPin {
    pub const fn new(pin: Pin) -> Self {
        Self { pin }
    }

    pub const fn pin(&self) -> Pin {
        self.pin
    }

    /// Sets the output-enable bit, leaving the other pins' bits alone.
    pub fn enable_output<H: Hardware>(&self, hw: &mut H) {
        let mask = self.pin.mask();
        hw.modify32(sio(SIO_GPIO_OE), |oe| oe | mask);
    }

    pub fn set_high<H: Hardware>(&self, hw: &mut H) {
        let mask = self.pin.mask();
        hw.modify32(sio(SIO_GPIO_OUT), |out| out | mask);
    }

    pub fn set_low<H: Hardware>(&self, hw: &mut H) {
        let mask = self.pin.mask();
        hw.modify32(sio(SIO_GPIO_OUT), |out| out & !mask);
    }

    pub fn set<H: Hardware>(&self, hw: &mut H, level: Level) {
        match level {
            Level::High => self.set_high(hw),
            Level::Low => self.set_low(hw),
        }
    }
}
