// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use blinkwire_hal::regs::{
    SIO_CPUID, SIO_GPIO_IN, SIO_GPIO_OE, SIO_GPIO_OE_CLR, SIO_GPIO_OE_SET, SIO_GPIO_OE_XOR,
    SIO_GPIO_OUT, SIO_GPIO_OUT_CLR, SIO_GPIO_OUT_SET, SIO_GPIO_OUT_XOR,
};

/// RP2040 SIO GPIO block (bank 0).
#[derive(Debug, Default, serde::Serialize)]
pub struct Sio {
    gpio_in: u32,
    gpio_out: u32,
    gpio_oe: u32,
    #[serde(skip)]
    transitions: [u64; 32],
}

impl Sio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_oe_reset(gpio_oe: u32) -> Self {
        Self {
            gpio_oe,
            ..Self::default()
        }
    }

    pub fn gpio_out(&self) -> u32 {
        self.gpio_out
    }

    pub fn gpio_oe(&self) -> u32 {
        self.gpio_oe
    }

    pub fn pin_level(&self, pin: u8) -> bool {
        self.gpio_out & (1 << pin) != 0
    }

    pub fn output_enabled(&self, pin: u8) -> bool {
        self.gpio_oe & (1 << pin) != 0
    }

    /// Number of OUT level changes seen on `pin`.
    pub fn transitions(&self, pin: u8) -> u64 {
        self.transitions[pin as usize]
    }

    /// Drive the input side, as an external circuit would.
    pub fn set_input(&mut self, value: u32) {
        self.gpio_in = value;
    }

    fn set_out(&mut self, value: u32) {
        let changed = self.gpio_out ^ value;
        for pin in 0..32u8 {
            if changed & (1 << pin) != 0 {
                self.transitions[pin as usize] += 1;
                tracing::debug!(pin, high = value & (1 << pin) != 0, "GPIO level change");
            }
        }
        self.gpio_out = value;
    }

    /// GPIO_IN reflects the pad: driven pins read back their output.
    fn read_in(&self) -> u32 {
        (self.gpio_in & !self.gpio_oe) | (self.gpio_out & self.gpio_oe)
    }
}

impl crate::Peripheral for Sio {
    fn read(&self, offset: u64) -> SimResult<u32> {
        let value = match offset as u32 {
            SIO_CPUID => 0,
            SIO_GPIO_IN => self.read_in(),
            SIO_GPIO_OUT => self.gpio_out,
            SIO_GPIO_OE => self.gpio_oe,
            // The SET/CLR/XOR aliases are write-only.
            _ => 0,
        };
        Ok(value)
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset as u32 {
            SIO_GPIO_OUT => self.set_out(value),
            SIO_GPIO_OUT_SET => self.set_out(self.gpio_out | value),
            SIO_GPIO_OUT_CLR => self.set_out(self.gpio_out & !value),
            SIO_GPIO_OUT_XOR => self.set_out(self.gpio_out ^ value),
            SIO_GPIO_OE => self.gpio_oe = value,
            SIO_GPIO_OE_SET => self.gpio_oe |= value,
            SIO_GPIO_OE_CLR => self.gpio_oe &= !value,
            SIO_GPIO_OE_XOR => self.gpio_oe ^= value,
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
