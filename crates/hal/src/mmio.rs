// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::delay;

/// 32-bit register access plus the one timing primitive the firmware uses.
///
/// Accesses are infallible from the firmware's point of view: a write always
/// "succeeds" and nothing verifies the hardware effect.
pub trait Hardware {
    fn read32(&mut self, addr: u32) -> u32;
    fn write32(&mut self, addr: u32, value: u32);

    /// Busy-wait for roughly `count` iterations. Not calibrated.
    fn spin(&mut self, count: u32) {
        delay::spin(count);
    }

    /// Read-modify-write.
    fn modify32<F>(&mut self, addr: u32, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read32(addr);
        self.write32(addr, f(value));
    }
}

impl<H: Hardware + ?Sized> Hardware for &mut H {
    fn read32(&mut self, addr: u32) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&mut self, addr: u32, value: u32) {
        (**self).write32(addr, value)
    }

    fn spin(&mut self, count: u32) {
        (**self).spin(count)
    }
}

/// Direct volatile access to physical addresses.
#[derive(Debug)]
pub struct Volatile {
    _private: (),
}

impl Volatile {
    /// # Safety
    ///
    /// Must only be used on an RP2040 where every address handed to
    /// [`Hardware::read32`]/[`Hardware::write32`] is a mapped, word-aligned
    /// register, and nothing else drives the same registers concurrently.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Hardware for Volatile {
    #[inline(always)]
    fn read32(&mut self, addr: u32) -> u32 {
        // SAFETY: guaranteed by the contract of `Volatile::new`.
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    #[inline(always)]
    fn write32(&mut self, addr: u32, value: u32) {
        // SAFETY: guaranteed by the contract of `Volatile::new`.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}
