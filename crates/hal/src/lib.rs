// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Bare-metal building blocks for the Blinkwire beacon.
//!
//! Everything here talks to the chip through the [`Hardware`] trait, so the
//! same code drives real RP2040 registers (via [`Volatile`]) and the host
//! simulator in `blinkwire-core`.

#![cfg_attr(not(test), no_std)]

pub mod beacon;
pub mod delay;
pub mod gpio;
pub mod mmio;
pub mod regs;
pub mod uart;

pub use beacon::{Beacon, Phase};
pub use gpio::{Level, OutputPin, Pin};
pub use mmio::{Hardware, Volatile};
pub use uart::Uart;

#[cfg(test)]
pub(crate) mod testing;
