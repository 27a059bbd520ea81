// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![no_std]
#![no_main]

use blinkwire_hal::{Beacon, Volatile};
use cortex_m_rt::entry;
use panic_halt as _;

#[link_section = ".boot2"]
#[used]
pub static BOOT2_FIRMWARE: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

const BEACON: Beacon = Beacon::pico();

#[entry]
fn main() -> ! {
    // SAFETY: this is the only code touching SIO and UART0, and both
    // register windows are mapped on the RP2040.
    let mut hw = unsafe { Volatile::new() };

    #[cfg(feature = "uart-init")]
    BEACON.uart().init(&mut hw);

    BEACON.run(&mut hw)
}
