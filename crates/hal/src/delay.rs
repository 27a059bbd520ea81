// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Delay used between beacon phases.
pub const DEFAULT_DELAY: u32 = 10;

/// Decrementing spin loop, one `nop` per iteration.
///
/// A placeholder rather than a timer: the duration depends on clock speed
/// and code placement.
#[inline(never)]
pub fn spin(count: u32) {
    let mut remaining = count;
    while remaining > 0 {
        remaining -= 1;
        nop();
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
fn nop() {
    cortex_m::asm::nop();
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline(always)]
fn nop() {
    core::hint::spin_loop();
}
