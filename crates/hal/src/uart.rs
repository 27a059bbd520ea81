// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::regs::{
    LineControl, UartControl, UartFlags, UART0_BASE, UART_CR, UART_DR, UART_FBRD,
    UART_FBRD_115200, UART_FR, UART_IBRD, UART_IBRD_115200, UART_LCRH,
};
use crate::Hardware;

/// Polled PL011 transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uart {
    base: u32,
}

pub const UART0: Uart = Uart::new(UART0_BASE);

impl Uart {
    pub const fn new(base: u32) -> Self {
        Self { base }
    }

    pub const fn base(&self) -> u32 {
        self.base
    }

    const fn reg(&self, offset: u32) -> u32 {
        self.base + offset
    }

    /// Disable, program 115200 8N1 for a 48 MHz clock, then enable TX/RX.
    pub fn init<H: Hardware>(&self, hw: &mut H) {
        hw.write32(self.reg(UART_CR), 0);
        hw.write32(self.reg(UART_IBRD), UART_IBRD_115200);
        hw.write32(self.reg(UART_FBRD), UART_FBRD_115200);
        hw.write32(self.reg(UART_LCRH), LineControl::WLEN_8.bits());
        hw.write32(
            self.reg(UART_CR),
            (UartControl::UARTEN | UartControl::TXE | UartControl::RXE).bits(),
        );
    }

    /// Spins until TXFF clears, then writes `byte` to the data register.
    ///
    /// There is no timeout: a flag that never clears blocks forever.
    pub fn putc<H: Hardware>(&self, hw: &mut H, byte: u8) {
        let fr = self.reg(UART_FR);
        while UartFlags::from_bits_retain(hw.read32(fr)).contains(UartFlags::TXFF) {}
        hw.write32(self.reg(UART_DR), byte as u32);
    }

    /// Sends bytes up to the first NUL (or the end of the slice).
    pub fn puts<H: Hardware>(&self, hw: &mut H, s: &[u8]) {
        for &byte in s.iter().take_while(|&&b| b != 0) {
            self.putc(hw, byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, MockHardware};

    const FR: u32 = UART0_BASE + UART_FR;
    const DR: u32 = UART0_BASE + UART_DR;

    #[test]
    fn test_putc_polls_until_fifo_has_room() {
        let mut hw = MockHardware::default();
        hw.busy_reads(FR, UartFlags::TXFF.bits(), 3);

        UART0.putc(&mut hw, b'L');

        let fr_reads = hw
            .log
            .iter()
            .filter(|a| matches!(a, Access::Read(addr, _) if *addr == FR))
            .count();
        assert_eq!(fr_reads, 4);
        assert_eq!(hw.log.last(), Some(&Access::Write(DR, b'L' as u32)));
    }

    #[test]
    fn test_putc_ignores_other_flags() {
        let mut hw = MockHardware::default();
        hw.preset(FR, (UartFlags::BUSY | UartFlags::RXFE).bits());

        UART0.putc(&mut hw, b'O');

        assert_eq!(
            hw.log,
            vec![
                Access::Read(FR, (UartFlags::BUSY | UartFlags::RXFE).bits()),
                Access::Write(DR, b'O' as u32)
            ]
        );
    }

    #[test]
    fn test_puts_stops_at_nul() {
        let mut hw = MockHardware::default();
        UART0.puts(&mut hw, b"LED\n\0junk");
        assert_eq!(
            hw.writes_to(DR),
            vec![b'L' as u32, b'E' as u32, b'D' as u32, b'\n' as u32]
        );
    }

    #[test]
    fn test_init_sequence() {
        let mut hw = MockHardware::default();
        UART0.init(&mut hw);

        let writes: Vec<_> = hw
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(addr, v) => Some((addr - UART0_BASE, v)),
                _ => None,
            })
            .collect();
        assert_eq!(
            writes,
            vec![
                (UART_CR, 0),
                (UART_IBRD, 26),
                (UART_FBRD, 3),
                (UART_LCRH, 3 << 5),
                (UART_CR, (1 << 0) | (1 << 8) | (1 << 9)),
            ]
        );
    }
}
