// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! RP2040 register map used by the beacon.

use bitflags::bitflags;

/// Single-cycle IO block (GPIO output/enable lives here, not in IO_BANK0).
pub const SIO_BASE: u32 = 0xD000_0000;

pub const SIO_CPUID: u32 = 0x00;
pub const SIO_GPIO_IN: u32 = 0x04;
pub const SIO_GPIO_OUT: u32 = 0x10;
pub const SIO_GPIO_OUT_SET: u32 = 0x14;
pub const SIO_GPIO_OUT_CLR: u32 = 0x18;
pub const SIO_GPIO_OUT_XOR: u32 = 0x1C;
pub const SIO_GPIO_OE: u32 = 0x20;
pub const SIO_GPIO_OE_SET: u32 = 0x24;
pub const SIO_GPIO_OE_CLR: u32 = 0x28;
pub const SIO_GPIO_OE_XOR: u32 = 0x2C;

/// PL011 UART0.
pub const UART0_BASE: u32 = 0x4003_4000;

pub const UART_DR: u32 = 0x00;
pub const UART_FR: u32 = 0x18;
pub const UART_IBRD: u32 = 0x24;
pub const UART_FBRD: u32 = 0x28;
pub const UART_LCRH: u32 = 0x2C;
pub const UART_CR: u32 = 0x30;

/// On-board LED of the Pico.
pub const LED_PIN: u8 = 25;

/// 115200 baud from a 48 MHz peripheral clock: 48e6 / (16 * 115200) = 26.04.
pub const UART_IBRD_115200: u32 = 26;
pub const UART_FBRD_115200: u32 = 3;

bitflags! {
    /// UARTFR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UartFlags: u32 {
        const CTS = 1 << 0;
        const BUSY = 1 << 3;
        const RXFE = 1 << 4;
        const TXFF = 1 << 5;
        const RXFF = 1 << 6;
        const TXFE = 1 << 7;
    }
}

bitflags! {
    /// UARTCR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UartControl: u32 {
        const UARTEN = 1 << 0;
        const LBE = 1 << 7;
        const TXE = 1 << 8;
        const RXE = 1 << 9;
    }
}

bitflags! {
    /// UARTLCRH.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineControl: u32 {
        const BRK = 1 << 0;
        const PEN = 1 << 1;
        const EPS = 1 << 2;
        const STP2 = 1 << 3;
        const FEN = 1 << 4;
        const WLEN_8 = 0b11 << 5;
    }
}

pub const fn sio(offset: u32) -> u32 {
    SIO_BASE + offset
}

pub const fn uart0(offset: u32) -> u32 {
    UART0_BASE + offset
}
