// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use blinkwire_hal::regs::{
    LineControl, UartControl, UartFlags, UART_CR, UART_DR, UART_FBRD, UART_FR, UART_IBRD,
    UART_LCRH,
};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// UARTCR reset value: TXE and RXE set, UART disabled.
const CR_RESET: u32 = 0x0300;

/// PL011 transmit path with a cycle-driven TX FIFO.
///
/// With UARTLCRH.FEN clear the FIFO degenerates to a one-byte holding
/// register, as on silicon, unless the board forces the FIFO on. Receive
/// is not modelled: RXFE always reads set.
#[derive(Debug, serde::Serialize)]
pub struct Pl011 {
    ibrd: u32,
    fbrd: u32,
    lcrh: u32,
    cr: u32,
    tx_fifo: VecDeque<u8>,
    fifo_depth: usize,
    drain_interval: Option<u32>,
    require_enable: bool,
    force_fifo: bool,
    shift_elapsed: u32,
    transmitted: u64,
    overrun_writes: u64,
    #[serde(skip)]
    sink: Option<Arc<Mutex<Vec<u8>>>>,
    echo_stdout: bool,
}

impl Default for Pl011 {
    fn default() -> Self {
        Self::new(32, Some(8))
    }
}

impl Pl011 {
    /// `drain_interval`: bus cycles per byte on the line; `None` never drains.
    pub fn new(fifo_depth: usize, drain_interval: Option<u32>) -> Self {
        Self {
            ibrd: 0,
            fbrd: 0,
            lcrh: 0,
            cr: CR_RESET,
            tx_fifo: VecDeque::with_capacity(fifo_depth.max(1)),
            fifo_depth: fifo_depth.max(1),
            drain_interval,
            require_enable: false,
            force_fifo: false,
            shift_elapsed: 0,
            transmitted: 0,
            overrun_writes: 0,
            sink: None,
            echo_stdout: true,
        }
    }

    /// Hold bytes in the FIFO until UARTEN and TXE are both set.
    pub fn require_enable(mut self, require: bool) -> Self {
        self.require_enable = require;
        self
    }

    /// Use the full FIFO depth whatever UARTLCRH.FEN says.
    pub fn force_fifo(mut self, force: bool) -> Self {
        self.force_fifo = force;
        self
    }

    pub fn set_sink(&mut self, sink: Option<Arc<Mutex<Vec<u8>>>>, echo_stdout: bool) {
        self.sink = sink;
        self.echo_stdout = echo_stdout;
    }

    pub fn effective_depth(&self) -> usize {
        let fen = LineControl::from_bits_retain(self.lcrh).contains(LineControl::FEN);
        if self.force_fifo || fen {
            self.fifo_depth
        } else {
            1
        }
    }

    pub fn flags(&self) -> UartFlags {
        let mut flags = UartFlags::RXFE;
        if self.tx_fifo.is_empty() {
            flags |= UartFlags::TXFE;
        } else {
            flags |= UartFlags::BUSY;
        }
        if self.tx_fifo.len() >= self.effective_depth() {
            flags |= UartFlags::TXFF;
        }
        flags
    }

    pub fn pending(&self) -> usize {
        self.tx_fifo.len()
    }

    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }

    /// Data-register writes dropped because TXFF was set.
    pub fn overrun_writes(&self) -> u64 {
        self.overrun_writes
    }

    pub fn control(&self) -> UartControl {
        UartControl::from_bits_retain(self.cr)
    }

    fn tx_enabled(&self) -> bool {
        !self.require_enable || self.control().contains(UartControl::UARTEN | UartControl::TXE)
    }

    fn push_tx(&mut self, value: u8) {
        if self.tx_fifo.len() >= self.effective_depth() {
            self.overrun_writes += 1;
            tracing::warn!(
                byte = value,
                "UARTDR written while TX FIFO full; byte dropped"
            );
            return;
        }
        self.tx_fifo.push_back(value);
    }

    fn shift_out(&mut self, value: u8) {
        self.transmitted += 1;
        tracing::trace!(byte = value, "UART TX");

        if let Some(sink) = &self.sink {
            if let Ok(mut guard) = sink.lock() {
                guard.push(value);
            }
        }

        if self.echo_stdout {
            #[allow(unused_must_use)]
            {
                print!("{}", value as char);
                io::stdout().flush();
            }
        }
    }
}

impl crate::Peripheral for Pl011 {
    fn read(&self, offset: u64) -> SimResult<u32> {
        let value = match offset as u32 {
            UART_DR => 0,
            UART_FR => self.flags().bits(),
            UART_IBRD => self.ibrd,
            UART_FBRD => self.fbrd,
            UART_LCRH => self.lcrh,
            UART_CR => self.cr,
            _ => 0,
        };
        Ok(value)
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset as u32 {
            UART_DR => self.push_tx((value & 0xFF) as u8),
            UART_IBRD => self.ibrd = value & 0xFFFF,
            UART_FBRD => self.fbrd = value & 0x3F,
            UART_LCRH => self.lcrh = value & 0xFF,
            UART_CR => self.cr = value & 0xFF87,
            _ => {}
        }
        Ok(())
    }

    fn tick(&mut self) {
        let Some(interval) = self.drain_interval else {
            return;
        };
        if self.tx_fifo.is_empty() || !self.tx_enabled() {
            return;
        }

        self.shift_elapsed += 1;
        if self.shift_elapsed >= interval {
            self.shift_elapsed = 0;
            if let Some(byte) = self.tx_fifo.pop_front() {
                self.shift_out(byte);
            }
        }
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
