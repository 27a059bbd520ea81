// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::pl011::Pl011;
use crate::peripherals::sio::Sio;
use crate::{Peripheral, SimResult, SimulationError};
use blinkwire_config::BoardConfig;
use blinkwire_hal::regs::{SIO_BASE, UART0_BASE};
use std::sync::{Arc, Mutex};

pub const SIO_NAME: &str = "sio";
pub const UART0_NAME: &str = "uart0";

const WINDOW_SIZE: u64 = 0x1000;

pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub dev: Box<dyn Peripheral>,
}

#[derive(Default)]
pub struct SystemBus {
    pub peripherals: Vec<PeripheralEntry>,
}

impl SystemBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// SIO and UART0 with reset-state models.
    pub fn rp2040() -> Self {
        Self::from_config(&BoardConfig::default())
    }

    pub fn from_config(board: &BoardConfig) -> Self {
        let mut bus = Self::new();
        bus.map(
            SIO_NAME,
            SIO_BASE as u64,
            WINDOW_SIZE,
            Box::new(Sio::with_oe_reset(board.gpio_oe_reset)),
        );
        bus.map(
            UART0_NAME,
            UART0_BASE as u64,
            WINDOW_SIZE,
            Box::new(
                Pl011::new(board.uart_fifo_depth, board.uart_drain_interval)
                    .require_enable(board.require_uart_enable)
                    .force_fifo(board.uart_fifo_enabled),
            ),
        );
        bus
    }

    pub fn map(&mut self, name: &str, base: u64, size: u64, dev: Box<dyn Peripheral>) {
        tracing::debug!("Mapping {} at {:#x}..{:#x}", name, base, base + size);
        self.peripherals.push(PeripheralEntry {
            name: name.to_string(),
            base,
            size,
            dev,
        });
    }

    /// Attach a UART TX capture sink to any UART peripherals on this bus.
    ///
    /// When `echo_stdout` is false, UART bytes will no longer be printed to stdout.
    pub fn attach_uart_tx_sink(&mut self, sink: Arc<Mutex<Vec<u8>>>, echo_stdout: bool) {
        for p in &mut self.peripherals {
            let Some(any) = p.dev.as_any_mut() else {
                continue;
            };
            let Some(uart) = any.downcast_mut::<Pl011>() else {
                continue;
            };
            uart.set_sink(Some(sink.clone()), echo_stdout);
        }
    }

    pub fn peripheral<T: 'static>(&self, name: &str) -> Option<&T> {
        self.peripherals
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any())
            .and_then(|any| any.downcast_ref::<T>())
    }

    pub fn peripheral_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.peripherals
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any_mut())
            .and_then(|any| any.downcast_mut::<T>())
    }

    pub fn sio(&self) -> Option<&Sio> {
        self.peripheral(SIO_NAME)
    }

    pub fn uart0(&self) -> Option<&Pl011> {
        self.peripheral(UART0_NAME)
    }

    fn entry_for(&self, addr: u64) -> SimResult<usize> {
        if addr % 4 != 0 {
            return Err(SimulationError::UnalignedAccess(addr));
        }
        self.peripherals
            .iter()
            .position(|p| addr >= p.base && addr < p.base + p.size)
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    pub fn read_u32(&self, addr: u64) -> SimResult<u32> {
        let idx = self.entry_for(addr)?;
        let p = &self.peripherals[idx];
        p.dev.read(addr - p.base)
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        let idx = self.entry_for(addr)?;
        let p = &mut self.peripherals[idx];
        p.dev.write(addr - p.base, value)
    }

    pub fn tick_peripherals(&mut self) {
        for p in &mut self.peripherals {
            p.dev.tick();
        }
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.peripherals
                .iter()
                .map(|p| (p.name.clone(), p.dev.snapshot()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blinkwire_hal::regs::{sio, uart0, SIO_GPIO_OE, UART_FR};

    #[test]
    fn test_rp2040_map() {
        let bus = SystemBus::rp2040();
        assert!(bus.sio().is_some());
        assert!(bus.uart0().is_some());
        assert_eq!(bus.read_u32(sio(SIO_GPIO_OE) as u64).unwrap(), 0);
        assert_eq!(bus.read_u32(uart0(UART_FR) as u64).unwrap(), 0x90);
    }

    #[test]
    fn test_unmapped_and_unaligned() {
        let mut bus = SystemBus::rp2040();
        assert_eq!(
            bus.read_u32(0x2000_0000),
            Err(SimulationError::MemoryViolation(0x2000_0000))
        );
        assert_eq!(
            bus.write_u32(0xD000_0012, 1),
            Err(SimulationError::UnalignedAccess(0xD000_0012))
        );
    }

    #[test]
    fn test_from_config_applies_board() {
        let board = BoardConfig {
            gpio_oe_reset: 0xF0,
            ..BoardConfig::default()
        };
        let bus = SystemBus::from_config(&board);
        assert_eq!(bus.read_u32(sio(SIO_GPIO_OE) as u64).unwrap(), 0xF0);
    }

    #[test]
    fn test_uart_sink_attached() {
        let mut bus = SystemBus::rp2040();
        let sink = Arc::new(Mutex::new(Vec::new()));
        bus.attach_uart_tx_sink(sink.clone(), false);

        bus.write_u32(uart0(0) as u64, b'O' as u32).unwrap();
        for _ in 0..8 {
            bus.tick_peripherals();
        }
        assert_eq!(*sink.lock().unwrap(), b"O".to_vec());
    }

    #[test]
    fn test_snapshot_names_peripherals() {
        let bus = SystemBus::rp2040();
        let snap = bus.snapshot();
        assert!(snap.get("sio").is_some());
        assert_eq!(snap["uart0"]["cr"], 0x0300);
    }
}
