// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::Hardware;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(u32, u32),
    Write(u32, u32),
    Spin(u32),
}

/// Flat register file that logs every access.
///
/// `busy_reads` makes the next N reads of an address return `busy_value`
/// before falling back to the stored register.
#[derive(Debug, Default)]
pub struct MockHardware {
    pub regs: HashMap<u32, u32>,
    pub log: Vec<Access>,
    busy: HashMap<u32, (u32, u32)>,
}

impl MockHardware {
    pub fn preset(&mut self, addr: u32, value: u32) {
        self.regs.insert(addr, value);
    }

    pub fn busy_reads(&mut self, addr: u32, busy_value: u32, reads: u32) {
        self.busy.insert(addr, (busy_value, reads));
    }

    pub fn writes_to(&self, addr: u32) -> Vec<u32> {
        self.log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(a, v) if a == addr => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl Hardware for MockHardware {
    fn read32(&mut self, addr: u32) -> u32 {
        let value = match self.busy.get_mut(&addr) {
            Some((busy_value, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                *busy_value
            }
            _ => self.regs.get(&addr).copied().unwrap_or(0),
        };
        self.log.push(Access::Read(addr, value));
        value
    }

    fn write32(&mut self, addr: u32, value: u32) {
        self.regs.insert(addr, value);
        self.log.push(Access::Write(addr, value));
    }

    fn spin(&mut self, count: u32) {
        self.log.push(Access::Spin(count));
    }
}
