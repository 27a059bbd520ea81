// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::SystemBus;
use crate::trace::{BusEvent, Trace};
use crate::SimulationError;
use blinkwire_config::Limits;
use blinkwire_hal::Hardware;
use std::panic;

/// Poll cap applied when a run sets none, so a wedged flag still terminates.
pub const DEFAULT_MAX_POLLS: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Budget {
    /// Completed delays before the run stops.
    pub max_phases: Option<u64>,
    /// Consecutive reads of one address, with no write or delay in between.
    pub max_polls: Option<u64>,
}

impl Budget {
    pub fn phases(max_phases: u64) -> Self {
        Self {
            max_phases: Some(max_phases),
            max_polls: None,
        }
    }

    pub fn with_max_polls(self, max_polls: Option<u64>) -> Self {
        Self { max_polls, ..self }
    }

    fn poll_limit(&self) -> u64 {
        self.max_polls.unwrap_or(DEFAULT_MAX_POLLS)
    }
}

impl From<&Limits> for Budget {
    fn from(limits: &Limits) -> Self {
        Self::phases(limits.max_phases).with_max_polls(limits.max_polls)
    }
}

/// Unwind payload that ends a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Halt {
    PhaseLimit,
    Stall { addr: u32, polls: u64 },
    Fault(SimulationError),
}

fn halt(reason: Halt) -> ! {
    tracing::debug!(?reason, "Halting simulated firmware");
    panic::resume_unwind(Box::new(reason))
}

/// The firmware's [`Hardware`] backed by simulated peripherals.
pub struct SimHardware {
    bus: SystemBus,
    trace: Trace,
    budget: Budget,
    phases: u64,
    cycles: u64,
    poll_addr: Option<u32>,
    poll_streak: u64,
}

impl SimHardware {
    pub fn new(bus: SystemBus, budget: Budget) -> Self {
        Self {
            bus,
            trace: Trace::new(),
            budget,
            phases: 0,
            cycles: 0,
            poll_addr: None,
            poll_streak: 0,
        }
    }

    pub fn with_trace_limit(mut self, limit: Option<usize>) -> Self {
        self.trace = Trace::with_limit(limit);
        self
    }

    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Completed delays so far.
    pub fn phases(&self) -> u64 {
        self.phases
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn tick(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.bus.tick_peripherals();
        }
        self.cycles += cycles;
    }

    fn reset_poll(&mut self) {
        self.poll_addr = None;
        self.poll_streak = 0;
    }

    fn note_poll(&mut self, addr: u32) {
        if self.poll_addr == Some(addr) {
            self.poll_streak += 1;
        } else {
            self.poll_addr = Some(addr);
            self.poll_streak = 1;
        }

        if self.poll_streak > self.budget.poll_limit() {
            tracing::warn!(
                "Register {:#010x} read {} times without progress",
                addr,
                self.poll_streak
            );
            halt(Halt::Stall {
                addr,
                polls: self.poll_streak,
            });
        }
    }
}

impl Hardware for SimHardware {
    fn read32(&mut self, addr: u32) -> u32 {
        let value = match self.bus.read_u32(addr as u64) {
            Ok(v) => v,
            Err(e) => halt(Halt::Fault(e)),
        };
        self.trace.record(BusEvent::Read { addr, value });
        self.tick(1);
        self.note_poll(addr);
        value
    }

    fn write32(&mut self, addr: u32, value: u32) {
        if let Err(e) = self.bus.write_u32(addr as u64, value) {
            halt(Halt::Fault(e));
        }
        self.trace.record(BusEvent::Write { addr, value });
        self.tick(1);
        self.reset_poll();
    }

    fn spin(&mut self, count: u32) {
        self.trace.record(BusEvent::Delay { count });
        self.tick(count as u64);
        self.reset_poll();

        self.phases += 1;
        if let Some(max) = self.budget.max_phases {
            if self.phases >= max {
                halt(Halt::PhaseLimit);
            }
        }
    }
}
