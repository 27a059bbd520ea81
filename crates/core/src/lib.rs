// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod check;
pub mod hardware;
pub mod machine;
pub mod peripherals;
pub mod trace;

use std::any::Any;

pub use blinkwire_config::StopReason;
pub use hardware::{Budget, SimHardware};
pub use machine::{BeaconOptions, Machine, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Unaligned 32-bit access at {0:#x}")]
    UnalignedAccess(u64),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// A memory-mapped peripheral, addressed by word offset into its window.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64) -> SimResult<u32>;
    fn write(&mut self, offset: u64, value: u32) -> SimResult<()>;
    /// Advance one bus cycle.
    fn tick(&mut self) {}
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
