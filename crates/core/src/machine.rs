// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hardware::{Halt, SimHardware};
use crate::trace::Trace;
use crate::{SimulationError, StopReason};
use blinkwire_hal::Beacon;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Build-time choices of the firmware image being simulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeaconOptions {
    /// Program UART0 before entering the loop (the `uart-init` feature).
    pub uart_init: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stop_reason: StopReason,
    pub stop_detail: Option<String>,
    pub phases: u64,
    pub bus_cycles: u64,
    /// Bytes that left the transmitter, lossily decoded.
    pub uart_tx: String,
    /// Bytes still queued in the TX FIFO at stop.
    pub uart_pending: usize,
    pub led_transitions: u64,
    pub overrun_writes: u64,
    pub trace_events: usize,
    pub trace_truncated: bool,
}

pub struct Machine {
    hw: SimHardware,
    sink: Arc<Mutex<Vec<u8>>>,
}

impl Machine {
    pub fn new(hw: SimHardware) -> Self {
        Self::with_uart_echo(hw, false)
    }

    /// Like [`Machine::new`], also printing UART output to stdout.
    pub fn with_uart_echo(mut hw: SimHardware, echo_stdout: bool) -> Self {
        let sink = Arc::new(Mutex::new(Vec::new()));
        hw.bus_mut().attach_uart_tx_sink(sink.clone(), echo_stdout);
        Self { hw, sink }
    }

    pub fn hardware(&self) -> &SimHardware {
        &self.hw
    }

    pub fn trace(&self) -> &Trace {
        self.hw.trace()
    }

    pub fn uart_bytes(&self) -> Vec<u8> {
        self.sink.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Runs the firmware entry sequence until a stop condition is hit.
    pub fn run(&mut self, beacon: &Beacon, options: BeaconOptions) -> RunReport {
        info!(
            pin = beacon.led().pin().index(),
            delay = beacon.delay(),
            uart_init = options.uart_init,
            "Starting beacon"
        );

        let hw = &mut self.hw;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            if options.uart_init {
                beacon.uart().init(hw);
            }
            beacon.run(hw)
        }));

        let halt = match outcome {
            Ok(()) => unreachable!("beacon loop returned"),
            Err(payload) => match payload.downcast::<Halt>() {
                Ok(halt) => *halt,
                Err(other) => panic::resume_unwind(other),
            },
        };

        let (stop_reason, stop_detail) = match halt {
            Halt::PhaseLimit => (StopReason::PhaseLimit, None),
            Halt::Stall { addr, polls } => (
                StopReason::UartStall,
                Some(format!("register {:#010x} polled {} times", addr, polls)),
            ),
            Halt::Fault(e @ SimulationError::MemoryViolation(_)) => {
                (StopReason::MemoryViolation, Some(e.to_string()))
            }
            Halt::Fault(e @ SimulationError::UnalignedAccess(_)) => {
                (StopReason::UnalignedAccess, Some(e.to_string()))
            }
        };

        let report = self.report(beacon, stop_reason, stop_detail);
        info!("Stop reason: {:?}", report.stop_reason);
        info!("Phases: {}", report.phases);
        info!("Bus cycles: {}", report.bus_cycles);
        info!("LED transitions: {}", report.led_transitions);
        report
    }

    fn report(
        &self,
        beacon: &Beacon,
        stop_reason: StopReason,
        stop_detail: Option<String>,
    ) -> RunReport {
        let bus = self.hw.bus();
        let pin = beacon.led().pin().index();
        let led_transitions = bus.sio().map(|s| s.transitions(pin)).unwrap_or(0);
        let (uart_pending, overrun_writes) = bus
            .uart0()
            .map(|u| (u.pending(), u.overrun_writes()))
            .unwrap_or((0, 0));

        RunReport {
            stop_reason,
            stop_detail,
            phases: self.hw.phases(),
            bus_cycles: self.hw.cycles(),
            uart_tx: String::from_utf8_lossy(&self.uart_bytes()).into_owned(),
            uart_pending,
            led_transitions,
            overrun_writes,
            trace_events: self.hw.trace().len(),
            trace_truncated: self.hw.trace().is_truncated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SystemBus;
    use crate::hardware::Budget;

    #[test]
    fn test_phase_limit_report() {
        let hw = SimHardware::new(SystemBus::rp2040(), Budget::phases(4));
        let mut machine = Machine::new(hw);
        let report = machine.run(&Beacon::pico(), BeaconOptions::default());

        assert_eq!(report.stop_reason, StopReason::PhaseLimit);
        assert_eq!(report.phases, 4);
        assert_eq!(report.led_transitions, 4);
        assert_eq!(report.overrun_writes, 0);
        assert!(report.uart_tx.starts_with("LED\nO"));
        assert!(!report.trace_truncated);
    }
}
