// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Behavioural properties of the beacon, checked against a recorded bus trace.

use crate::trace::{BusEvent, Trace};
use blinkwire_hal::beacon::Phase;
use blinkwire_hal::regs::{sio, UartFlags, SIO_GPIO_OE, SIO_GPIO_OUT, UART_DR, UART_FR};
use blinkwire_hal::{Beacon, Pin, Uart};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyViolation {
    #[error("GPIO {pin} output was never enabled")]
    OutputNeverEnabled { pin: u8 },
    #[error("event {index}: GPIO_OE written ({value:#010x}) without reading it first")]
    BlindOutputEnableWrite { index: usize, value: u32 },
    #[error("event {index}: GPIO_OE written {actual:#010x}, expected {expected:#010x}")]
    OutputEnableClobbered {
        index: usize,
        expected: u32,
        actual: u32,
    },
    #[error("event {index}: UARTDR written without polling UARTFR")]
    WriteWithoutPoll { index: usize },
    #[error("event {index}: UARTDR written while TXFF was set")]
    WriteWhileFull { index: usize },
    #[error("phase {phase}: byte {byte:#04x} sent with LED high={high}")]
    UnexpectedByte { phase: usize, byte: u8, high: bool },
    #[error("phase {phase}: sent {actual:?}, expected {expected:?}")]
    PhaseMismatch {
        phase: usize,
        expected: String,
        actual: String,
    },
}

/// Every write to GPIO_OE must be `previous | mask`, and there must be one
/// unless the trace was truncated before it could be recorded.
pub fn check_output_enable(trace: &Trace, pin: Pin) -> Result<(), PropertyViolation> {
    let oe = sio(SIO_GPIO_OE);
    let mut last_read = None;
    let mut enabled = false;

    for (index, event) in trace.events().iter().enumerate() {
        match *event {
            BusEvent::Read { addr, value } if addr == oe => last_read = Some(value),
            BusEvent::Write { addr, value } if addr == oe => {
                let Some(before) = last_read.take() else {
                    return Err(PropertyViolation::BlindOutputEnableWrite { index, value });
                };
                let expected = before | pin.mask();
                if value != expected {
                    return Err(PropertyViolation::OutputEnableClobbered {
                        index,
                        expected,
                        actual: value,
                    });
                }
                enabled = true;
            }
            _ => {}
        }
    }

    if enabled || trace.is_truncated() {
        Ok(())
    } else {
        Err(PropertyViolation::OutputNeverEnabled { pin: pin.index() })
    }
}

/// Each UARTDR write needs a UARTFR read since the previous one, and the
/// latest such read must have shown room in the FIFO.
pub fn check_poll_before_write(trace: &Trace, uart: Uart) -> Result<(), PropertyViolation> {
    let fr = uart.base() + UART_FR;
    let dr = uart.base() + UART_DR;
    let mut last_flags = None;

    for (index, event) in trace.events().iter().enumerate() {
        match *event {
            BusEvent::Read { addr, value } if addr == fr => {
                last_flags = Some(UartFlags::from_bits_retain(value));
            }
            BusEvent::Write { addr, .. } if addr == dr => {
                match last_flags.take() {
                    None => return Err(PropertyViolation::WriteWithoutPoll { index }),
                    Some(flags) if flags.contains(UartFlags::TXFF) => {
                        return Err(PropertyViolation::WriteWhileFull { index })
                    }
                    Some(_) => {}
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Phases are delimited by delays. Phase 0 is LED on; the final phase may be
/// cut short by the stop, so its bytes only need to be a prefix.
pub fn check_transmit_pattern(
    trace: &Trace,
    pin: Pin,
    uart: Uart,
) -> Result<(), PropertyViolation> {
    let out = sio(SIO_GPIO_OUT);
    let dr = uart.base() + UART_DR;
    let mut high = false;
    let mut phase = Phase::LedOn;
    let mut phase_index = 0;
    let mut sent = Vec::new();

    for event in trace.events() {
        match *event {
            BusEvent::Write { addr, value } if addr == out => high = value & pin.mask() != 0,
            BusEvent::Write { addr, value } if addr == dr => {
                let byte = value as u8;
                if high != (phase == Phase::LedOn) {
                    return Err(PropertyViolation::UnexpectedByte {
                        phase: phase_index,
                        byte,
                        high,
                    });
                }
                sent.push(byte);
            }
            BusEvent::Delay { .. } => {
                compare_phase(phase_index, phase.message(), &sent, false)?;
                sent.clear();
                phase = phase.next();
                phase_index += 1;
            }
            _ => {}
        }
    }

    compare_phase(phase_index, phase.message(), &sent, true)
}

fn compare_phase(
    phase: usize,
    expected: &[u8],
    actual: &[u8],
    partial: bool,
) -> Result<(), PropertyViolation> {
    let ok = if partial {
        expected.starts_with(actual)
    } else {
        expected == actual
    };
    if ok {
        Ok(())
    } else {
        Err(PropertyViolation::PhaseMismatch {
            phase,
            expected: String::from_utf8_lossy(expected).into_owned(),
            actual: String::from_utf8_lossy(actual).into_owned(),
        })
    }
}

/// Runs every property; an empty result means the trace is clean.
pub fn check_all(trace: &Trace, beacon: &Beacon) -> Vec<PropertyViolation> {
    let pin = beacon.led().pin();
    [
        check_output_enable(trace, pin),
        check_poll_before_write(trace, beacon.uart()),
        check_transmit_pattern(trace, pin, beacon.uart()),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect()
}
