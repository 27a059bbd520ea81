// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use blinkwire_config::BoardConfig;
use blinkwire_core::bus::SystemBus;
use blinkwire_core::check::{check_all, check_output_enable, check_poll_before_write};
use blinkwire_core::trace::BusEvent;
use blinkwire_core::{BeaconOptions, Budget, Machine, RunReport, SimHardware, StopReason};
use blinkwire_hal::regs::{sio, uart0, SIO_GPIO_OE, UART_DR};
use blinkwire_hal::Beacon;

fn run(
    board: &BoardConfig,
    budget: Budget,
    beacon: &Beacon,
    uart_init: bool,
) -> (Machine, RunReport) {
    let hw = SimHardware::new(SystemBus::from_config(board), budget);
    let mut machine = Machine::new(hw);
    let report = machine.run(beacon, BeaconOptions { uart_init });
    (machine, report)
}

#[test]
fn test_default_board_runs_clean() {
    let beacon = Beacon::pico();
    let (machine, report) = run(&BoardConfig::default(), Budget::phases(20), &beacon, false);

    assert_eq!(report.stop_reason, StopReason::PhaseLimit);
    assert_eq!(report.phases, 20);
    assert_eq!(report.led_transitions, 20);
    assert_eq!(report.overrun_writes, 0);
    assert_eq!(check_all(machine.trace(), &beacon), vec![]);

    // Ten on/off pairs; the last "O" may still be on the wire.
    let expected = "LED\nO".repeat(10);
    assert!(expected.starts_with(&report.uart_tx));
    assert!(report.uart_tx.len() >= expected.len() - 1);
}

#[test]
fn test_output_enable_keeps_other_pins() {
    let board = BoardConfig {
        gpio_oe_reset: 0x0000_F00F,
        ..BoardConfig::default()
    };
    let beacon = Beacon::pico();
    let (machine, _) = run(&board, Budget::phases(4), &beacon, false);

    let sio_model = machine.hardware().bus().sio().unwrap();
    assert_eq!(sio_model.gpio_oe(), 0x0000_F00F | (1 << 25));
    assert_eq!(check_output_enable(machine.trace(), beacon.led().pin()), Ok(()));

    let oe_writes = machine
        .trace()
        .events()
        .iter()
        .filter(|e| matches!(e, BusEvent::Write { addr, .. } if *addr == sio(SIO_GPIO_OE)))
        .count();
    assert_eq!(oe_writes, 1);
}

#[test]
fn test_stalled_uart_blocks_without_writing() {
    let board = BoardConfig {
        uart_drain_interval: None,
        ..BoardConfig::default()
    };
    let beacon = Beacon::pico();
    let budget = Budget::phases(10).with_max_polls(Some(200));
    let (machine, report) = run(&board, budget, &beacon, false);

    assert_eq!(report.stop_reason, StopReason::UartStall);
    assert!(report.stop_detail.unwrap().contains("0x40034018"));
    assert_eq!(report.phases, 0);
    assert_eq!(report.uart_pending, 1);
    assert_eq!(report.overrun_writes, 0);
    assert!(report.uart_tx.is_empty());
    assert_eq!(check_poll_before_write(machine.trace(), beacon.uart()), Ok(()));

    // Only 'L' made it into the holding register.
    let dr_writes = machine
        .trace()
        .events()
        .iter()
        .filter(|e| matches!(e, BusEvent::Write { addr, .. } if *addr == uart0(UART_DR)))
        .count();
    assert_eq!(dr_writes, 1);
}

#[test]
fn test_slow_line_never_overruns() {
    let board = BoardConfig {
        uart_drain_interval: Some(97),
        ..BoardConfig::default()
    };
    let beacon = Beacon::pico().with_delay(1);
    let (machine, report) = run(&board, Budget::phases(12), &beacon, false);

    assert_eq!(report.stop_reason, StopReason::PhaseLimit);
    assert_eq!(report.overrun_writes, 0);
    assert_eq!(check_all(machine.trace(), &beacon), vec![]);
}

#[test]
fn test_strict_uart_needs_init() {
    let board = BoardConfig {
        require_uart_enable: true,
        ..BoardConfig::default()
    };
    let beacon = Beacon::pico();
    let budget = Budget::phases(6).with_max_polls(Some(500));

    let (_, held) = run(&board, budget, &beacon, false);
    assert_eq!(held.stop_reason, StopReason::UartStall);
    assert!(held.uart_tx.is_empty());

    let (machine, sent) = run(&board, budget, &beacon, true);
    assert_eq!(sent.stop_reason, StopReason::PhaseLimit);
    assert!(sent.uart_tx.starts_with("LED\nOLED\n"));
    assert_eq!(check_all(machine.trace(), &beacon), vec![]);

    let uart = machine.hardware().bus().uart0().unwrap();
    assert!(uart
        .control()
        .contains(blinkwire_hal::regs::UartControl::UARTEN));
}

#[test]
fn test_truncated_trace_still_checks() {
    let beacon = Beacon::pico();
    let hw =
        SimHardware::new(SystemBus::rp2040(), Budget::phases(50)).with_trace_limit(Some(100));
    let mut machine = Machine::new(hw);
    let report = machine.run(&beacon, BeaconOptions::default());

    assert!(report.trace_truncated);
    assert_eq!(report.trace_events, 100);
    assert_eq!(report.phases, 50);
    assert_eq!(check_all(machine.trace(), &beacon), vec![]);
}

#[test]
fn test_tiny_trace_cap_reports_no_violations() {
    let beacon = Beacon::pico();
    let hw = SimHardware::new(SystemBus::rp2040(), Budget::phases(4)).with_trace_limit(Some(1));
    let mut machine = Machine::new(hw);
    let report = machine.run(&beacon, BeaconOptions::default());

    assert!(report.trace_truncated);
    assert_eq!(report.trace_events, 1);
    assert_eq!(report.phases, 4);
    assert_eq!(check_all(machine.trace(), &beacon), vec![]);
}

#[test]
fn test_forced_fifo_depth_shapes_the_run() {
    let stalled = |depth| BoardConfig {
        uart_fifo_depth: depth,
        uart_fifo_enabled: true,
        uart_drain_interval: None,
        ..BoardConfig::default()
    };
    let beacon = Beacon::pico();
    let budget = Budget::phases(20).with_max_polls(Some(200));

    let (_, shallow) = run(&stalled(1), budget, &beacon, true);
    assert_eq!(shallow.stop_reason, StopReason::UartStall);
    assert_eq!(shallow.uart_pending, 1);
    assert_eq!(shallow.phases, 0);

    // Six "LED\n" + "O" pairs fill 30 slots, then "LE" fills the rest.
    let (machine, deep) = run(&stalled(32), budget, &beacon, true);
    assert_eq!(deep.stop_reason, StopReason::UartStall);
    assert_eq!(deep.uart_pending, 32);
    assert_eq!(deep.phases, 12);
    assert_eq!(deep.overrun_writes, 0);
    assert_eq!(check_poll_before_write(machine.trace(), beacon.uart()), Ok(()));
}

#[test]
fn test_draining_fifo_polls_less() {
    let board = |depth| BoardConfig {
        uart_fifo_depth: depth,
        uart_fifo_enabled: true,
        ..BoardConfig::default()
    };
    let beacon = Beacon::pico();

    let (_, shallow) = run(&board(1), Budget::phases(20), &beacon, true);
    let (machine, deep) = run(&board(32), Budget::phases(20), &beacon, true);
    assert_eq!(shallow.phases, 20);
    assert_eq!(deep.phases, 20);
    assert!(deep.bus_cycles < shallow.bus_cycles);
    assert_eq!(check_all(machine.trace(), &beacon), vec![]);
}

#[test]
fn test_every_delay_uses_configured_count() {
    let beacon = Beacon::pico().with_delay(7);
    let (machine, report) = run(&BoardConfig::default(), Budget::phases(5), &beacon, false);

    let delays: Vec<u32> = machine
        .trace()
        .events()
        .iter()
        .filter_map(|e| match e {
            BusEvent::Delay { count } => Some(*count),
            _ => None,
        })
        .collect();
    assert_eq!(delays, vec![7; 5]);
    assert_eq!(report.phases, 5);
}
