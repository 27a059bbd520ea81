// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The firmware's main loop: LED on + "LED\n", LED off + "O", forever.

use crate::delay::DEFAULT_DELAY;
use crate::gpio::{Level, OutputPin, Pin};
use crate::regs::LED_PIN;
use crate::uart::{Uart, UART0};
use crate::Hardware;

pub const ON_MESSAGE: &[u8] = b"LED\n";
pub const OFF_MESSAGE: &[u8] = b"O";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LedOn,
    LedOff,
}

impl Phase {
    pub const fn next(self) -> Self {
        match self {
            Phase::LedOn => Phase::LedOff,
            Phase::LedOff => Phase::LedOn,
        }
    }

    pub const fn level(self) -> Level {
        match self {
            Phase::LedOn => Level::High,
            Phase::LedOff => Level::Low,
        }
    }

    pub const fn message(self) -> &'static [u8] {
        match self {
            Phase::LedOn => ON_MESSAGE,
            Phase::LedOff => OFF_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beacon {
    led: OutputPin,
    uart: Uart,
    delay: u32,
}

impl Beacon {
    pub const fn new(led: OutputPin, uart: Uart, delay: u32) -> Self {
        Self { led, uart, delay }
    }

    /// GPIO 25 and UART0, as wired on a Pico.
    pub const fn pico() -> Self {
        Self::new(OutputPin::new(Pin::new(LED_PIN)), UART0, DEFAULT_DELAY)
    }

    pub const fn with_delay(self, delay: u32) -> Self {
        Self { delay, ..self }
    }

    pub const fn led(&self) -> OutputPin {
        self.led
    }

    pub const fn uart(&self) -> Uart {
        self.uart
    }

    pub const fn delay(&self) -> u32 {
        self.delay
    }

    /// One-time output-enable configuration.
    pub fn setup<H: Hardware>(&self, hw: &mut H) {
        self.led.enable_output(hw);
    }

    /// Drive the pin, send the phase's message, then spin.
    pub fn run_phase<H: Hardware>(&self, hw: &mut H, phase: Phase) {
        self.led.set(hw, phase.level());
        self.uart.puts(hw, phase.message());
        hw.spin(self.delay);
    }

    pub fn run<H: Hardware>(&self, hw: &mut H) -> ! {
        self.setup(hw);
        let mut phase = Phase::LedOn;
        loop {
            self.run_phase(hw, phase);
            phase = phase.next();
        }
    }
}

impl Default for Beacon {
    fn default() -> Self {
        Self::pico()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::{sio, uart0, SIO_GPIO_OE, SIO_GPIO_OUT, UART_DR};
    use crate::testing::{Access, MockHardware};
    use std::panic::{self, AssertUnwindSafe};

    struct OutOfSpins;

    /// Stops the endless loop after a fixed number of delays.
    struct SpinLimited {
        inner: MockHardware,
        spins_left: u32,
    }

    impl Hardware for SpinLimited {
        fn read32(&mut self, addr: u32) -> u32 {
            self.inner.read32(addr)
        }

        fn write32(&mut self, addr: u32, value: u32) {
            self.inner.write32(addr, value)
        }

        fn spin(&mut self, count: u32) {
            self.inner.spin(count);
            self.spins_left -= 1;
            if self.spins_left == 0 {
                panic::resume_unwind(Box::new(OutOfSpins));
            }
        }
    }

    #[test]
    fn test_phase_alternates() {
        assert_eq!(Phase::LedOn.next(), Phase::LedOff);
        assert_eq!(Phase::LedOff.next(), Phase::LedOn);
        assert_eq!(Phase::LedOn.level(), Level::High);
        assert_eq!(Phase::LedOff.message(), b"O");
    }

    #[test]
    fn test_run_phase_order() {
        let mut hw = MockHardware::default();
        let beacon = Beacon::pico();

        beacon.run_phase(&mut hw, Phase::LedOn);

        let out = sio(SIO_GPIO_OUT);
        let dr = uart0(UART_DR);
        let significant: Vec<_> = hw
            .log
            .iter()
            .filter(|a| matches!(a, Access::Write(..) | Access::Spin(_)))
            .copied()
            .collect();
        assert_eq!(
            significant,
            vec![
                Access::Write(out, 1 << 25),
                Access::Write(dr, b'L' as u32),
                Access::Write(dr, b'E' as u32),
                Access::Write(dr, b'D' as u32),
                Access::Write(dr, b'\n' as u32),
                Access::Spin(DEFAULT_DELAY),
            ]
        );
    }

    #[test]
    fn test_run_configures_once_and_loops() {
        let mut hw = SpinLimited {
            inner: MockHardware::default(),
            spins_left: 6,
        };
        let beacon = Beacon::pico().with_delay(3);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            beacon.run(&mut hw);
        }));
        let payload = result.expect_err("beacon loop must not return");
        assert!(payload.downcast_ref::<OutOfSpins>().is_some());

        let oe_writes = hw.inner.writes_to(sio(SIO_GPIO_OE));
        assert_eq!(oe_writes, vec![1 << 25]);

        let sent: Vec<u8> = hw
            .inner
            .writes_to(uart0(UART_DR))
            .into_iter()
            .map(|v| v as u8)
            .collect();
        assert_eq!(sent, b"LED\nOLED\nOLED\nO".to_vec());

        let levels: Vec<u32> = hw.inner.writes_to(sio(SIO_GPIO_OUT));
        assert_eq!(levels, vec![1 << 25, 0, 1 << 25, 0, 1 << 25, 0]);
        assert!(hw
            .inner
            .log
            .iter()
            .filter_map(|a| match a {
                Access::Spin(n) => Some(*n),
                _ => None,
            })
            .all(|n| n == 3));
    }
}
