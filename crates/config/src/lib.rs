// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SCHEMA_VERSION: &str = "1.0";

/// Depth of the PL011 TX FIFO on the RP2040.
pub const MAX_UART_FIFO_DEPTH: usize = 32;

/// Approximate in-memory size of one recorded bus event.
pub const TRACE_EVENT_BYTES: u64 = 16;

fn default_fifo_depth() -> usize {
    MAX_UART_FIFO_DEPTH
}

fn default_drain_interval() -> Option<u32> {
    Some(8)
}

fn default_delay() -> u32 {
    10
}

/// Simulated board: SIO GPIO plus UART0.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    /// Used when UARTLCRH.FEN is set or `uart_fifo_enabled` forces it;
    /// otherwise the PL011 holds one byte.
    #[serde(default = "default_fifo_depth")]
    pub uart_fifo_depth: usize,
    /// Treat the TX FIFO as enabled even though the firmware leaves FEN clear.
    #[serde(default)]
    pub uart_fifo_enabled: bool,
    /// Bus cycles per byte shifted out. `null` means the line never drains.
    #[serde(default = "default_drain_interval")]
    pub uart_drain_interval: Option<u32>,
    /// Only shift bytes out once UARTEN and TXE are set.
    #[serde(default)]
    pub require_uart_enable: bool,
    /// GPIO_OE value at reset.
    #[serde(default)]
    pub gpio_oe_reset: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            uart_fifo_depth: default_fifo_depth(),
            uart_fifo_enabled: false,
            uart_drain_interval: default_drain_interval(),
            require_uart_enable: false,
            gpio_oe_reset: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FirmwareConfig {
    #[serde(default)]
    pub uart_init: bool,
    #[serde(default = "default_delay")]
    pub delay: u32,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            uart_init: false,
            delay: default_delay(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    /// Number of completed beacon phases (one delay each) before stopping.
    pub max_phases: u64,
    /// Consecutive reads of one register before the run counts as stalled.
    #[serde(default)]
    pub max_polls: Option<u64>,
    /// Cap on recorded bus events, e.g. "4MB".
    #[serde(default)]
    pub max_trace_size: Option<String>,
}

impl Limits {
    pub fn trace_event_limit(&self) -> Result<Option<usize>> {
        match &self.max_trace_size {
            Some(size) => {
                let bytes = parse_size(size)
                    .with_context(|| format!("Invalid limit 'max_trace_size': {:?}", size))?;
                Ok(Some((bytes / TRACE_EVENT_BYTES) as usize))
            }
            None => Ok(None),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Runner failed before simulation started (e.g. scenario parse/validation error).
    ConfigError,
    PhaseLimit,
    UartStall,
    MemoryViolation,
    UnalignedAccess,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartContainsAssertion {
    pub uart_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LedTransitionsAssertion {
    pub min_led_transitions: u64,
}

/// `properties: true` runs every trace property check.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PropertiesAssertion {
    pub properties: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum Assertion {
    UartContains(UartContainsAssertion),
    ExpectedStopReason(StopReasonAssertion),
    MinLedTransitions(LedTransitionsAssertion),
    Properties(PropertiesAssertion),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub schema_version: String,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub firmware: FirmwareConfig,
    pub limits: Limits,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

impl Scenario {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario at {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SCHEMA_VERSION
            );
        }

        if self.limits.max_phases == 0 {
            anyhow::bail!("Limit 'max_phases' must be greater than zero");
        }

        if self.limits.max_polls == Some(0) {
            anyhow::bail!("Limit 'max_polls' must be greater than zero when set");
        }

        self.limits.trace_event_limit()?;

        if self.board.uart_fifo_depth == 0 || self.board.uart_fifo_depth > MAX_UART_FIFO_DEPTH {
            anyhow::bail!(
                "Board 'uart_fifo_depth' must be between 1 and {}",
                MAX_UART_FIFO_DEPTH
            );
        }

        if self.board.uart_drain_interval == Some(0) {
            anyhow::bail!("Board 'uart_drain_interval' must be greater than zero (or null)");
        }

        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
