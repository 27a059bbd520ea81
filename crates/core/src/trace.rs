// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::Serialize;
use std::io::{self, Write};

/// One firmware-visible hardware interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BusEvent {
    Read { addr: u32, value: u32 },
    Write { addr: u32, value: u32 },
    Delay { count: u32 },
}

/// Ordered bus event log, optionally capped.
///
/// Once the cap is hit further events are discarded and the trace is marked
/// truncated; property checks then only see the recorded prefix.
#[derive(Debug, Default, Clone)]
pub struct Trace {
    events: Vec<BusEvent>,
    limit: Option<usize>,
    truncated: bool,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn record(&mut self, event: BusEvent) {
        if let Some(limit) = self.limit {
            if self.events.len() >= limit {
                if !self.truncated {
                    tracing::warn!(limit, "Trace limit reached; further bus events dropped");
                }
                self.truncated = true;
                return;
            }
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// One JSON object per line.
    pub fn write_jsonl<W: Write>(&self, mut out: W) -> io::Result<()> {
        for event in &self.events {
            serde_json::to_writer(&mut out, event)?;
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}
