// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bring-up aids: a log of signal edges, and interrupt storm detection.

use core::fmt::Write;

use drv_power_seq_api::notifications::MAX_SIGNALS;
use ringbuf::ringbuf_entry;

use crate::{Platform, Sequencer, Trace};

pub const SIGNAL_LOG_ENTRIES: usize = 24;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignalLogEntry {
    pub time: u64,
    pub signal: u8,
    pub level: bool,
}

/// Edges seen since the log was last printed. Edges past the capacity are
/// dropped, and the log remembers that it dropped some.
#[derive(Debug, Default)]
pub struct SignalLog {
    entries: heapless::Vec<SignalLogEntry, SIGNAL_LOG_ENTRIES>,
    truncated: bool,
}

impl SignalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, time: u64, signal: u8, level: bool) {
        if self
            .entries
            .push(SignalLogEntry {
                time,
                signal,
                level,
            })
            .is_err()
        {
            self.truncated = true;
        }
    }

    pub fn entries(&self) -> &[SignalLogEntry] {
        &self.entries
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.truncated = false;
    }
}

/// Counts interrupts per signal over an interval.
#[derive(Debug)]
pub struct StormDetector {
    threshold: Option<u32>,
    counts: [u32; MAX_SIGNALS],
}

impl StormDetector {
    pub fn new(threshold: Option<u32>) -> Self {
        Self {
            threshold,
            counts: [0; MAX_SIGNALS],
        }
    }

    /// Counts one interrupt on `signal`. Returns true on the first interrupt
    /// past the threshold, and only on that one until the next reset.
    pub fn tally(&mut self, signal: usize) -> bool {
        let (Some(threshold), Some(count)) =
            (self.threshold, self.counts.get_mut(signal))
        else {
            return false;
        };
        let storm = *count == threshold;
        *count = count.saturating_add(1);
        storm
    }

    pub fn reset(&mut self) {
        self.counts = [0; MAX_SIGNALS];
    }
}

impl<P: Platform> Sequencer<'_, P> {
    /// Prints the edges logged so far, with signal interrupts held off so
    /// that printing doesn't log more edges.
    pub(crate) fn flush_signal_log(&mut self) {
        let config = self.core.config;
        let enabled = self.core.irq_enabled;
        for signal in config.signals {
            signal.set_interrupt(&mut *self.platform, false);
        }

        let log = &self.core.siglog;
        let out = self.platform.console();
        let _ = writeln!(out, "{} signal changes:", log.entries().len());
        let mut last = log.entries().first().map_or(0, |e| e.time);
        for entry in log.entries() {
            let name = config
                .signals
                .get(usize::from(entry.signal))
                .map_or("?", |s| s.name);
            let _ = writeln!(
                out,
                "  {:06}  +{:06}  {} => {}",
                entry.time,
                entry.time.saturating_sub(last),
                name,
                u8::from(entry.level)
            );
            last = entry.time;
        }
        if log.truncated() {
            let _ = writeln!(out, "  SIGNAL LOG TRUNCATED...");
        }

        let entries = log.entries().len() as u8;
        let truncated = log.truncated();
        ringbuf_entry!(
            self.core.trace,
            Trace::SignalLogFlushed { entries, truncated }
        );
        self.core.siglog.clear();

        for (i, signal) in config.signals.iter().enumerate() {
            signal.set_interrupt(&mut *self.platform, enabled & (1 << i) != 0);
        }
    }
}
