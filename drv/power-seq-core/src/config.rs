// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board configuration for the sequencer.

use drv_power_seq_api::notifications::MAX_SIGNALS;

use crate::platform::SignalBackend;
use crate::pp5000::Pp5000Control;

/// Where a power signal is read from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignalSource {
    Gpio(u16),
    /// eSPI virtual wire.
    VirtualWire(u8),
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct SignalFlags: u8 {
        /// The signal is asserted when the line reads high.
        const ACTIVE_HIGH = 1 << 0;
        /// Leave the interrupt off at boot; the chipset handler turns it on
        /// when it starts caring.
        const DISABLE_AT_BOOT = 1 << 1;
    }
}

#[derive(Copy, Clone, Debug)]
pub struct PowerSignalInfo {
    pub source: SignalSource,
    pub flags: SignalFlags,
    pub name: &'static str,
}

impl PowerSignalInfo {
    pub const fn gpio(pin: u16, flags: SignalFlags, name: &'static str) -> Self {
        Self {
            source: SignalSource::Gpio(pin),
            flags,
            name,
        }
    }

    pub const fn wire(wire: u8, flags: SignalFlags, name: &'static str) -> Self {
        Self {
            source: SignalSource::VirtualWire(wire),
            flags,
            name,
        }
    }

    /// Raw line level.
    pub fn level<B: SignalBackend + ?Sized>(&self, backend: &B) -> bool {
        match self.source {
            SignalSource::Gpio(pin) => backend.gpio_get_level(pin),
            SignalSource::VirtualWire(wire) => backend.vw_get_wire(wire),
        }
    }

    pub fn is_asserted<B: SignalBackend + ?Sized>(&self, backend: &B) -> bool {
        self.level(backend) == self.flags.contains(SignalFlags::ACTIVE_HIGH)
    }

    pub fn set_interrupt<B: SignalBackend + ?Sized>(
        &self,
        backend: &mut B,
        enabled: bool,
    ) {
        match self.source {
            SignalSource::Gpio(pin) => backend.gpio_set_interrupt(pin, enabled),
            SignalSource::VirtualWire(wire) => {
                backend.vw_set_interrupt(wire, enabled)
            }
        }
    }
}

/// Everything the sequencer needs to know about the board it runs on.
///
/// Optional capabilities are off unless the board turns them on; the host
/// and console commands for a capability that is off report that the
/// command doesn't exist.
#[derive(Copy, Clone, Debug)]
pub struct PowerConfig {
    /// Signal `i` is bit `i` of the signal snapshot. At most
    /// [`MAX_SIGNALS`], each having its own notification bit.
    pub signals: &'static [PowerSignalInfo],
    /// Initial hibernate delay in seconds. `None` means the board can't
    /// hibernate and the G3 idle policy is never run.
    pub hibernate_delay: Option<u32>,
    pub pause_in_s5: bool,
    /// Whether the idle policy may cut off the battery.
    pub battery_cutoff: bool,
    /// Whether host wake masks are programmed after state changes.
    pub host_wake_mask: bool,
    pub host_sleep_events: bool,
    /// Bring-up log of signal edges.
    pub signal_log: bool,
    /// Interrupts per second on one signal that count as a storm.
    pub storm_threshold: Option<u32>,
    /// Shared 5 V rail, if the sequencer arbitrates one. Its requests are
    /// carried across warm jumps.
    pub pp5000: Option<&'static Pp5000Control>,
}

impl PowerConfig {
    /// Panics (at compile time, for a `static`) if there are more signals
    /// than notification bits.
    pub const fn new(signals: &'static [PowerSignalInfo]) -> Self {
        assert!(signals.len() <= MAX_SIGNALS, "too many power signals");
        Self {
            signals,
            hibernate_delay: None,
            pause_in_s5: false,
            battery_cutoff: false,
            host_wake_mask: false,
            host_sleep_events: false,
            signal_log: false,
            storm_threshold: None,
            pp5000: None,
        }
    }
}

/// Folds the current level of every configured signal into a snapshot.
pub fn sample<B: SignalBackend + ?Sized>(
    signals: &[PowerSignalInfo],
    backend: &B,
) -> u32 {
    signals
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_asserted(backend))
        .fold(0, |acc, (i, _)| acc | 1 << i)
}
