// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common definitions for the chipset power sequencer, shared by the
//! sequencer itself, the chipset-specific handlers that plug into it, and
//! the tasks that ask it questions.

#![cfg_attr(not(test), no_std)]

pub mod host;

use num_derive::FromPrimitive;
use zerocopy::{Immutable, IntoBytes, KnownLayout};

/// Global power state of the platform.
///
/// The discriminant doubles as the state index printed by the sequencer's
/// diagnostics, so the order here must not change.
#[derive(
    Copy,
    Clone,
    Debug,
    FromPrimitive,
    PartialEq,
    Eq,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(u8)]
pub enum PowerState {
    /// Mechanical off.
    G3 = 0,
    /// Soft off.
    S5,
    /// Suspend to RAM.
    S3,
    /// Fully on.
    S0,
    /// Low-power idle standby.
    S0ix,

    // Transitions. These are states in their own right, so that "on the way
    // from A to B" can be observed from outside.
    G3S5,
    S5S3,
    S3S0,
    S0S3,
    S3S5,
    S5G3,
    S0ixS0,
    S0S0ix,
}

impl PowerState {
    pub const ALL: [PowerState; 13] = [
        PowerState::G3,
        PowerState::S5,
        PowerState::S3,
        PowerState::S0,
        PowerState::S0ix,
        PowerState::G3S5,
        PowerState::S5S3,
        PowerState::S3S0,
        PowerState::S0S3,
        PowerState::S3S5,
        PowerState::S5G3,
        PowerState::S0ixS0,
        PowerState::S0S0ix,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Name as printed on the console. Host-side test tooling matches on
    /// these strings, so they are part of the interface.
    pub fn name(self) -> &'static str {
        match self {
            PowerState::G3 => "G3",
            PowerState::S5 => "S5",
            PowerState::S3 => "S3",
            PowerState::S0 => "S0",
            PowerState::S0ix => "S0ix",
            PowerState::G3S5 => "G3->S5",
            PowerState::S5S3 => "S5->S3",
            PowerState::S3S0 => "S3->S0",
            PowerState::S0S3 => "S0->S3",
            PowerState::S3S5 => "S3->S5",
            PowerState::S5G3 => "S5->G3",
            PowerState::S0ixS0 => "S0ix->S0",
            PowerState::S0S0ix => "S0->S0ix",
        }
    }

    pub fn is_transition(self) -> bool {
        self.index() >= PowerState::G3S5.index()
    }

    /// The coarse classes a caller must be willing to accept for
    /// [`PowerState::in_state`] to match. Transitions require both of their
    /// endpoint classes.
    pub fn required_classes(self) -> ChipsetState {
        match self {
            PowerState::G3 => ChipsetState::HARD_OFF,
            PowerState::G3S5 | PowerState::S5G3 => ChipsetState::ANY_OFF,
            PowerState::S5 => ChipsetState::SOFT_OFF,
            PowerState::S5S3 | PowerState::S3S5 => {
                ChipsetState::SOFT_OFF | ChipsetState::SUSPEND
            }
            PowerState::S3 => ChipsetState::SUSPEND,
            PowerState::S3S0 | PowerState::S0S3 => {
                ChipsetState::SUSPEND | ChipsetState::ON
            }
            PowerState::S0 => ChipsetState::ON,
            PowerState::S0ixS0 | PowerState::S0S0ix => {
                ChipsetState::ON | ChipsetState::STANDBY
            }
            PowerState::S0ix => ChipsetState::STANDBY,
        }
    }

    /// The single coarse class this state is in or headed toward.
    pub fn target_class(self) -> ChipsetState {
        match self {
            PowerState::G3 | PowerState::S5G3 => ChipsetState::HARD_OFF,
            PowerState::S5 | PowerState::G3S5 | PowerState::S3S5 => {
                ChipsetState::SOFT_OFF
            }
            PowerState::S3 | PowerState::S5S3 | PowerState::S0S3 => {
                ChipsetState::SUSPEND
            }
            PowerState::S0ix | PowerState::S0S0ix => ChipsetState::STANDBY,
            PowerState::S0 | PowerState::S3S0 | PowerState::S0ixS0 => {
                ChipsetState::ON
            }
        }
    }

    /// Returns true if every class this state occupies is in `mask`.
    pub fn in_state(self, mask: ChipsetState) -> bool {
        mask.contains(self.required_classes())
    }

    /// Returns true if the class this state is in, or is moving toward, is
    /// in `mask`.
    pub fn in_or_transitioning_to(self, mask: ChipsetState) -> bool {
        mask.intersects(self.target_class())
    }
}

bitflags::bitflags! {
    /// Coarse chipset phases, for callers that don't care about the exact
    /// (possibly transitional) [`PowerState`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ChipsetState: u8 {
        const HARD_OFF = 1 << 0;
        const SOFT_OFF = 1 << 1;
        const SUSPEND = 1 << 2;
        const ON = 1 << 3;
        const STANDBY = 1 << 4;

        const ANY_OFF = Self::HARD_OFF.bits() | Self::SOFT_OFF.bits();
        const ANY_SUSPEND = Self::SUSPEND.bits() | Self::STANDBY.bits();
    }
}

bitflags::bitflags! {
    /// Host event mask, one bit per host event (event `n` is bit `n - 1`).
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct HostEventMask: u64 {
        const LID_CLOSED = 1 << 0;
        const LID_OPEN = 1 << 1;
        const POWER_BUTTON = 1 << 2;
        const AC_CONNECTED = 1 << 3;
        const AC_DISCONNECTED = 1 << 4;
        const KEY_PRESSED = 1 << 5;
        const MODE_CHANGE = 1 << 28;

        const _ = !0;
    }
}

/// Wake mask for S0ix when the host never programmed one, for compatibility
/// with firmware that predates lazy wake masks.
pub const DEFAULT_WAKE_MASK_S0IX: HostEventMask =
    HostEventMask::LID_OPEN.union(HostEventMask::MODE_CHANGE);

/// Sleep/resume notifications posted by the host.
#[derive(Copy, Clone, Debug, FromPrimitive, PartialEq, Eq)]
#[repr(u8)]
pub enum HostSleepEvent {
    S3Suspend = 1,
    S3Resume = 2,
    S0ixSuspend = 3,
    S0ixResume = 4,
    S3WakeableSuspend = 5,
}

impl HostSleepEvent {
    pub fn is_suspend(self) -> bool {
        matches!(
            self,
            HostSleepEvent::S3Suspend
                | HostSleepEvent::S0ixSuspend
                | HostSleepEvent::S3WakeableSuspend
        )
    }

    pub fn is_resume(self) -> bool {
        matches!(self, HostSleepEvent::S3Resume | HostSleepEvent::S0ixResume)
    }
}

/// Parameters passed along with a host sleep event to the chipset handler,
/// which may report back how many sleep transitions it observed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HostSleepEventContext {
    pub sleep_transitions: u32,
    pub sleep_timeout_ms: u16,
}

/// What the board wants done about a platform that has idled in G3.
#[derive(Copy, Clone, Debug, FromPrimitive, PartialEq, Eq)]
pub enum IdleAction {
    Ignore = 0,
    Hibernate,
    CutOff,
}

#[derive(Copy, Clone, Debug, FromPrimitive, Eq, PartialEq)]
pub enum PowerError {
    /// The wanted input signals did not all assert before the deadline.
    Timeout = 1,
}

#[derive(Copy, Clone, Debug, FromPrimitive, Eq, PartialEq)]
pub enum ConsoleError {
    InvalidArgCount = 1,
    Param1,
    Param2,
    Inval,
    UnknownCommand,
}

/// Notification bits understood by the sequencer.
///
/// Interrupts and other tasks reach the sequencer only by posting these; all
/// resulting state changes happen in the sequencer's own task.
pub mod notifications {
    /// The deadline passed to the wait has arrived.
    pub const TIMER: u32 = 1 << 0;
    /// Something (typically the power button) wants us out of G3.
    pub const EXIT_HARD_OFF: u32 = 1 << 1;
    /// External power was connected or removed.
    pub const AC_CHANGE: u32 = 1 << 2;
    pub const LID_CHANGE: u32 = 1 << 3;
    /// A host or console request is waiting to be served.
    pub const REQUEST: u32 = 1 << 4;

    pub const SIGNAL_IRQ_SHIFT: u32 = 8;
    pub const MAX_SIGNALS: usize = 24;
    pub const SIGNAL_IRQ_MASK: u32 = !0 << SIGNAL_IRQ_SHIFT;

    /// Notification bit for an edge on power signal `index`.
    pub const fn signal_irq(index: usize) -> u32 {
        1 << (SIGNAL_IRQ_SHIFT + index as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;
    use proptest::prelude::*;

    const CLASSES: [ChipsetState; 5] = [
        ChipsetState::HARD_OFF,
        ChipsetState::SOFT_OFF,
        ChipsetState::SUSPEND,
        ChipsetState::ON,
        ChipsetState::STANDBY,
    ];

    #[test]
    fn indices_follow_declaration_order() {
        for (i, state) in PowerState::ALL.iter().enumerate() {
            assert_eq!(state.index() as usize, i);
            assert_eq!(PowerState::from_usize(i), Some(*state));
        }
        assert_eq!(PowerState::from_u8(13), None);
    }

    #[test]
    fn names_match_console_format() {
        assert_eq!(PowerState::G3.name(), "G3");
        assert_eq!(PowerState::S5G3.name(), "S5->G3");
        assert_eq!(PowerState::S0S0ix.name(), "S0->S0ix");
    }

    #[test]
    fn transitions_need_both_endpoints() {
        assert!(!PowerState::G3S5.in_state(ChipsetState::HARD_OFF));
        assert!(!PowerState::G3S5.in_state(ChipsetState::SOFT_OFF));
        assert!(PowerState::G3S5.in_state(ChipsetState::ANY_OFF));
        assert!(PowerState::S3S0.in_state(
            ChipsetState::SUSPEND | ChipsetState::ON
        ));
        assert!(PowerState::S0ix.in_state(ChipsetState::ANY_SUSPEND));
    }

    #[test]
    fn transitions_count_as_their_target() {
        assert!(PowerState::S5G3.in_or_transitioning_to(ChipsetState::HARD_OFF));
        assert!(PowerState::S0S3.in_or_transitioning_to(ChipsetState::SUSPEND));
        assert!(!PowerState::S0S3.in_or_transitioning_to(ChipsetState::ON));
        assert!(PowerState::S0ixS0.in_or_transitioning_to(ChipsetState::ON));
    }

    #[test]
    fn default_s0ix_wake_mask() {
        assert_eq!(DEFAULT_WAKE_MASK_S0IX.bits(), (1 << 1) | (1 << 28));
    }

    #[test]
    fn sleep_events_classify() {
        for raw in 1..=5u8 {
            let ev = HostSleepEvent::from_u8(raw).unwrap();
            assert_ne!(ev.is_suspend(), ev.is_resume());
        }
        assert_eq!(HostSleepEvent::from_u8(0), None);
        assert_eq!(HostSleepEvent::from_u8(6), None);
    }

    #[test]
    fn signal_irq_bits_do_not_collide() {
        let fixed = notifications::TIMER
            | notifications::EXIT_HARD_OFF
            | notifications::AC_CHANGE
            | notifications::LID_CHANGE
            | notifications::REQUEST;
        for i in 0..notifications::MAX_SIGNALS {
            let bit = notifications::signal_irq(i);
            assert_eq!(bit & fixed, 0);
            assert_eq!(bit & notifications::SIGNAL_IRQ_MASK, bit);
        }
    }

    proptest! {
        #[test]
        fn target_class_is_exclusive(ndx in 0usize..13, a in 0usize..5, b in 0usize..5) {
            prop_assume!(a != b);
            let state = PowerState::ALL[ndx];
            prop_assert!(
                !(state.in_or_transitioning_to(CLASSES[a])
                    && state.in_or_transitioning_to(CLASSES[b]))
            );
        }

        #[test]
        fn in_state_implies_heading_there(ndx in 0usize..13, bits in 0u8..32) {
            let state = PowerState::ALL[ndx];
            let mask = ChipsetState::from_bits_truncate(bits);
            if state.in_state(mask) {
                prop_assert!(state.in_or_transitioning_to(mask));
            }
        }
    }
}
