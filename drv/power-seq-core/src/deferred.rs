// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deferred calls.
//!
//! A `DeferredCalls<E>` tracks one pending deadline per variant of `E`. The
//! sequencer folds the earliest of them into every wait it makes, so a
//! deferred call runs in the sequencer's own task, between events, and never
//! concurrently with anything the sequencer is doing.
//!
//! Scheduling a call that is already pending replaces its deadline, which is
//! how back-to-back state changes collapse into one wake-mask update.

use enum_map::{EnumArray, EnumMap};

pub struct DeferredCalls<E: EnumArray<Slot>> {
    slots: EnumMap<E, Slot>,
}

#[derive(Copy, Clone, Default)]
pub struct Slot {
    deadline: Option<(u64, Option<u64>)>,
    fired: bool,
}

impl<E: EnumArray<Slot> + Copy> DeferredCalls<E> {
    pub fn new() -> Self {
        Self {
            slots: EnumMap::default(),
        }
    }

    /// Arranges for `which` to fire at `deadline`, and then every `period`
    /// after it actually fired if `period` is given.
    pub fn schedule(&mut self, which: E, deadline: u64, period: Option<u64>) {
        self.slots[which].deadline = Some((deadline, period));
    }

    pub fn deadline(&self, which: E) -> Option<u64> {
        self.slots[which].deadline.map(|(d, _)| d)
    }

    /// Returns true if `which` was pending.
    pub fn cancel(&mut self, which: E) -> bool {
        self.slots[which].deadline.take().is_some()
    }

    pub fn earliest(&self) -> Option<u64> {
        self.slots
            .values()
            .filter_map(|slot| slot.deadline)
            .map(|(d, _)| d)
            .min()
    }

    /// Marks everything due at `now` as fired, rescheduling periodic calls.
    pub fn poll(&mut self, now: u64) {
        for slot in self.slots.values_mut() {
            if let Some((d, period)) = slot.deadline {
                if d <= now {
                    slot.deadline = period.map(|p| (now.saturating_add(p), period));
                    slot.fired = true;
                }
            }
        }
    }

    /// Returns the calls that have fired since last asked, in declaration
    /// order. A call that fired more than once shows up once.
    pub fn iter_fired(&mut self) -> impl Iterator<Item = E> + '_ {
        self.slots.iter_mut().filter_map(|(e, slot)| {
            if core::mem::replace(&mut slot.fired, false) {
                Some(e)
            } else {
                None
            }
        })
    }
}

impl<E: EnumArray<Slot> + Copy> Default for DeferredCalls<E> {
    fn default() -> Self {
        Self::new()
    }
}
