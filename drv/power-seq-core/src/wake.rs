// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host wake mask maintenance.

use drv_power_seq_api::{HostEventMask, PowerState, DEFAULT_WAKE_MASK_S0IX};
use ringbuf::ringbuf_entry;

use crate::{Deferred, Platform, Sequencer, Trace, WAKE_MASK_SETTLE};

impl<P: Platform> Sequencer<'_, P> {
    /// Programs the wake mask for the current state, returning what was
    /// programmed. Nothing is programmed if the host has claimed the mask,
    /// or if the state has no lazy mask to fall back on.
    pub fn update_wake_mask(&mut self) -> Option<HostEventMask> {
        let state = self.core.state;
        let mask = if state == PowerState::S0 {
            HostEventMask::empty()
        } else if self.platform.active_wake_mask_set_by_host() {
            return None;
        } else {
            self.platform.lazy_wake_mask(state)?
        };

        // Hosts that predate lazy wake masks never set one for S0ix.
        let mask = if state == PowerState::S0ix && mask.is_empty() {
            DEFAULT_WAKE_MASK_S0IX
        } else {
            mask
        };

        ringbuf_entry!(self.core.trace, Trace::WakeMask(mask.bits()));
        self.platform.set_wake_mask(mask);
        Some(mask)
    }

    /// Updates the wake mask a little after a state change. Changes in
    /// quick succession only update it once.
    pub(crate) fn schedule_wake_mask_update(&mut self) {
        if !self.core.config.host_wake_mask {
            return;
        }
        let at = self.platform.now().saturating_add(WAKE_MASK_SETTLE);
        self.core.deferred.schedule(Deferred::WakeMask, at, None);
    }
}
