// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic per-state handling, run when the chipset handler doesn't move.

use drv_power_seq_api::PowerState;
use ringbuf::ringbuf_entry;

use crate::{Platform, Sequencer, Trace, Wake, S5_INACTIVITY_TIMEOUT};

impl<P: Platform> Sequencer<'_, P> {
    pub(crate) fn common_state(&mut self, state: PowerState) -> PowerState {
        match state {
            PowerState::G3 => {
                if self.core.want_g3_exit {
                    self.core.want_g3_exit = false;
                    return PowerState::G3S5;
                }

                self.core.want = 0;
                if self.core.config.hibernate_delay.is_some() {
                    self.g3_idle();
                } else {
                    self.wait_event(None);
                }
            }

            PowerState::S5 => {
                // Anything that wanted us out of G3 has got its wish.
                self.core.want_g3_exit = false;

                self.core.want = 0;
                if self.wait_event(Some(S5_INACTIVITY_TIMEOUT)) == Wake::Timer {
                    return PowerState::S5G3;
                }
            }

            PowerState::S3 | PowerState::S0 | PowerState::S0ix => {
                // The chipset handler notices the real transitions; all we do
                // is wait for it to have something to look at.
                self.core.want = 0;
                self.wait_event(None);
            }

            _ => {}
        }
        state
    }

    /// Commits a state change. Nothing else writes the state.
    pub(crate) fn set_state(&mut self, new: PowerState) {
        let now = self.platform.now();
        let old = self.core.state;

        if new == PowerState::G3 {
            self.core.last_shutdown_time = now;
        }
        // A leftover request must not pull us straight back out of G3 after
        // the next shutdown.
        if new == PowerState::S5S3 {
            self.core.want_g3_exit = false;
        }

        ringbuf_entry!(self.core.trace, Trace::Rtc(now));
        ringbuf_entry!(self.core.trace, Trace::SetState { from: old, to: new });
        self.core.state = new;
    }

    /// Asks to leave G3. Ignored unless we're in G3, in S5, or between
    /// them.
    pub fn exit_hard_off(&mut self) -> bool {
        let state = self.core.state;
        if !matches!(state, PowerState::G3 | PowerState::S5G3 | PowerState::S5)
        {
            return false;
        }
        ringbuf_entry!(self.core.trace, Trace::ExitHardOff(state));
        self.core.want_g3_exit = true;
        true
    }
}
