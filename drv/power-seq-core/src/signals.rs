// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signal sampling, waiting, and notification handling.

use drv_power_seq_api::{notifications, PowerError, PowerState};
use ringbuf::ringbuf_entry;

use crate::config::sample;
use crate::{
    Deferred, Platform, Sequencer, Trace, DEFAULT_TIMEOUT,
    SIGNAL_LOG_FLUSH_DELAY,
};

/// Why a wait ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Wake {
    /// Something happened that the state handling should look at.
    Event,
    Timer,
}

impl<P: Platform> Sequencer<'_, P> {
    /// Current signal snapshot.
    pub fn signals(&self) -> u32 {
        self.core.signals
    }

    /// Signals being waited for, or 0.
    pub fn want(&self) -> u32 {
        self.core.want
    }

    /// Re-reads every signal.
    pub fn update_signals(&mut self) {
        let new = sample(self.core.config.signals, &*self.platform);
        let mask = self.core.debug_mask;
        if (self.core.signals ^ new) & mask != 0 {
            ringbuf_entry!(self.core.trace, Trace::PowerIn(new));
        }
        self.core.signals = new;
    }

    /// Returns true if every signal in `want` is present; records the
    /// shortfall otherwise.
    pub fn has_signals(&mut self, want: u32) -> bool {
        let got = self.core.signals;
        if got & want == want {
            return true;
        }
        ringbuf_entry!(self.core.trace, Trace::LostInput { want, got });
        false
    }

    /// Waits up to [`DEFAULT_TIMEOUT`] for every signal in `want`.
    pub fn wait_signals(&mut self, want: u32) -> Result<(), PowerError> {
        let r = self.wait_signals_timeout(want, DEFAULT_TIMEOUT);
        if r.is_err() {
            let got = self.core.signals;
            ringbuf_entry!(self.core.trace, Trace::InputTimeout { want, got });
        }
        r
    }

    /// Waits for every signal in `want`, giving up if `timeout` ms pass
    /// with no event at all. Each event that doesn't complete the set
    /// starts the timeout over.
    pub fn wait_signals_timeout(
        &mut self,
        want: u32,
        timeout: u64,
    ) -> Result<(), PowerError> {
        self.core.want = want;
        if want == 0 {
            return Ok(());
        }

        while self.core.signals & want != want {
            if self.wait_event(Some(timeout)) == Wake::Timer {
                // Leave an accurate snapshot behind for whoever handles
                // the timeout.
                self.update_signals();
                return Err(PowerError::Timeout);
            }
        }
        Ok(())
    }

    /// Blocks for up to `timeout` ms (forever if `None`) until something
    /// happens. Deferred calls that come due, requests, and notifications
    /// that don't concern the state handling are dealt with without ending
    /// the wait.
    pub fn wait_event(&mut self, timeout: Option<u64>) -> Wake {
        let deadline = timeout.map(|t| self.platform.now().saturating_add(t));
        loop {
            let wake_at = match (deadline, self.core.deferred.earliest()) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            let bits = self.platform.wait_event(wake_at);
            let now = self.platform.now();

            self.run_deferred(now);

            if self.handle_notification(bits) {
                return Wake::Event;
            }
            if deadline.is_some_and(|d| now >= d) {
                return Wake::Timer;
            }
        }
    }

    pub fn set_signal_interrupt(&mut self, index: usize, enabled: bool) {
        let Some(signal) = self.core.config.signals.get(index) else {
            return;
        };
        signal.set_interrupt(&mut *self.platform, enabled);
        if enabled {
            self.core.irq_enabled |= 1 << index;
        } else {
            self.core.irq_enabled &= !(1 << index);
        }
    }

    /// Returns true if the notification should end a wait.
    fn handle_notification(&mut self, bits: u32) -> bool {
        let mut wake = false;
        let irqs = (bits & notifications::SIGNAL_IRQ_MASK)
            >> notifications::SIGNAL_IRQ_SHIFT;
        if irqs != 0 {
            let count = self.core.config.signals.len();
            for i in (0..count).filter(|i| irqs & (1 << i) != 0) {
                self.signal_interrupt(i);
            }
            self.update_signals();
            wake = true;
        }
        if bits & notifications::EXIT_HARD_OFF != 0 {
            self.exit_hard_off();
            wake = true;
        }
        if bits & notifications::AC_CHANGE != 0 {
            wake |= self.ac_change();
        }
        if bits & notifications::LID_CHANGE != 0 {
            wake = true;
        }
        if bits & notifications::REQUEST != 0 {
            wake |= self.serve_requests();
        }
        wake
    }

    fn signal_interrupt(&mut self, index: usize) {
        if self.core.storm.tally(index) {
            ringbuf_entry!(self.core.trace, Trace::InterruptStorm(index as u8));
        }

        let config = self.core.config;
        if !config.signal_log {
            return;
        }
        let Some(signal) = config.signals.get(index) else {
            return;
        };
        let now = self.platform.now();
        let level = signal.level(&*self.platform);
        self.core.siglog.add(now, index as u8, level);
        self.core.deferred.schedule(
            Deferred::SignalLog,
            now.saturating_add(SIGNAL_LOG_FLUSH_DELAY),
            None,
        );
    }

    /// Returns true only when AC is lost in G3, which starts the hibernate
    /// countdown over.
    fn ac_change(&mut self) -> bool {
        if self.platform.extpower_is_present() {
            ringbuf_entry!(self.core.trace, Trace::AcOn);
            return false;
        }
        ringbuf_entry!(self.core.trace, Trace::AcOff);
        if self.core.state != PowerState::G3 {
            return false;
        }
        self.core.last_shutdown_time = self.platform.now();
        true
    }

    fn run_deferred(&mut self, now: u64) {
        self.core.deferred.poll(now);
        let fired: heapless::Vec<Deferred, 3> =
            self.core.deferred.iter_fired().collect();
        for call in fired {
            match call {
                Deferred::WakeMask => {
                    self.update_wake_mask();
                }
                Deferred::SignalLog => self.flush_signal_log(),
                Deferred::StormReset => self.core.storm.reset(),
            }
        }
    }
}
