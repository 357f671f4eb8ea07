// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hibernation once the platform has sat in G3 on battery for long enough.

use drv_power_seq_api::host::ResponseHibernationDelay;
use drv_power_seq_api::{IdleAction, PowerState};
use ringbuf::ringbuf_entry;

use crate::{Platform, PowerCore, Sequencer, Trace, TASK_MAX_WAIT};

impl<P: Platform> Sequencer<'_, P> {
    /// G3 with hibernation configured: wait, and once the delay has run out
    /// on battery, let the board policy take the platform down.
    pub(crate) fn g3_idle(&mut self) {
        if self.platform.extpower_is_present() {
            self.wait_event(None);
            return;
        }

        let now = self.platform.now();
        let last = self.core.last_shutdown_time;
        let mut target =
            last.saturating_add(u64::from(self.core.hibernate_delay) * 1000);

        match self.platform.system_is_idle(last, &mut target, now) {
            IdleAction::Hibernate => {
                ringbuf_entry!(self.core.trace, Trace::Hibernate);
                self.platform.hibernate();
            }
            IdleAction::CutOff if self.core.config.battery_cutoff => {
                ringbuf_entry!(self.core.trace, Trace::CutOff);
                self.platform.cut_off_battery();
            }
            IdleAction::CutOff | IdleAction::Ignore => {}
        }

        self.wait_event(Some(g3_wait(target, now)));
    }
}

/// How long to sleep in G3 before asking the board again. A target that
/// has already been reached waits the maximum, so a hibernate or cutoff
/// that returns doesn't spin.
fn g3_wait(target: u64, now: u64) -> u64 {
    if target > now {
        (target - now).min(TASK_MAX_WAIT)
    } else {
        TASK_MAX_WAIT
    }
}

/// Whole seconds since the last entry to G3.
pub(crate) fn time_g3(core: &PowerCore, now: u64) -> u32 {
    let ms = now.saturating_sub(core.last_shutdown_time);
    u32::try_from(ms / 1000).unwrap_or(u32::MAX)
}

/// The host's view of the hibernation countdown. The remaining time is
/// counted from the last entry to G3 wherever we are now; the reported time
/// in G3 is zero unless we are in G3 on battery.
pub(crate) fn hibernation_status(
    core: &PowerCore,
    now: u64,
    ext_power: bool,
) -> ResponseHibernationDelay {
    let delay = core.hibernate_delay;
    let elapsed = time_g3(core, now);
    let reported = if core.state == PowerState::G3 && !ext_power {
        elapsed
    } else {
        0
    };
    ResponseHibernationDelay {
        time_g3: reported,
        time_remaining: delay.saturating_sub(elapsed),
        hibernate_delay: delay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::*;
    use crate::{Engine, PowerConfig};
    use drv_power_seq_api::notifications;
    use proptest::prelude::*;

    static CONFIG: PowerConfig = PowerConfig {
        hibernate_delay: Some(30),
        battery_cutoff: true,
        ..PowerConfig::new(&[])
    };

    fn engine_in_g3_at(now: u64) -> Engine<FakePlatform, TestChipset> {
        let mut p = FakePlatform::new();
        p.now = now;
        let mut e = Engine::new(p, TestChipset::new(PowerState::G3), &CONFIG);
        e.init();
        e
    }

    #[test]
    fn waits_out_the_delay_then_hibernates() {
        let mut e = engine_in_g3_at(1000);
        e.step();
        assert_eq!(e.platform().hibernations, 0);
        assert_eq!(e.platform().waits, [Some(31_000)]);
        assert_eq!(e.platform().now, 31_000);

        e.step();
        assert_eq!(e.platform().hibernations, 1);
    }

    #[test]
    fn board_policy_can_cut_off_instead() {
        let mut e = engine_in_g3_at(0);
        e.platform_mut().idle_action = Some(IdleAction::CutOff);
        e.platform_mut().script(10, notifications::LID_CHANGE);
        e.step();
        assert_eq!(e.platform().cutoffs, 1);
        assert_eq!(e.platform().hibernations, 0);
        assert!(e.trace().payloads().any(|t| t == Trace::CutOff));
    }

    #[test]
    fn past_targets_wait_the_maximum() {
        let mut e = engine_in_g3_at(0);
        e.platform_mut().idle_action = Some(IdleAction::Ignore);
        e.platform_mut().now = 60_000;
        e.platform_mut().script(61_000, notifications::LID_CHANGE);
        e.step();
        assert_eq!(e.platform().waits, [Some(60_000 + TASK_MAX_WAIT)]);
    }

    #[test]
    fn reached_target_does_not_spin() {
        let mut e = engine_in_g3_at(0);
        e.platform_mut().idle_action = Some(IdleAction::Ignore);
        e.platform_mut().now = 30_000;
        e.platform_mut().script(30_500, notifications::LID_CHANGE);
        e.step();
        assert_eq!(e.platform().waits, [Some(30_000 + TASK_MAX_WAIT)]);
        assert_eq!(g3_wait(30_000, 29_999), 1);
        assert_eq!(g3_wait(30_000, 30_000), TASK_MAX_WAIT);
    }

    #[test]
    fn status_outside_g3_still_counts_down() {
        let mut e = engine_in_g3_at(0);
        e.core.state = PowerState::S5;
        let r = hibernation_status(&e.core, 20_000, false);
        assert_eq!(r.time_g3, 0);
        assert_eq!(r.time_remaining, 10);
        assert_eq!(r.hibernate_delay, 30);
    }

    #[test]
    fn status_on_ac_still_counts_down() {
        let e = engine_in_g3_at(0);
        let r = hibernation_status(&e.core, 20_000, true);
        assert_eq!(r.time_g3, 0);
        assert_eq!(r.time_remaining, 10);

        let r = hibernation_status(&e.core, 45_000, true);
        assert_eq!(r.time_g3, 0);
        assert_eq!(r.time_remaining, 0);
    }

    proptest! {
        #[test]
        fn remaining_is_delay_minus_elapsed(delay in 0u32..100_000, elapsed_ms in 0u64..200_000_000) {
            let mut e = engine_in_g3_at(0);
            e.core.hibernate_delay = delay;
            let r = hibernation_status(&e.core, elapsed_ms, false);
            let elapsed = (elapsed_ms / 1000) as u32;
            prop_assert_eq!(r.time_g3, elapsed);
            prop_assert_eq!(r.time_remaining, delay.saturating_sub(elapsed));
        }
    }
}
