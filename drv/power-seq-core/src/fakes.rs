// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-side stand-ins for the platform and a chipset.
//!
//! `FakePlatform` has a clock that only moves when the sequencer waits.
//! Notifications are scripted ahead of time at absolute times; a wait
//! delivers the next scripted notification if it falls before the
//! deadline, and otherwise jumps the clock to the deadline. Everything the
//! sequencer does to the platform is recorded for inspection.

use std::collections::VecDeque;
use std::fmt;

use drv_power_seq_api::{
    notifications, HostEventMask, HostSleepEvent, HostSleepEventContext,
    IdleAction, PowerState,
};

use crate::platform::{ConsoleArg, JumpBlob, MAX_CONSOLE_ARGS};
use crate::{
    Board, ChipsetHandler, HostEvents, Platform, Request, Response, Sequencer,
    SignalBackend,
};

/// Bail out of tests that stop making progress.
const MAX_WAITS: usize = 10_000;

pub struct Scripted {
    pub at: u64,
    pub bits: u32,
    /// New GPIO levels, applied when the notification is delivered.
    pub gpio_levels: Option<u32>,
}

pub struct FakePlatform {
    pub now: u64,
    pub gpio_levels: u32,
    pub vw_levels: u32,
    pub gpio_irqs: u32,
    pub vw_irqs: u32,
    pub irq_history: Vec<(u16, bool)>,
    pub ext_power: bool,
    pub host_active_mask: bool,
    pub lazy: [Option<HostEventMask>; 13],
    pub idle_action: Option<IdleAction>,

    pub script: VecDeque<Scripted>,
    pub waits: Vec<Option<u64>>,
    pub wake_masks: Vec<HostEventMask>,
    pub hibernations: u32,
    pub cutoffs: u32,
    pub displayed: Vec<PowerState>,
    pub pp5000: Vec<bool>,
    pub console: String,
    pub jump_tags: Vec<(u16, Vec<u8>)>,
    pub requests: VecDeque<Request>,
    pub replies: Vec<Response>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            now: 0,
            gpio_levels: 0,
            vw_levels: 0,
            gpio_irqs: 0,
            vw_irqs: 0,
            irq_history: vec![],
            ext_power: false,
            host_active_mask: false,
            lazy: [None; 13],
            idle_action: None,
            script: VecDeque::new(),
            waits: vec![],
            wake_masks: vec![],
            hibernations: 0,
            cutoffs: 0,
            displayed: vec![],
            pp5000: vec![],
            console: String::new(),
            jump_tags: vec![],
            requests: VecDeque::new(),
            replies: vec![],
        }
    }

    /// Delivers `bits` at time `at`.
    pub fn script(&mut self, at: u64, bits: u32) {
        self.push(Scripted {
            at,
            bits,
            gpio_levels: None,
        });
    }

    /// Changes the GPIO levels at time `at` and delivers `bits`.
    pub fn script_levels(&mut self, at: u64, bits: u32, gpio_levels: u32) {
        self.push(Scripted {
            at,
            bits,
            gpio_levels: Some(gpio_levels),
        });
    }

    fn push(&mut self, event: Scripted) {
        let pos = self.script.partition_point(|e| e.at <= event.at);
        self.script.insert(pos, event);
    }
}

impl SignalBackend for FakePlatform {
    fn gpio_get_level(&self, pin: u16) -> bool {
        self.gpio_levels & (1 << pin) != 0
    }

    fn gpio_set_interrupt(&mut self, pin: u16, enabled: bool) {
        self.irq_history.push((pin, enabled));
        if enabled {
            self.gpio_irqs |= 1 << pin;
        } else {
            self.gpio_irqs &= !(1 << pin);
        }
    }

    fn vw_get_wire(&self, wire: u8) -> bool {
        self.vw_levels & (1 << wire) != 0
    }

    fn vw_set_interrupt(&mut self, wire: u8, enabled: bool) {
        if enabled {
            self.vw_irqs |= 1 << wire;
        } else {
            self.vw_irqs &= !(1 << wire);
        }
    }
}

impl HostEvents for FakePlatform {
    fn active_wake_mask_set_by_host(&self) -> bool {
        self.host_active_mask
    }

    fn lazy_wake_mask(&self, state: PowerState) -> Option<HostEventMask> {
        self.lazy[state.index() as usize]
    }

    fn set_wake_mask(&mut self, mask: HostEventMask) {
        self.wake_masks.push(mask);
    }
}

impl Board for FakePlatform {
    fn extpower_is_present(&self) -> bool {
        self.ext_power
    }

    fn system_is_idle(
        &self,
        _last_shutdown: u64,
        target: &mut u64,
        now: u64,
    ) -> IdleAction {
        self.idle_action.unwrap_or(if now >= *target {
            IdleAction::Hibernate
        } else {
            IdleAction::Ignore
        })
    }

    fn hibernate(&mut self) {
        self.hibernations += 1;
    }

    fn cut_off_battery(&mut self) {
        self.cutoffs += 1;
    }

    fn display_state(&mut self, state: PowerState) {
        self.displayed.push(state);
    }

    fn set_pp5000(&mut self, enabled: bool) {
        self.pp5000.push(enabled);
    }

    fn console(&mut self) -> &mut dyn fmt::Write {
        &mut self.console
    }

    fn jump_tag(&self, tag: u16) -> Option<JumpBlob> {
        self.jump_tags
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, data)| JumpBlob::from_slice(data).unwrap())
    }
}

impl Platform for FakePlatform {
    fn now(&self) -> u64 {
        self.now
    }

    fn wait_event(&mut self, deadline: Option<u64>) -> u32 {
        self.waits.push(deadline);
        assert!(
            self.waits.len() < MAX_WAITS,
            "sequencer is spinning at {} ms",
            self.now
        );

        let due = match (self.script.front(), deadline) {
            (Some(event), Some(d)) => event.at <= d,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if due {
            if let Some(event) = self.script.pop_front() {
                self.now = self.now.max(event.at);
                if let Some(levels) = event.gpio_levels {
                    self.gpio_levels = levels;
                }
                return event.bits;
            }
        }

        match deadline {
            Some(d) => {
                self.now = self.now.max(d);
                notifications::TIMER
            }
            None => panic!("blocked forever at {} ms with nothing scripted", self.now),
        }
    }

    fn take_request(&mut self) -> Option<Request> {
        self.requests.pop_front()
    }

    fn reply(&mut self, response: Response) {
        self.replies.push(response);
    }
}

pub fn console_request(args: &[&str]) -> Request {
    let mut argv = heapless::Vec::<ConsoleArg, MAX_CONSOLE_ARGS>::new();
    for arg in args {
        let mut s = ConsoleArg::new();
        s.push_str(arg).unwrap();
        argv.push(s).unwrap();
    }
    Request::Console { args: argv }
}

/// A chipset that moves through its transition states without waiting on
/// anything, and otherwise only moves when a test tells it to.
pub struct TestChipset {
    pub initial: PowerState,
    /// One-shot moves, consumed when taken.
    pub moves: Vec<(PowerState, PowerState)>,
    pub sleep_transitions: u32,
    pub sleep_events: Vec<(HostSleepEvent, u16)>,
    pub calls: Vec<PowerState>,
}

impl TestChipset {
    pub fn new(initial: PowerState) -> Self {
        Self {
            initial,
            moves: vec![],
            sleep_transitions: 0,
            sleep_events: vec![],
            calls: vec![],
        }
    }

    /// Moves from `from` to `to` the next time the handler sees `from`.
    pub fn once(&mut self, from: PowerState, to: PowerState) {
        self.moves.push((from, to));
    }
}

impl ChipsetHandler for TestChipset {
    fn init<P: Platform>(&mut self, _seq: &mut Sequencer<'_, P>) -> PowerState {
        self.initial
    }

    fn handle_state<P: Platform>(
        &mut self,
        state: PowerState,
        _seq: &mut Sequencer<'_, P>,
    ) -> PowerState {
        self.calls.push(state);
        if let Some(i) = self.moves.iter().position(|(from, _)| *from == state) {
            return self.moves.remove(i).1;
        }
        match state {
            PowerState::G3S5 => PowerState::S5,
            PowerState::S5S3 => PowerState::S3,
            PowerState::S3S0 => PowerState::S0,
            PowerState::S0S3 => PowerState::S3,
            PowerState::S3S5 => PowerState::S5,
            PowerState::S5G3 => PowerState::G3,
            PowerState::S0ixS0 => PowerState::S0,
            PowerState::S0S0ix => PowerState::S0ix,
            other => other,
        }
    }

    fn handle_host_sleep_event(
        &mut self,
        event: HostSleepEvent,
        ctx: &mut HostSleepEventContext,
    ) {
        self.sleep_events.push((event, ctx.sleep_timeout_ms));
        if event.is_resume() {
            ctx.sleep_transitions = self.sleep_transitions;
        }
    }
}
