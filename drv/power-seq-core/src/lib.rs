// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Chipset power sequencer.
//!
//! The sequencer walks the platform through its global power states. It
//! doesn't know the concrete state graph of any chipset: each iteration of
//! the driver loop asks the [`ChipsetHandler`] where to go from the current
//! state, and only when the handler declines to move does the generic
//! handling in this crate run (idling in G3, timing out of S5, or simply
//! waiting for something to happen).
//!
//! All state lives in an [`Engine`] owned by the sequencer task. Interrupts
//! and other tasks reach it only through notification bits delivered by
//! [`Platform::wait_event`], so every change is made by that one task.
//! Chipset handlers get a [`Sequencer`], a borrowed view of the engine with
//! the signal and wait primitives they need.

#![cfg_attr(not(test), no_std)]

pub mod config;
mod console;
pub mod deferred;
mod hibernate;
mod host;
pub mod platform;
pub mod pp5000;
mod signals;
pub mod siglog;
mod state;
mod wake;

#[cfg(test)]
mod fakes;

use drv_power_seq_api::host::CMD_HOST_SLEEP_EVENT;
use drv_power_seq_api::{
    ChipsetState, HostEventMask, HostSleepEvent, PowerState,
};
use enum_map::Enum;
use ringbuf::{ringbuf_entry, Ringbuf};

pub use config::{PowerConfig, PowerSignalInfo, SignalFlags, SignalSource};
pub use platform::{
    Board, ChipsetHandler, HostEvents, Platform, Request, Response,
    SignalBackend,
};
pub use signals::Wake;

use deferred::DeferredCalls;
use platform::HostParams;
use siglog::{SignalLog, StormDetector};

/// Default time to wait for signals, in milliseconds.
pub const DEFAULT_TIMEOUT: u64 = 1000;
/// Time spent in S5 with nothing happening before dropping to G3.
pub const S5_INACTIVITY_TIMEOUT: u64 = 10_000;
/// Delay between a state change and programming the host wake mask.
pub const WAKE_MASK_SETTLE: u64 = 5;
/// Quiet time after the last logged edge before the signal log is printed.
pub const SIGNAL_LOG_FLUSH_DELAY: u64 = 1000;
/// Longest single wait in G3 while counting down to hibernation.
pub const TASK_MAX_WAIT: u64 = 2_147_483;
/// Interval over which interrupt storms are counted.
pub const STORM_INTERVAL: u64 = 1000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trace {
    None,
    /// State and signals, whenever either has changed since the last loop
    /// iteration.
    StateIn { state: PowerState, signals: u32 },
    /// Debug-masked signals changed.
    PowerIn(u32),
    SetState { from: PowerState, to: PowerState },
    Rtc(u64),
    LostInput { want: u32, got: u32 },
    InputTimeout { want: u32, got: u32 },
    ExitHardOff(PowerState),
    Hibernate,
    CutOff,
    AcOn,
    AcOff,
    WakeMask(u64),
    HostSleepEvent(HostSleepEvent),
    InterruptStorm(u8),
    SignalLogFlushed { entries: u8, truncated: bool },
    HibernateDelay(u32),
    PauseInS5(u32),
    Pp5000Restored(u32),
}

/// Work the sequencer defers to its own task.
#[derive(Copy, Clone, Debug, Enum, PartialEq, Eq)]
pub enum Deferred {
    WakeMask,
    SignalLog,
    StormReset,
}

/// Everything the sequencer knows, apart from the platform and chipset it
/// drives.
pub struct PowerCore {
    config: &'static PowerConfig,
    state: PowerState,
    signals: u32,
    want: u32,
    debug_mask: u32,
    /// Interrupts currently enabled, by signal index.
    irq_enabled: u32,
    want_g3_exit: bool,
    last_shutdown_time: u64,
    hibernate_delay: u32,
    /// Nonzero to pause in S5; kept as the host wrote it.
    pause_in_s5: u32,
    host_sleep_state: Option<HostSleepEvent>,
    host_sleep_timeout_ms: u16,
    /// A host sleep event waiting for the driver loop, as (version, params).
    held_sleep_event: Option<(u8, HostParams)>,
    last_reported: Option<(PowerState, u32)>,
    deferred: DeferredCalls<Deferred>,
    siglog: SignalLog,
    storm: StormDetector,
    trace: Ringbuf<Trace, 64>,
}

impl PowerCore {
    fn new(config: &'static PowerConfig) -> Self {
        Self {
            config,
            state: PowerState::G3,
            signals: 0,
            want: 0,
            debug_mask: 0,
            irq_enabled: 0,
            want_g3_exit: false,
            last_shutdown_time: 0,
            hibernate_delay: config.hibernate_delay.unwrap_or(0),
            pause_in_s5: 0,
            host_sleep_state: None,
            host_sleep_timeout_ms: 0,
            held_sleep_event: None,
            last_reported: None,
            deferred: DeferredCalls::new(),
            siglog: SignalLog::new(),
            storm: StormDetector::new(config.storm_threshold),
            trace: Ringbuf::new(Trace::None),
        }
    }
}

/// A chipset handler's view of the sequencer: signal sampling and waiting,
/// plus the bits of engine state a handler is allowed to see or change.
pub struct Sequencer<'a, P> {
    platform: &'a mut P,
    core: &'a mut PowerCore,
}

impl<'a, P: Platform> Sequencer<'a, P> {
    pub fn state(&self) -> PowerState {
        self.core.state
    }

    pub fn now(&self) -> u64 {
        self.platform.now()
    }

    /// For driving the chipset's outputs.
    pub fn platform(&mut self) -> &mut P {
        &mut *self.platform
    }

    pub fn config(&self) -> &'static PowerConfig {
        self.core.config
    }

    pub fn pause_in_s5(&self) -> bool {
        self.core.pause_in_s5 != 0
    }

    pub fn host_sleep_state(&self) -> Option<HostSleepEvent> {
        self.core.host_sleep_state
    }

    pub fn set_host_sleep_state(&mut self, event: Option<HostSleepEvent>) {
        self.core.host_sleep_state = event;
    }

    pub fn trace(&mut self, entry: Trace) {
        ringbuf_entry!(self.core.trace, entry);
    }

    /// Answers queued requests. A host sleep event needs the chipset
    /// handler, so it and everything queued behind it are left for the
    /// driver loop; returns true if that happened.
    pub(crate) fn serve_requests(&mut self) -> bool {
        if self.core.held_sleep_event.is_some() {
            return true;
        }
        while let Some(request) = self.platform.take_request() {
            let response = match request {
                Request::GetState => Response::State {
                    state: self.core.state,
                    signals: self.core.signals,
                },
                Request::Host {
                    command: CMD_HOST_SLEEP_EVENT,
                    version,
                    params,
                } if self.core.config.host_sleep_events => {
                    self.core.held_sleep_event = Some((version, params));
                    return true;
                }
                Request::Host {
                    command,
                    version,
                    params,
                } => Response::Host(self.host_command(command, version, &params)),
                Request::Console { args } => {
                    let argv: heapless::Vec<&str, { platform::MAX_CONSOLE_ARGS }> =
                        args.iter().map(|a| a.as_str()).collect();
                    Response::Console(self.console_command(&argv))
                }
            };
            self.platform.reply(response);
        }
        false
    }
}

/// The sequencer: a platform, a chipset handler, and the state that ties
/// them together.
pub struct Engine<P, C> {
    platform: P,
    chipset: C,
    core: PowerCore,
}

impl<P: Platform, C: ChipsetHandler> Engine<P, C> {
    pub fn new(platform: P, chipset: C, config: &'static PowerConfig) -> Self {
        Self {
            platform,
            chipset,
            core: PowerCore::new(config),
        }
    }

    pub(crate) fn sequencer(&mut self) -> Sequencer<'_, P> {
        Sequencer {
            platform: &mut self.platform,
            core: &mut self.core,
        }
    }

    /// Brings the sequencer up: picks up 5 V rail requests from before a
    /// warm jump, samples the signals, asks the chipset where we are, and
    /// turns on signal interrupts.
    pub fn init(&mut self) {
        self.restore_pp5000();

        let mut seq = Sequencer {
            platform: &mut self.platform,
            core: &mut self.core,
        };
        seq.update_signals();
        let initial = self.chipset.init(&mut seq);
        seq.set_state(initial);

        let config = seq.core.config;
        for (i, signal) in config.signals.iter().enumerate() {
            let enabled = !signal.flags.contains(SignalFlags::DISABLE_AT_BOOT);
            seq.set_signal_interrupt(i, enabled);
        }
        seq.update_signals();

        if config.storm_threshold.is_some() {
            let now = seq.now();
            seq.core.deferred.schedule(
                Deferred::StormReset,
                now.saturating_add(STORM_INTERVAL),
                Some(STORM_INTERVAL),
            );
        }
    }

    fn restore_pp5000(&mut self) {
        let Some(ctl) = self.core.config.pp5000 else {
            return;
        };
        let Some(blob) = self.platform.jump_tag(pp5000::P5_SYSJUMP_TAG) else {
            return;
        };
        if ctl.restore(&blob, &mut self.platform) {
            ringbuf_entry!(
                self.core.trace,
                Trace::Pp5000Restored(ctl.requests())
            );
        }
    }

    /// What the sequencer hands to the next image on a warm jump.
    pub fn sysjump(&self) -> Option<pp5000::JumpTag> {
        self.core.config.pp5000.map(|ctl| ctl.preserve())
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// One iteration of the driver loop. Blocks inside the chipset handler
    /// or the generic state handling until there is something to do.
    pub fn step(&mut self) {
        self.serve_held_requests();

        let state = self.core.state;
        let signals = self.core.signals;
        if self.core.last_reported != Some((state, signals)) {
            ringbuf_entry!(self.core.trace, Trace::StateIn { state, signals });
            self.platform.display_state(state);
            self.core.last_reported = Some((state, signals));
        }

        let mut seq = Sequencer {
            platform: &mut self.platform,
            core: &mut self.core,
        };
        let mut next = self.chipset.handle_state(state, &mut seq);
        if next == state {
            next = seq.common_state(state);
        }
        if next != state {
            seq.set_state(next);
            seq.schedule_wake_mask_update();
        }
    }

    /// Runs host sleep events left for the loop, then whatever was queued
    /// behind them.
    fn serve_held_requests(&mut self) {
        while let Some((version, params)) = self.core.held_sleep_event.take() {
            let response =
                self.host_command(CMD_HOST_SLEEP_EVENT, version, &params);
            self.platform.reply(Response::Host(response));
            self.sequencer().serve_requests();
        }
    }

    /// Asks the sequencer to leave G3. Only meaningful in G3, S5 or on the
    /// way from one to the other; returns whether the request was taken.
    pub fn exit_hard_off(&mut self) -> bool {
        self.sequencer().exit_hard_off()
    }

    /// Recomputes and applies the host wake mask now, rather than after the
    /// usual settle time.
    pub fn update_wake_mask(&mut self) -> Option<HostEventMask> {
        self.sequencer().update_wake_mask()
    }

    pub fn state(&self) -> PowerState {
        self.core.state
    }

    pub fn in_state(&self, mask: ChipsetState) -> bool {
        self.core.state.in_state(mask)
    }

    pub fn in_or_transitioning_to_state(&self, mask: ChipsetState) -> bool {
        self.core.state.in_or_transitioning_to(mask)
    }

    pub fn signals(&self) -> u32 {
        self.core.signals
    }

    pub fn want(&self) -> u32 {
        self.core.want
    }

    pub fn debug_mask(&self) -> u32 {
        self.core.debug_mask
    }

    pub fn exit_hard_off_pending(&self) -> bool {
        self.core.want_g3_exit
    }

    pub fn last_shutdown_time(&self) -> u64 {
        self.core.last_shutdown_time
    }

    pub fn hibernate_delay(&self) -> u32 {
        self.core.hibernate_delay
    }

    pub fn pause_in_s5(&self) -> bool {
        self.core.pause_in_s5 != 0
    }

    pub fn host_sleep_state(&self) -> Option<HostSleepEvent> {
        self.core.host_sleep_state
    }

    pub fn host_sleep_timeout_ms(&self) -> u16 {
        self.core.host_sleep_timeout_ms
    }

    pub fn trace(&self) -> &Ringbuf<Trace, 64> {
        &self.core.trace
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn chipset(&self) -> &C {
        &self.chipset
    }

    pub fn chipset_mut(&mut self) -> &mut C {
        &mut self.chipset
    }
}
