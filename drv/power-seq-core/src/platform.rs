// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The seams between the sequencer and everything it drives.
//!
//! A platform supplies signal levels, host event plumbing, board policy and
//! the kernel's wait primitive; a chipset handler supplies the actual state
//! graph. The engine owns one of each.

use core::fmt;

use drv_power_seq_api::host::HostCmdError;
use drv_power_seq_api::{
    ConsoleError, HostEventMask, HostSleepEvent, HostSleepEventContext,
    IdleAction, PowerState,
};

use crate::Sequencer;

/// Largest host command parameter block we accept.
pub const MAX_HOST_PARAMS: usize = 16;
/// Largest host command response we produce.
pub const MAX_HOST_RESPONSE: usize = 16;
/// Console commands take a name and at most one argument, but leave a
/// little room so that extra arguments are ignored rather than refused.
pub const MAX_CONSOLE_ARGS: usize = 4;
pub const MAX_CONSOLE_ARG_LEN: usize = 16;

pub type HostParams = heapless::Vec<u8, MAX_HOST_PARAMS>;
pub type HostResponse = heapless::Vec<u8, MAX_HOST_RESPONSE>;
pub type ConsoleArg = heapless::String<MAX_CONSOLE_ARG_LEN>;
/// Largest blob we expect to find carried across a warm jump.
pub const MAX_JUMP_TAG: usize = 16;
pub type JumpBlob = heapless::Vec<u8, MAX_JUMP_TAG>;

/// Requests other tasks, the host, and the console make of the sequencer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    GetState,
    Host {
        command: u16,
        version: u8,
        params: HostParams,
    },
    /// `args[0]` is the command name.
    Console {
        args: heapless::Vec<ConsoleArg, MAX_CONSOLE_ARGS>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    State { state: PowerState, signals: u32 },
    Host(Result<HostResponse, HostCmdError>),
    Console(Result<(), ConsoleError>),
}

pub trait SignalBackend {
    fn gpio_get_level(&self, pin: u16) -> bool;
    fn gpio_set_interrupt(&mut self, pin: u16, enabled: bool);
    fn vw_get_wire(&self, wire: u8) -> bool;
    fn vw_set_interrupt(&mut self, wire: u8, enabled: bool);
}

pub trait HostEvents {
    /// True if the host has programmed a wake mask for the current
    /// suspend; it then owns the mask until the next resume.
    fn active_wake_mask_set_by_host(&self) -> bool;

    /// The host's standing wake mask for `state`, or `None` if there is no
    /// such slot for that state.
    fn lazy_wake_mask(&self, state: PowerState) -> Option<HostEventMask>;

    fn set_wake_mask(&mut self, mask: HostEventMask);
}

pub trait Board {
    fn extpower_is_present(&self) -> bool;

    /// Decides what to do about a platform that has sat in G3 on battery.
    /// `target` is when the hibernate delay runs out; the policy may move it
    /// to get woken at a different time.
    fn system_is_idle(
        &self,
        _last_shutdown: u64,
        target: &mut u64,
        now: u64,
    ) -> IdleAction {
        if now >= *target {
            IdleAction::Hibernate
        } else {
            IdleAction::Ignore
        }
    }

    /// Doesn't return on real hardware.
    fn hibernate(&mut self);

    fn cut_off_battery(&mut self) {}

    /// Seven-segment (or similar) state indicator.
    fn display_state(&mut self, _state: PowerState) {}

    fn set_pp5000(&mut self, enabled: bool);

    /// Data the previous image left under `tag` before jumping to us.
    fn jump_tag(&self, _tag: u16) -> Option<JumpBlob> {
        None
    }

    fn console(&mut self) -> &mut dyn fmt::Write;
}

pub trait Platform: SignalBackend + HostEvents + Board {
    /// Milliseconds since boot.
    fn now(&self) -> u64;

    /// Blocks until a notification arrives or `deadline` passes, returning
    /// the notification bits. Reaching the deadline sets
    /// [`drv_power_seq_api::notifications::TIMER`].
    fn wait_event(&mut self, deadline: Option<u64>) -> u32;

    fn take_request(&mut self) -> Option<Request>;
    fn reply(&mut self, response: Response);
}

pub trait ChipsetHandler {
    /// Called once at startup; returns the state to start in.
    fn init<P: Platform>(&mut self, seq: &mut Sequencer<'_, P>) -> PowerState;

    /// Returns the state to move to, or `state` to let the generic handling
    /// run.
    fn handle_state<P: Platform>(
        &mut self,
        state: PowerState,
        seq: &mut Sequencer<'_, P>,
    ) -> PowerState;

    fn handle_host_sleep_event(
        &mut self,
        _event: HostSleepEvent,
        _ctx: &mut HostSleepEventContext,
    ) {
    }
}
