// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host commands served by the sequencer.

use drv_power_seq_api::host::*;
use drv_power_seq_api::{HostSleepEvent, HostSleepEventContext};
use num_traits::FromPrimitive;
use ringbuf::ringbuf_entry;
use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::hibernate::hibernation_status;
use crate::platform::HostResponse;
use crate::{ChipsetHandler, Engine, Platform, Sequencer, Trace};

fn read_params<T: FromBytes>(params: &[u8]) -> Result<T, HostCmdError> {
    T::read_from_prefix(params)
        .map(|(p, _rest)| p)
        .map_err(|_| HostCmdError::RequestTruncated)
}

fn respond<T: IntoBytes + Immutable>(
    response: &T,
) -> Result<HostResponse, HostCmdError> {
    HostResponse::from_slice(response.as_bytes())
        .map_err(|()| HostCmdError::ResponseTooBig)
}

impl<P: Platform> Sequencer<'_, P> {
    /// Runs a host command that doesn't involve the chipset handler. These
    /// are answered wherever the sequencer happens to be waiting.
    pub(crate) fn host_command(
        &mut self,
        command: u16,
        version: u8,
        params: &[u8],
    ) -> Result<HostResponse, HostCmdError> {
        let config = self.core.config;
        match command {
            CMD_HIBERNATION_DELAY if config.hibernate_delay.is_some() => {
                check_version(version, ver_mask(0))?;
                self.host_hibernation_delay(params)
            }
            CMD_GSV_PAUSE_IN_S5 if config.pause_in_s5 => {
                check_version(version, ver_mask(0))?;
                self.host_pause_in_s5(params)
            }
            _ => Err(HostCmdError::InvalidCommand),
        }
    }

    fn host_hibernation_delay(
        &mut self,
        params: &[u8],
    ) -> Result<HostResponse, HostCmdError> {
        let p: ParamsHibernationDelay = read_params(params)?;

        // Zero is a query.
        if p.seconds != 0 {
            self.core.hibernate_delay = p.seconds;
            ringbuf_entry!(self.core.trace, Trace::HibernateDelay(p.seconds));
        }

        let now = self.platform.now();
        let ext_power = self.platform.extpower_is_present();
        respond(&hibernation_status(self.core, now, ext_power))
    }

    fn host_pause_in_s5(
        &mut self,
        params: &[u8],
    ) -> Result<HostResponse, HostCmdError> {
        let p: ParamsGetSetValue = read_params(params)?;
        if p.flags & GSV_SET != 0 {
            self.core.pause_in_s5 = p.value;
            ringbuf_entry!(self.core.trace, Trace::PauseInS5(p.value));
        }
        respond(&ResponseGetSetValue {
            value: self.core.pause_in_s5,
        })
    }
}

impl<P: Platform, C: ChipsetHandler> Engine<P, C> {
    /// Runs one host command, returning the response body.
    pub fn host_command(
        &mut self,
        command: u16,
        version: u8,
        params: &[u8],
    ) -> Result<HostResponse, HostCmdError> {
        if command == CMD_HOST_SLEEP_EVENT && self.core.config.host_sleep_events
        {
            check_version(version, ver_mask(0) | ver_mask(1))?;
            return self.host_sleep_event(version, params);
        }
        self.sequencer().host_command(command, version, params)
    }

    fn host_sleep_event(
        &mut self,
        version: u8,
        params: &[u8],
    ) -> Result<HostResponse, HostCmdError> {
        let (raw, timeout) = if version == 0 {
            let p: ParamsHostSleepEvent = read_params(params)?;
            (p.sleep_event, HOST_SLEEP_TIMEOUT_DEFAULT)
        } else {
            let p: ParamsHostSleepEventV1 = read_params(params)?;
            (p.sleep_event, p.sleep_timeout_ms)
        };
        let event =
            HostSleepEvent::from_u8(raw).ok_or(HostCmdError::InvalidParam)?;

        ringbuf_entry!(self.core.trace, Trace::HostSleepEvent(event));
        self.core.host_sleep_state = Some(event);

        let mut ctx = HostSleepEventContext::default();
        if event.is_suspend() {
            ctx.sleep_timeout_ms = timeout;
            self.core.host_sleep_timeout_ms = timeout;
        }
        self.chipset.handle_host_sleep_event(event, &mut ctx);

        if version >= 1 && event.is_resume() {
            respond(&ResponseHostSleepEventV1 {
                sleep_transitions: ctx.sleep_transitions,
            })
        } else {
            Ok(HostResponse::new())
        }
    }
}

fn check_version(version: u8, supported: u32) -> Result<(), HostCmdError> {
    if version < 32 && ver_mask(version) & supported != 0 {
        Ok(())
    } else {
        Err(HostCmdError::InvalidVersion)
    }
}
