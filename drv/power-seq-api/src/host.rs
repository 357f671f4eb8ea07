// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host command codes and wire layouts for the sequencer's host-visible
//! commands.
//!
//! Params and responses are `repr(C)` structs in the EC's native
//! (little-endian) byte order; the transport delivers them as raw bytes and
//! we read and write them with `zerocopy`.

use num_derive::FromPrimitive;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const CMD_HIBERNATION_DELAY: u16 = 0x00a8;
pub const CMD_HOST_SLEEP_EVENT: u16 = 0x00a9;
pub const CMD_GSV_PAUSE_IN_S5: u16 = 0x0107;

/// Bit set in [`ParamsGetSetValue::flags`] to write `value`.
pub const GSV_SET: u32 = 0x8000_0000;

/// Suspend timeout reported to the chipset when the host doesn't supply
/// one.
pub const HOST_SLEEP_TIMEOUT_DEFAULT: u16 = 0;

/// Turns a command version into its bit in a supported-versions mask.
pub const fn ver_mask(version: u8) -> u32 {
    1 << version
}

/// Result codes the sequencer's host commands can produce. Values match the
/// EC host command protocol.
#[derive(Copy, Clone, Debug, FromPrimitive, Eq, PartialEq)]
pub enum HostCmdError {
    InvalidCommand = 1,
    Error = 2,
    InvalidParam = 3,
    InvalidVersion = 6,
    RequestTruncated = 13,
    ResponseTooBig = 14,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct ParamsHibernationDelay {
    /// New delay in seconds; zero leaves the delay alone.
    pub seconds: u32,
}

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(C)]
pub struct ResponseHibernationDelay {
    /// Seconds spent in G3 on battery, or 0 if not in that condition.
    pub time_g3: u32,
    pub time_remaining: u32,
    pub hibernate_delay: u32,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct ParamsGetSetValue {
    pub flags: u32,
    pub value: u32,
}

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(C)]
pub struct ResponseGetSetValue {
    pub value: u32,
}

/// Version 0 of the sleep event: just the event.
#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct ParamsHostSleepEvent {
    pub sleep_event: u8,
}

/// Version 1 adds suspend parameters.
#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct ParamsHostSleepEventV1 {
    pub sleep_event: u8,
    pub reserved: u8,
    /// Only meaningful for suspend events.
    pub sleep_timeout_ms: u16,
}

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(C)]
pub struct ResponseHostSleepEventV1 {
    /// Only sent in response to resume events.
    pub sleep_transitions: u32,
}

const_assert_eq!(core::mem::size_of::<ParamsHibernationDelay>(), 4);
const_assert_eq!(core::mem::size_of::<ResponseHibernationDelay>(), 12);
const_assert_eq!(core::mem::size_of::<ParamsGetSetValue>(), 8);
const_assert_eq!(core::mem::size_of::<ResponseGetSetValue>(), 4);
const_assert_eq!(core::mem::size_of::<ParamsHostSleepEvent>(), 1);
const_assert_eq!(core::mem::size_of::<ParamsHostSleepEventV1>(), 4);
const_assert_eq!(core::mem::size_of::<ResponseHostSleepEventV1>(), 4);
