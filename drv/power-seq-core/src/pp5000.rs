// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arbitration of the shared 5 V rail.
//!
//! Any task may ask for the rail; it stays on while anyone is asking. This
//! is the one piece of sequencer state touched from other tasks, so the
//! request bits live behind a lock rather than in the engine.

use spin::Mutex;

use crate::platform::Board;

/// Tag for the request bits carried across a warm jump.
pub const P5_SYSJUMP_TAG: u16 = 0x5005;
pub const P5_SYSJUMP_VERSION: u8 = 1;

/// A blob to be handed to the next image across a warm jump.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JumpTag {
    pub tag: u16,
    pub version: u8,
    pub data: [u8; 4],
}

#[derive(Debug)]
pub struct Pp5000Control {
    requests: Mutex<u32>,
}

impl Pp5000Control {
    pub const fn new() -> Self {
        Self {
            requests: Mutex::new(0),
        }
    }

    /// Records whether `task` wants the rail and drives the rail to match.
    /// Task numbers past 31 can't hold a request and are ignored.
    pub fn enable<B: Board + ?Sized>(&self, task: u32, enable: bool, board: &mut B) {
        let Some(bit) = 1u32.checked_shl(task) else {
            return;
        };
        let mut requests = self.requests.lock();
        if enable {
            *requests |= bit;
        } else {
            *requests &= !bit;
        }
        board.set_pp5000(*requests != 0);
    }

    pub fn requests(&self) -> u32 {
        *self.requests.lock()
    }

    pub fn is_enabled(&self) -> bool {
        self.requests() != 0
    }

    pub fn preserve(&self) -> JumpTag {
        JumpTag {
            tag: P5_SYSJUMP_TAG,
            version: P5_SYSJUMP_VERSION,
            data: self.requests().to_le_bytes(),
        }
    }

    /// Merges in the requests saved by the previous image, if the blob is
    /// the size we expect. Returns whether anything was restored.
    pub fn restore<B: Board + ?Sized>(&self, blob: &[u8], board: &mut B) -> bool {
        let Ok(bytes) = <[u8; 4]>::try_from(blob) else {
            return false;
        };
        let mut requests = self.requests.lock();
        *requests |= u32::from_le_bytes(bytes);
        board.set_pp5000(*requests != 0);
        true
    }
}

impl Default for Pp5000Control {
    fn default() -> Self {
        Self::new()
    }
}
