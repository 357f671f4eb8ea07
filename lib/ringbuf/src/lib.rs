// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring buffer for tracing the power sequencer
//!
//! This is an owned, fixed-size trace buffer. Unlike a `static` ring buffer,
//! a [`Ringbuf`] lives inside the structure whose behavior it records, which
//! lets the engine that owns it hand out a read-only view for inspection (by
//! a debugger, by a console command, or by unit tests on the host).
//!
//! ## Constraints
//!
//! The type in the ring buffer must implement both `Copy` and `PartialEq`.
//!
//! ## Recording entries
//!
//! Entries are generated with [`ringbuf_entry!`], naming the buffer and the
//! payload:
//!
//! ```
//! # use ringbuf::{ringbuf_entry, Ringbuf};
//! let mut trace: Ringbuf<u32, 16> = Ringbuf::new(0);
//! ringbuf_entry!(trace, 0x1234);
//! ```
//!
//! When an entry is generated with an identical payload to the most recent
//! entry (in terms of both `line` and `payload`), the `count` of the most
//! recent entry is incremented rather than consuming a new slot. This keeps
//! a task that is spinning on the same condition from washing out the
//! interesting history.

#![cfg_attr(not(test), no_std)]

/// Inserts data into a ring buffer.
///
/// `ringbuf_entry!(buf, expr)` records `expr` into `buf`, tagged with the
/// source line of the invocation. `buf` may be any place expression naming a
/// [`Ringbuf`], e.g. `self.trace`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate the payload first so that it may borrow from the same
        // structure that owns the buffer.
        let p = $payload;
        $crate::Ringbuf::entry(&mut $buf, line!() as u16, p);
    }};
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$buf;
        let _ = &$payload;
    }};
}

///
/// The structure of a single [`Ringbuf`] entry, carrying a payload of
/// arbitrary type.
///
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

///
/// A ring buffer of parametrized type and size.
///
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    last: Option<usize>,
    buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, { N }> {
    /// Creates an empty ring buffer, with every slot holding `init`.
    pub const fn new(init: T) -> Self {
        Self {
            last: None,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: init,
            }; N],
        }
    }

    pub fn entry(&mut self, line: u16, payload: T) {
        // If this is the first time this ringbuf has been poked, last will be
        // None. Treating None as an out-of-range index keeps us from adding
        // to the count of a slot that was never written, and lands the first
        // entry in slot 0.
        let last = self.last.unwrap_or(usize::MAX);

        if let Some(ent) = self.buffer.get_mut(last) {
            if ent.line == line && ent.payload == payload {
                // Only reuse this entry if we don't overflow the count.
                if let Some(new_count) = ent.count.checked_add(1) {
                    ent.count = new_count;
                    return;
                }
            }
        }

        // Advance, wrapping usize::MAX (our starting condition) to zero.
        let ndx = {
            let last_plus_1 = last.wrapping_add(1);
            if last_plus_1 >= self.buffer.len() {
                0
            } else {
                last_plus_1
            }
        };

        let ent = &mut self.buffer[ndx];
        *ent = RingbufEntry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };

        self.last = Some(ndx);
    }

    /// Returns the most recently recorded entry, if any.
    pub fn last(&self) -> Option<&RingbufEntry<T>> {
        self.last.and_then(|ndx| self.buffer.get(ndx))
    }

    /// Iterates over the recorded entries, oldest first. Slots that have
    /// never been written are skipped.
    pub fn iter(&self) -> impl Iterator<Item = &RingbufEntry<T>> + '_ {
        let start = match self.last {
            Some(last) => last + 1,
            None => self.buffer.len(),
        };
        let (newer, older) = self.buffer.split_at(start.min(N));
        older
            .iter()
            .chain(newer.iter())
            .filter(|ent| ent.count != 0)
    }

    /// Iterates over recorded payloads, oldest first.
    pub fn payloads(&self) -> impl Iterator<Item = T> + '_ {
        self.iter().map(|ent| ent.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_nothing() {
        let buf: Ringbuf<u8, 4> = Ringbuf::new(0);
        assert!(buf.last().is_none());
        assert_eq!(buf.iter().count(), 0);
    }

    #[test]
    fn repeats_are_counted() {
        let mut buf: Ringbuf<u8, 4> = Ringbuf::new(0);
        for _ in 0..3 {
            ringbuf_entry!(buf, 7);
        }
        let ent = buf.last().unwrap();
        assert_eq!(ent.payload, 7);
        assert_eq!(ent.count, 3);
        assert_eq!(buf.iter().count(), 1);
    }

    #[test]
    fn same_payload_from_different_lines_is_not_merged() {
        let mut buf: Ringbuf<u8, 4> = Ringbuf::new(0);
        buf.entry(10, 1);
        buf.entry(11, 1);
        assert_eq!(buf.iter().count(), 2);
    }

    #[test]
    fn wraps_oldest_first() {
        let mut buf: Ringbuf<u8, 3> = Ringbuf::new(0);
        for i in 1..=5 {
            buf.entry(1, i);
        }
        assert_eq!(buf.payloads().collect::<Vec<_>>(), [3, 4, 5]);
        // Slot 0 has been written twice.
        assert_eq!(buf.iter().map(|e| e.generation).max(), Some(2));
    }
}
