//! Table of transmissions awaiting their confirm
//!
//! The co-processor queues up to five indirect frames and answers every
//! submission with an asynchronous MCPS-DATA.confirm carrying the MSDU
//! handle. This table remembers the submitted packet per handle so the
//! confirm can be routed back to the original caller. The capacity is fixed
//! by the co-processor's indirect queue depth, with a little margin for
//! direct frames; an index scan over seven slots beats any map at this size
//! and keeps the hot path free of allocation.

use std::sync::Mutex;

use crate::error::Error;
use crate::radio::RadioPacket;

/// Five indirect frames plus two in-flight direct frames
pub const MAX_IN_TRANSIT: usize = 7;

#[derive(Clone, Copy)]
struct Entry {
    handle: u8,
    packet: RadioPacket,
}

/// Bounded map from MSDU handle to the originating submission
///
/// The main thread inserts while submitting, the worker thread removes while
/// confirming; a mutex covers the handle space. Handle 0 is reserved to mark
/// free slots and is never allocated.
pub struct InTransitTable {
    entries: Mutex<[Option<Entry>; MAX_IN_TRANSIT]>,
}

impl InTransitTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: Mutex::new([None; MAX_IN_TRANSIT]),
        }
    }

    /// Store `packet` under the lowest free non-zero handle
    ///
    /// Returns the allocated handle, or [`Error::Overflow`] when all slots
    /// are occupied. Existing entries are untouched by a failed allocation.
    pub fn allocate(&self, packet: &RadioPacket) -> Result<u8, Error> {
        let mut entries = self.entries.lock().unwrap();

        let free = entries
            .iter()
            .position(|entry| entry.is_none())
            .ok_or(Error::Overflow)?;

        let mut handle: u8 = 1;
        while entries
            .iter()
            .flatten()
            .any(|entry| entry.handle == handle)
        {
            // With at most seven live entries a free handle is always found
            // long before the wrap
            handle = handle.checked_add(1).ok_or(Error::Overflow)?;
        }

        entries[free] = Some(Entry {
            handle,
            packet: *packet,
        });

        Ok(handle)
    }

    /// Remove and return the packet stored under `handle`
    pub fn take(&self, handle: u8) -> Result<RadioPacket, Error> {
        let mut entries = self.entries.lock().unwrap();

        for slot in entries.iter_mut() {
            if let Some(entry) = slot {
                if entry.handle == handle {
                    let packet = entry.packet;
                    *slot = None;
                    return Ok(packet);
                }
            }
        }

        Err(Error::UnknownHandle)
    }

    /// Read the packet stored under `handle` without removing it
    ///
    /// Used only for defensive assertions on the submission path.
    pub fn peek(&self, handle: u8) -> Option<RadioPacket> {
        let entries = self.entries.lock().unwrap();

        entries
            .iter()
            .flatten()
            .find(|entry| entry.handle == handle)
            .map(|entry| entry.packet)
    }

    /// Number of transmissions currently awaiting their confirm
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().iter().flatten().count()
    }

    /// True when no transmission is awaiting a confirm
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InTransitTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with_channel(channel: u8) -> RadioPacket {
        let mut packet = RadioPacket::new();
        packet.channel = channel;
        packet
    }

    #[test]
    fn test_allocates_lowest_free_handles() {
        let table = InTransitTable::new();

        assert_eq!(table.allocate(&packet_with_channel(11)), Ok(1));
        assert_eq!(table.allocate(&packet_with_channel(12)), Ok(2));
        assert_eq!(table.allocate(&packet_with_channel(13)), Ok(3));

        // Freeing handle 2 makes it the lowest free handle again
        assert!(table.take(2).is_ok());
        assert_eq!(table.allocate(&packet_with_channel(14)), Ok(2));
    }

    #[test]
    fn test_take_returns_the_matching_packet() {
        let table = InTransitTable::new();
        let first = table.allocate(&packet_with_channel(11)).unwrap();
        let second = table.allocate(&packet_with_channel(26)).unwrap();
        assert_ne!(first, second);

        assert_eq!(table.take(second).unwrap().channel, 26);
        assert_eq!(table.take(first).unwrap().channel, 11);
    }

    #[test]
    fn test_take_unknown_handle_fails() {
        let table = InTransitTable::new();
        assert_eq!(table.take(1), Err(Error::UnknownHandle));

        table.allocate(&packet_with_channel(11)).unwrap();
        assert_eq!(table.take(99), Err(Error::UnknownHandle));
    }

    #[test]
    fn test_overflow_at_capacity_preserves_entries() {
        let table = InTransitTable::new();
        for channel in 0..MAX_IN_TRANSIT as u8 {
            table.allocate(&packet_with_channel(channel)).unwrap();
        }

        assert_eq!(
            table.allocate(&packet_with_channel(0xFF)),
            Err(Error::Overflow)
        );

        // Every previously stored packet is still intact
        assert_eq!(table.len(), MAX_IN_TRANSIT);
        for handle in 1..=MAX_IN_TRANSIT as u8 {
            assert_eq!(table.take(handle).unwrap().channel, handle - 1);
        }
    }

    #[test]
    fn test_handles_are_never_reissued_while_live() {
        let table = InTransitTable::new();
        let mut live = Vec::new();

        for _ in 0..MAX_IN_TRANSIT {
            let handle = table.allocate(&packet_with_channel(11)).unwrap();
            assert_ne!(handle, 0);
            assert!(!live.contains(&handle));
            live.push(handle);
        }
    }

    #[test]
    fn test_peek_does_not_remove() {
        let table = InTransitTable::new();
        let handle = table.allocate(&packet_with_channel(21)).unwrap();

        assert_eq!(table.peek(handle).unwrap().channel, 21);
        assert_eq!(table.peek(handle).unwrap().channel, 21);
        assert!(table.take(handle).is_ok());
        assert!(table.peek(handle).is_none());
    }
}
