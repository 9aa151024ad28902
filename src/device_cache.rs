//! Frame counter cache reporting liveness of sleepy children
//!
//! Children with their receiver off only send data polls to stay attached.
//! Those polls never reach the host as frames, but they do advance the frame
//! counters the co-processor keeps in its device table. This cache mirrors
//! the device table and reports a device as active exactly when its counter
//! moved since the previous liveness query.

use crate::mac::types::DeviceDescriptor;

/// Capacity of the co-processor's device table
pub const DEVICE_TABLE_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Empty,
    /// Present in the cache and in the device table
    Live,
    /// Seen during the refresh currently in progress
    Staged,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    state: EntryState,
    /// Extended address in MAC byte order (little-endian)
    ext_address: [u8; 8],
    /// Counter read from the device table during the last refresh
    frame_counter: u32,
    /// Counter captured at the previous liveness query
    queried_counter: u32,
}

const EMPTY_ENTRY: Entry = Entry {
    state: EntryState::Empty,
    ext_address: [0; 8],
    frame_counter: 0,
    queried_counter: 0,
};

/// Per-neighbor frame counter history
///
/// Owned and queried by the main thread only.
pub struct DeviceCache {
    entries: [Entry; DEVICE_TABLE_SIZE],
}

impl DeviceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: [EMPTY_ENTRY; DEVICE_TABLE_SIZE],
        }
    }

    /// Rebuild the cache from a fresh read of the device table
    ///
    /// Entries observed in `descriptors` are updated or inserted; entries
    /// that were not observed are discarded. The staged/live two-phase sweep
    /// keeps an interrupted refresh from leaving stale entries marked alive.
    pub fn refresh<'a>(&mut self, descriptors: impl Iterator<Item = &'a DeviceDescriptor>) {
        for descriptor in descriptors {
            if let Some((entry, inserted)) = self.find_or_insert(descriptor.ext_address) {
                entry.frame_counter = descriptor.frame_counter;
                if inserted {
                    // No history yet, so the first liveness query sees no delta
                    entry.queried_counter = descriptor.frame_counter;
                }
                entry.state = EntryState::Staged;
            }
        }

        for entry in self.entries.iter_mut() {
            match entry.state {
                // Not in the device table anymore
                EntryState::Live => *entry = EMPTY_ENTRY,
                EntryState::Staged => entry.state = EntryState::Live,
                EntryState::Empty => {}
            }
        }
    }

    /// Report whether the device moved its frame counter since the last query
    ///
    /// `ext_address` is in network byte order as the stack presents it; the
    /// cache stores MAC byte order. A device unknown to the cache, or one
    /// queried for the first time since insertion, is reported inactive. An
    /// active answer captures the counter, so the next query measures a
    /// fresh delta.
    pub fn is_active(&mut self, ext_address: [u8; 8]) -> bool {
        let mut mac_address = [0; 8];
        for (i, byte) in mac_address.iter_mut().enumerate() {
            *byte = ext_address[7 - i];
        }

        for entry in self.entries.iter_mut() {
            if entry.state != EntryState::Empty && entry.ext_address == mac_address {
                if entry.frame_counter == entry.queried_counter {
                    return false;
                }
                entry.queried_counter = entry.frame_counter;
                return true;
            }
        }

        false
    }

    fn find_or_insert(&mut self, ext_address: [u8; 8]) -> Option<(&mut Entry, bool)> {
        let mut free = None;

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.state != EntryState::Empty {
                if entry.ext_address == ext_address {
                    return Some((&mut self.entries[index], false));
                }
            } else if free.is_none() {
                free = Some(index);
            }
        }

        let index = free?;
        let entry = &mut self.entries[index];
        *entry = EMPTY_ENTRY;
        entry.ext_address = ext_address;
        entry.state = EntryState::Staged;
        Some((entry, true))
    }
}

impl Default for DeviceCache {
    fn default() -> Self {
        Self::new()
    }
}
