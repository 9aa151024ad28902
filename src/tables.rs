//! Synchronizer of the co-processor's key and device tables
//!
//! The hard-MAC performs AES-CCM* itself, so it must know every device it
//! exchanges secured frames with and every key generation those frames may
//! use. This module rebuilds both tables whenever the stack reports a
//! relevant change: a key rotation, a neighbor set change or a role change.
//! A role change additionally starts or stops 802.15.4 coordinator
//! operation so the device answers beacon requests while routing.

use log::{debug, warn};

use crate::ieee802154::frame::{FRAME_TYPE_COMMAND, FRAME_TYPE_DATA};
use crate::ieee802154::CMD_DATA_REQUEST;
use crate::mac::types::{DeviceDescriptor, KeyIdLookup, KeyTableEntry, SecSpec, StartRequest};
use crate::mac::{MacSap, PibAttr};
use crate::stack::{Neighbor, Role, Stack, CHANGED_ROLE, CHANGED_TABLES_MASK};

/// Devices coverable by one key descriptor's device list
pub const MAX_KEY_DEVICES: u8 = 5;

/// Key source of the Thread default keys
pub const DEFAULT_KEY_SOURCE: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 0xFF];

/// Key generations kept on the co-processor: previous, current, next
const KEY_GENERATIONS: u32 = 3;

// Key usage flags: frame type in the low bits, command id in the high nibble
const USAGE_DATA: u8 = FRAME_TYPE_DATA as u8;
const USAGE_DATA_REQUEST: u8 = FRAME_TYPE_COMMAND as u8 | (CMD_DATA_REQUEST << 4);

/// Mirror of what the synchronizer last wrote to the co-processor
pub struct TableSync {
    device_count: u8,
    is_coordinator: bool,
}

impl TableSync {
    /// Create a synchronizer for a freshly reset co-processor
    pub fn new() -> Self {
        Self {
            device_count: 0,
            is_coordinator: false,
        }
    }

    /// Number of device table entries last written
    pub fn device_count(&self) -> u8 {
        self.device_count
    }

    /// True while the co-processor runs as an 802.15.4 coordinator
    pub fn is_coordinator(&self) -> bool {
        self.is_coordinator
    }

    /// React to a batch of stack state change flags
    pub fn state_changed(&mut self, flags: u32, mac: &dyn MacSap, stack: &dyn Stack, channel: u8) {
        if flags & CHANGED_TABLES_MASK != 0 {
            self.rebuild_tables(mac, stack);
        }
        if flags & CHANGED_ROLE != 0 {
            self.sync_coordinator(mac, stack, channel);
        }
    }

    /// Rebuild the device table and the three key generations
    ///
    /// A failed write leaves the partially updated tables in place; the next
    /// trigger repeats the whole rebuild.
    fn rebuild_tables(&mut self, mac: &dyn MacSap, stack: &dyn Stack) {
        debug!("updating device and key tables");

        let mut sequence = stack.key_sequence();
        if sequence == 0 {
            // 0 is not a valid key sequence; bootstrap past it
            stack.set_key_sequence(2);
            sequence = 2;
        }
        let previous_sequence = sequence - 1;

        let descriptors = build_device_descriptors(stack);
        let count = descriptors.len() as u8;

        for (index, descriptor) in descriptors.iter().enumerate() {
            let status = mac.mlme_set(PibAttr::DeviceTable, index as u8, &descriptor.to_bytes());
            if !status.is_success() {
                warn!("device table write {} failed: {:?}", index, status);
                return;
            }
        }
        let status = mac.mlme_set(PibAttr::DeviceTableEntries, 0, &[count]);
        if !status.is_success() {
            warn!("device table entry count write failed: {:?}", status);
            return;
        }
        self.device_count = count;

        let mut generations: u8 = 0;
        for offset in 0..KEY_GENERATIONS {
            let generation_sequence = previous_sequence + offset;
            if generation_sequence == 0 {
                continue;
            }

            let entry = build_key_entry(stack.mac_key(generation_sequence), generation_sequence, count);
            let status = mac.mlme_set(PibAttr::KeyTable, generations, &entry.to_bytes());
            if !status.is_success() {
                warn!(
                    "key table write for sequence {} failed: {:?}",
                    generation_sequence, status
                );
                return;
            }
            generations += 1;
        }
        let status = mac.mlme_set(PibAttr::KeyTableEntries, 0, &[generations]);
        if !status.is_success() {
            warn!("key table entry count write failed: {:?}", status);
        }
    }

    /// Start or stop coordinator operation to match the stack role
    fn sync_coordinator(&mut self, mac: &dyn MacSap, stack: &dyn Stack, channel: u8) {
        if stack.role().is_coordinator() {
            if self.is_coordinator {
                return;
            }

            let request = StartRequest {
                pan_id: stack.pan_id(),
                logical_channel: channel,
                beacon_order: 15,
                superframe_order: 15,
                pan_coordinator: true,
                battery_life_extension: false,
                coord_realignment: false,
                coord_realign_security: SecSpec::default(),
                beacon_security: SecSpec::default(),
            };
            let status = mac.mlme_start(&request);
            if status.is_success() {
                self.is_coordinator = true;
            } else {
                warn!("MLME-START failed: {:?}", status);
            }
        } else if self.is_coordinator {
            let status = mac.mlme_reset(false);
            if status.is_success() {
                self.is_coordinator = false;
            } else {
                warn!("MLME-RESET failed: {:?}", status);
            }
        }
    }
}

impl Default for TableSync {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect the neighbor set as device descriptors
///
/// A routing device registers up to five children, topped up with router
/// neighbors; a child only registers its parent.
fn build_device_descriptors(stack: &dyn Stack) -> Vec<DeviceDescriptor> {
    let pan_id = stack.pan_id().to_le_bytes();
    let mut descriptors = Vec::new();

    if stack.role() != Role::Child {
        for index in 0..MAX_KEY_DEVICES {
            let Some(child) = stack.child(index) else {
                continue;
            };
            if !child.is_valid() {
                continue;
            }
            descriptors.push(device_descriptor(&child, pan_id));
        }

        let max_routers = MAX_KEY_DEVICES - descriptors.len() as u8;
        for router in stack.router_neighbors(max_routers) {
            descriptors.push(device_descriptor(&router, pan_id));
        }
    } else {
        match stack.parent() {
            Some(parent) => descriptors.push(device_descriptor(&parent, pan_id)),
            None => warn!("error retrieving parent"),
        }
    }

    descriptors
}

fn device_descriptor(neighbor: &Neighbor, pan_id: [u8; 2]) -> DeviceDescriptor {
    let mut ext_address = [0; 8];
    for (i, byte) in ext_address.iter_mut().enumerate() {
        // The stack stores network byte order, the co-processor expects
        // little-endian
        *byte = neighbor.ext_address[7 - i];
    }

    DeviceDescriptor {
        pan_id,
        short_address: neighbor.rloc16.to_le_bytes(),
        ext_address,
        // Relying on the key rotation for replay protection; the counters
        // are not tracked across rebuilds
        frame_counter: 0,
        exempt: false,
    }
}

/// Build the composite key descriptor of one key generation
fn build_key_entry(key: [u8; 16], sequence: u32, device_count: u8) -> KeyTableEntry {
    let mut data = [0u8; 9];
    // Lookup data is the default key source right-concatenated with the
    // key index derived from the sequence number
    data[1..9].copy_from_slice(&DEFAULT_KEY_SOURCE);
    data[0] = ((sequence & 0x7F) as u8) + 1;

    KeyTableEntry {
        key,
        id_lookup: KeyIdLookup { data, size_code: 1 },
        device_flags: (0..device_count).collect(),
        usage_flags: vec![USAGE_DATA, USAGE_DATA_REQUEST],
    }
}
