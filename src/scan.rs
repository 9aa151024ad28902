//! Active and energy scan driver
//!
//! Translates the stack's scan requests into MLME-SCAN parameters and
//! streams the co-processor's beacon notifications and scan confirms back
//! up. At most one scan is in flight; every scan terminates with a single
//! null result marking completion.

use std::any::Any;

use log::warn;

use crate::ieee802154::{MAX_CHANNEL, MIN_CHANNEL};
use crate::mac::types::{AddrMode, BeaconNotifyIndication, ScanType};
use crate::ieee802154::codec::lqi_to_rssi;

/// Channel mask covering channels 11..=26
pub const ALL_CHANNELS_MASK: u32 = 0x07ff_f800;

/// Thread beacon protocol id
const BEACON_PROTOCOL_ID: u8 = 3;
/// Thread beacon protocol version
const BEACON_VERSION: u8 = 1;

/// Reference passed back verbatim with every scan result
pub type ScanContext = &'static (dyn Any + Send + Sync);

/// One discovered network of an active scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveScanResult {
    /// Extended address of the beaconing coordinator
    pub ext_address: [u8; 8],
    /// Network name from the beacon payload
    pub network_name: [u8; 16],
    /// Extended PAN id from the beacon payload
    pub extended_pan_id: [u8; 8],
    /// PAN id of the discovered network
    pub pan_id: u16,
    /// Channel the beacon was received on
    pub channel: u8,
    /// Received power in dBm
    pub rssi: i8,
    /// Link quality of the beacon
    pub lqi: u8,
}

/// One sampled channel of an energy scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyScanResult {
    pub channel: u8,
    pub max_rssi: i8,
}

/// Callback streaming active scan results; `None` marks completion
pub type ActiveScanCallback = fn(Option<&ActiveScanResult>, ScanContext);

/// Callback streaming energy scan results; `None` marks completion
pub type EnergyScanCallback = fn(Option<&EnergyScanResult>, ScanContext);

/// State of the single scan slot
#[derive(Clone, Copy)]
pub enum ScanState {
    Idle,
    Active {
        callback: ActiveScanCallback,
        context: ScanContext,
    },
    Energy {
        callback: EnergyScanCallback,
        context: ScanContext,
        /// Channels still awaiting their energy sample
        mask: u32,
    },
}

impl ScanState {
    /// True while any scan is in flight
    pub fn in_progress(&self) -> bool {
        !matches!(self, ScanState::Idle)
    }
}

/// Maps a scan duration in milliseconds onto the MLME duration exponent
///
/// The exponent relates to the duration as
/// `aBaseSuperframeDuration * (2^n + 1) symbol periods`, roughly `15 ms *
/// 2^n`. Durations under 50 ms appear when the stack passes a placeholder
/// and fall back to a sensible default per scan type.
pub fn duration_to_exponent(duration_ms: u16, scan_type: ScanType) -> u8 {
    if duration_ms < 50 {
        return match scan_type {
            ScanType::Active => 5,
            ScanType::Energy => 6,
        };
    }

    let exponent = (duration_ms as u32 / 15).ilog2();
    exponent.min(14) as u8
}

/// Replaces an empty channel mask with all 2.4 GHz channels
pub fn effective_channel_mask(mask: u32) -> u32 {
    if mask == 0 {
        ALL_CHANNELS_MASK
    } else {
        mask
    }
}

/// Takes the lowest channel still set in `mask`, clearing its bit
///
/// Energy scan confirms list one sample per scanned channel in ascending
/// channel order, so consuming the mask bottom-up pairs each sample with its
/// channel.
pub fn take_lowest_channel(mask: &mut u32) -> Option<u8> {
    for channel in MIN_CHANNEL..=MAX_CHANNEL {
        let bit = 1u32 << channel;
        if *mask & bit != 0 {
            *mask &= !bit;
            return Some(channel);
        }
    }

    None
}

/// Extracts an active scan result from a beacon notification
///
/// Beacons without an extended coordinator address, secured beacons, or
/// payloads that are not Thread beacons are dropped with a warning.
pub fn parse_beacon(indication: &BeaconNotifyIndication) -> Option<ActiveScanResult> {
    let descriptor = &indication.pan_descriptor;

    if descriptor.coord.mode != AddrMode::Ext {
        warn!("invalid beacon received: no extended coordinator address");
        return None;
    }

    if descriptor.security.is_secured() {
        warn!("invalid beacon received: secured beacon");
        return None;
    }

    let sdu = &indication.sdu;
    if sdu.len() < 26 || sdu[0] != BEACON_PROTOCOL_ID || sdu[1] & 0x0f != BEACON_VERSION {
        warn!("invalid beacon payload ({} bytes)", sdu.len());
        return None;
    }

    let mut result = ActiveScanResult {
        ext_address: descriptor.coord.address,
        network_name: [0; 16],
        extended_pan_id: [0; 8],
        pan_id: u16::from_le_bytes(descriptor.coord.pan_id),
        channel: descriptor.logical_channel,
        rssi: lqi_to_rssi(descriptor.link_quality),
        lqi: descriptor.link_quality,
    };
    result.network_name.copy_from_slice(&sdu[2..18]);
    result.extended_pan_id.copy_from_slice(&sdu[18..26]);

    Some(result)
}
