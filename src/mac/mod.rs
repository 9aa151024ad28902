//! Service access point of the IEEE 802.15.4 hard-MAC co-processor
//!
//! The co-processor owns the MAC layer: framing on the air, CSMA-CA, retries
//! and AES-CCM* all happen on the other side of the command channel. This
//! module defines the synchronous primitives the platform issues downward
//! ([`MacSap`]) and the parameter sets exchanged in both directions
//! ([`types`]). The transport driving the command channel implements
//! [`MacSap`] and feeds asynchronous events into
//! [`MacEventHandler`](crate::radio::MacEventHandler) from its worker thread.

pub mod types;

use types::{DataRequest, FullAddr, ScanRequest, SecSpec, StartRequest};

#[cfg(test)]
use mockall::*;

/// Status code returned by the co-processor for MAC primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The requested operation completed or was accepted
    Success,
    /// CSMA-CA backoffs exhausted
    ChannelAccessFailure,
    /// No MSDU matched the given handle
    InvalidHandle,
    /// A parameter was out of range for the primitive
    InvalidParameter,
    /// No acknowledgment after macMaxFrameRetries
    NoAck,
    /// A poll completed without pending data
    NoData,
    /// An indirect transaction expired before being polled
    TransactionExpired,
    /// The indirect transaction queue is full
    TransactionOverflow,
    /// No key table entry matched the security spec
    UnavailableKey,
    /// A scan request arrived while a scan is running
    ScanInProgress,
    /// The command channel itself failed
    SystemFailure,
    /// Any other status byte
    Other(u8),
}

impl Status {
    /// Decodes a raw status byte from the co-processor
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => Status::Success,
            0xE1 => Status::ChannelAccessFailure,
            0xE7 => Status::InvalidHandle,
            0xE8 => Status::InvalidParameter,
            0xE9 => Status::NoAck,
            0xEB => Status::NoData,
            0xF0 => Status::TransactionExpired,
            0xF1 => Status::TransactionOverflow,
            0xF3 => Status::UnavailableKey,
            0xFC => Status::ScanInProgress,
            0xFF => Status::SystemFailure,
            other => Status::Other(other),
        }
    }

    /// Raw status byte as carried on the command channel
    pub fn raw(self) -> u8 {
        match self {
            Status::Success => 0x00,
            Status::ChannelAccessFailure => 0xE1,
            Status::InvalidHandle => 0xE7,
            Status::InvalidParameter => 0xE8,
            Status::NoAck => 0xE9,
            Status::NoData => 0xEB,
            Status::TransactionExpired => 0xF0,
            Status::TransactionOverflow => 0xF1,
            Status::UnavailableKey => 0xF3,
            Status::ScanInProgress => 0xFC,
            Status::SystemFailure => 0xFF,
            Status::Other(other) => other,
        }
    }

    /// True for [`Status::Success`]
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

/// PIB attribute identifiers accepted by MLME-SET and MLME-GET
///
/// Values follow the IEEE 802.15.4-2006 PIB numbering; `IeeeAddress` is the
/// co-processor's vendor attribute for the device's own EUI-64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PibAttr {
    PhyCurrentChannel = 0x00,
    BeaconPayload = 0x45,
    BeaconPayloadLength = 0x46,
    MaxCsmaBackoffs = 0x4E,
    PanId = 0x50,
    PromiscuousMode = 0x51,
    RxOnWhenIdle = 0x52,
    ShortAddress = 0x53,
    TransactionPersistenceTime = 0x55,
    MaxBe = 0x57,
    MaxFrameRetries = 0x59,
    SecurityEnabled = 0x5D,
    KeyTable = 0x71,
    KeyTableEntries = 0x72,
    DeviceTable = 0x73,
    DeviceTableEntries = 0x74,
    DefaultKeySource = 0x7C,
    IeeeAddress = 0xFF,
}

/// Hardware attribute identifiers accepted by HWME-SET and HWME-GET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HwAttr {
    /// Transceiver power mode control
    PowerCon = 0x00,
    /// Source of reported LQI values
    LqiMode = 0x09,
}

/// LQI derived from receive energy rather than correlation
pub const LQI_MODE_ENERGY_DETECT: u8 = 0x01;

/// Synchronous command interface of the co-processor
///
/// Every method blocks on the serialized command channel until the
/// co-processor answers. Confirms for `mcps_data_request` arrive later and
/// asynchronously; the returned status only covers acceptance of the
/// submission.
#[cfg_attr(test, automock)]
pub trait MacSap: Send + Sync {
    /// MLME-SET.request for one attribute, or one indexed table entry
    fn mlme_set(&self, attr: PibAttr, index: u8, value: &[u8]) -> Status;

    /// MLME-GET.request returning the attribute octets
    fn mlme_get(&self, attr: PibAttr, index: u8) -> Result<Vec<u8>, Status>;

    /// MLME-RESET.request; `set_default_pib` restores the default PIB
    fn mlme_reset(&self, set_default_pib: bool) -> Status;

    /// MLME-START.request making this device a PAN (co)ordinator
    fn mlme_start(&self, request: &StartRequest) -> Status;

    /// MLME-SCAN.request starting an active or energy scan
    fn mlme_scan(&self, request: &ScanRequest) -> Status;

    /// MLME-POLL.request soliciting pending indirect data from `dst`
    fn mlme_poll(&self, dst: &FullAddr, interval: [u8; 2], security: &SecSpec) -> Status;

    /// MCPS-DATA.request submitting one MSDU for transmission
    fn mcps_data_request(&self, request: &DataRequest) -> Status;

    /// HWME-SET.request for one hardware attribute
    fn hwme_set(&self, attr: HwAttr, value: &[u8]) -> Status;

    /// HWME-GET.request returning the hardware attribute octets
    fn hwme_get(&self, attr: HwAttr) -> Result<Vec<u8>, Status>;
}
