//! Parameter sets of the MCPS and MLME primitives
//!
//! Addresses, PAN ids and key sources are kept as little-endian byte arrays,
//! exactly as they travel on the command channel and in frames on the air.

use crate::error::Error;
use crate::mac::Status;

/// Length of a serialized [`FullAddr`]
pub const FULL_ADDR_SIZE: usize = 11;
/// Length of a serialized [`SecSpec`]
pub const SEC_SPEC_SIZE: usize = 11;
/// Fixed part of an MCPS-DATA.indication preceding the MSDU
pub const DATA_INDICATION_FIXED_SIZE: usize = 29;

/// Addressing modes of IEEE 802.15.4 address fields
///
/// Mode 1 is reserved by the standard and rejected while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// No address present
    None = 0,
    /// 16-bit short address
    Short = 2,
    /// 64-bit extended address
    Ext = 3,
}

impl AddrMode {
    /// Number of address bytes carried in a frame for this mode
    pub fn len(&self) -> usize {
        match self {
            AddrMode::None => 0,
            AddrMode::Short => 2,
            AddrMode::Ext => 8,
        }
    }
}

impl TryFrom<u8> for AddrMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value & 0b0000_0011 {
            0b00 => Ok(AddrMode::None),
            0b10 => Ok(AddrMode::Short),
            0b11 => Ok(AddrMode::Ext),
            _ => Err(Error::Abort),
        }
    }
}

/// Device address as used by the MAC primitives
///
/// The `address` array is padded with zeros beyond the length implied by
/// `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullAddr {
    pub mode: AddrMode,
    /// PAN id, little-endian
    pub pan_id: [u8; 2],
    /// Address value, little-endian
    pub address: [u8; 8],
}

impl FullAddr {
    /// Address with no addressing fields present
    pub fn none() -> Self {
        Self {
            mode: AddrMode::None,
            pan_id: [0; 2],
            address: [0; 8],
        }
    }

    /// Short address on the given PAN
    pub fn short(pan_id: [u8; 2], addr: [u8; 2]) -> Self {
        let mut address = [0; 8];
        address[..2].copy_from_slice(&addr);
        Self {
            mode: AddrMode::Short,
            pan_id,
            address,
        }
    }

    /// Extended address on the given PAN
    pub fn ext(pan_id: [u8; 2], addr: [u8; 8]) -> Self {
        Self {
            mode: AddrMode::Ext,
            pan_id,
            address: addr,
        }
    }

    /// Address bytes actually in use for this mode
    pub fn addr(&self) -> &[u8] {
        &self.address[..self.mode.len()]
    }

    fn parse(buffer: &[u8]) -> Result<Self, Error> {
        if buffer.len() < FULL_ADDR_SIZE {
            return Err(Error::Abort);
        }

        let mode = AddrMode::try_from(buffer[0])?;
        let mut pan_id = [0; 2];
        pan_id.copy_from_slice(&buffer[1..3]);
        let mut address = [0; 8];
        address.copy_from_slice(&buffer[3..11]);

        Ok(Self {
            mode,
            pan_id,
            address,
        })
    }
}

/// Security parameters of a MAC primitive
///
/// A zero `security_level` means the primitive is unsecured and the other
/// fields are ignored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SecSpec {
    /// Security level, 0..=7
    pub security_level: u8,
    /// Key identifier mode, 0..=3
    pub key_id_mode: u8,
    /// Key source; 0, 4 or 8 bytes in use depending on `key_id_mode`
    pub key_source: [u8; 8],
    /// Key index within the keys identified by the source
    pub key_index: u8,
}

impl SecSpec {
    /// True when the security level requests any protection
    pub fn is_secured(&self) -> bool {
        self.security_level != 0
    }

    /// Number of key source bytes present for the key identifier mode
    pub fn key_source_len(&self) -> usize {
        match self.key_id_mode {
            2 => 4,
            3 => 8,
            _ => 0,
        }
    }

    /// MIC length in bytes implied by the security level
    ///
    /// # Examples
    ///
    /// ```
    /// use hardmac_radio::mac::types::SecSpec;
    ///
    /// let mut spec = SecSpec::default();
    /// assert_eq!(spec.mic_len(), 0);
    ///
    /// spec.security_level = 5;
    /// assert_eq!(spec.mic_len(), 4);
    ///
    /// spec.security_level = 7;
    /// assert_eq!(spec.mic_len(), 16);
    /// ```
    pub fn mic_len(&self) -> usize {
        let len = 2usize << (self.security_level % 4);
        if len == 2 {
            0
        } else {
            len
        }
    }

    fn parse(buffer: &[u8]) -> Result<Self, Error> {
        if buffer.len() < SEC_SPEC_SIZE {
            return Err(Error::Abort);
        }

        let mut key_source = [0; 8];
        key_source.copy_from_slice(&buffer[2..10]);

        Ok(Self {
            security_level: buffer[0],
            key_id_mode: buffer[1],
            key_source,
            key_index: buffer[10],
        })
    }
}

/// TxOptions bit requesting an acknowledged transmission
pub const TX_OPTION_ACK_REQUEST: u8 = 1 << 0;
/// TxOptions bit queueing the frame for indirect transmission
pub const TX_OPTION_INDIRECT: u8 = 1 << 2;

/// MCPS-DATA.request parameter set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub src_addr_mode: AddrMode,
    pub dst: FullAddr,
    pub msdu: Vec<u8>,
    /// Non-zero handle matching the eventual confirm
    pub msdu_handle: u8,
    pub tx_options: u8,
    pub security: SecSpec,
}

/// MCPS-DATA.indication parameter set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIndication {
    pub src: FullAddr,
    pub dst: FullAddr,
    pub msdu: Vec<u8>,
    pub mpdu_link_quality: u8,
    pub dsn: u8,
    pub timestamp: u32,
    pub security: SecSpec,
}

impl DataIndication {
    /// Parses the wire form of an MCPS-DATA.indication
    ///
    /// The security spec trails the variable-length MSDU; its offset is
    /// validated against the buffer instead of being trusted, so a truncated
    /// indication is rejected rather than read out of bounds.
    pub fn parse(buffer: &[u8]) -> Result<Self, Error> {
        if buffer.len() < DATA_INDICATION_FIXED_SIZE {
            return Err(Error::Abort);
        }

        let src = FullAddr::parse(&buffer[0..11])?;
        let dst = FullAddr::parse(&buffer[11..22])?;
        let msdu_len = buffer[22] as usize;

        let sec_offset = DATA_INDICATION_FIXED_SIZE + msdu_len;
        if buffer.len() < sec_offset + SEC_SPEC_SIZE {
            return Err(Error::Abort);
        }

        Ok(Self {
            src,
            dst,
            mpdu_link_quality: buffer[23],
            dsn: buffer[24],
            timestamp: u32::from_le_bytes(buffer[25..29].try_into().unwrap()),
            msdu: buffer[DATA_INDICATION_FIXED_SIZE..sec_offset].to_vec(),
            security: SecSpec::parse(&buffer[sec_offset..sec_offset + SEC_SPEC_SIZE])?,
        })
    }
}

/// MCPS-DATA.confirm parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataConfirm {
    pub msdu_handle: u8,
    pub timestamp: u32,
    pub status: Status,
}

/// Scan flavors supported by MLME-SCAN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Energy = 0,
    Active = 1,
}

/// MLME-SCAN.request parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequest {
    pub scan_type: ScanType,
    /// Bit per channel; bit 11 selects channel 11
    pub scan_channels: u32,
    /// Duration exponent, 0..=14
    pub scan_duration: u8,
    pub security: SecSpec,
}

/// MLME-SCAN.confirm parameter set
///
/// For energy scans `result_list` carries one energy sample per scanned
/// channel, in ascending channel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfirm {
    pub status: Status,
    pub scan_type: ScanType,
    pub unscanned_channels: u32,
    pub result_list: Vec<u8>,
}

/// PAN descriptor of a received beacon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanDescriptor {
    pub coord: FullAddr,
    pub logical_channel: u8,
    pub link_quality: u8,
    pub security: SecSpec,
}

/// MLME-BEACON-NOTIFY.indication parameter set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconNotifyIndication {
    pub bsn: u8,
    pub pan_descriptor: PanDescriptor,
    /// Beacon payload octets
    pub sdu: Vec<u8>,
}

/// MLME-START.request parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRequest {
    pub pan_id: u16,
    pub logical_channel: u8,
    pub beacon_order: u8,
    pub superframe_order: u8,
    pub pan_coordinator: bool,
    pub battery_life_extension: bool,
    pub coord_realignment: bool,
    pub coord_realign_security: SecSpec,
    pub beacon_security: SecSpec,
}

/// One entry of the co-processor's device table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// PAN id, little-endian
    pub pan_id: [u8; 2],
    /// Short address, little-endian
    pub short_address: [u8; 2],
    /// Extended address, little-endian
    pub ext_address: [u8; 8],
    pub frame_counter: u32,
    pub exempt: bool,
}

impl DeviceDescriptor {
    /// Serialized size of a device descriptor
    pub const SIZE: usize = 17;

    /// Attribute octets for an MLME-SET of one device table entry
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.pan_id);
        bytes[2..4].copy_from_slice(&self.short_address);
        bytes[4..12].copy_from_slice(&self.ext_address);
        bytes[12..16].copy_from_slice(&self.frame_counter.to_le_bytes());
        bytes[16] = self.exempt as u8;
        bytes
    }

    /// Decodes the attribute octets returned by an MLME-GET
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < Self::SIZE {
            return Err(Error::Failed);
        }

        Ok(Self {
            pan_id: bytes[0..2].try_into().unwrap(),
            short_address: bytes[2..4].try_into().unwrap(),
            ext_address: bytes[4..12].try_into().unwrap(),
            frame_counter: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
            exempt: bytes[16] != 0,
        })
    }
}

/// Key lookup descriptor within a key table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyIdLookup {
    /// Lookup data matched against incoming key identifiers
    pub data: [u8; 9],
    /// 1 selects 9-byte lookup data
    pub size_code: u8,
}

/// One entry of the co-processor's key table
///
/// Serialized as the fixed part (key and list lengths), the single lookup
/// descriptor, the device list and the usage list, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTableEntry {
    pub key: [u8; 16],
    pub id_lookup: KeyIdLookup,
    /// Indices into the device table for devices using this key
    pub device_flags: Vec<u8>,
    /// Frame type / command id flags describing permitted usages
    pub usage_flags: Vec<u8>,
}

impl KeyTableEntry {
    /// Attribute octets for an MLME-SET of one key table entry
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(29 + self.device_flags.len() + self.usage_flags.len());
        bytes.extend_from_slice(&self.key);
        bytes.push(1); // lookup list entries
        bytes.push(self.device_flags.len() as u8);
        bytes.push(self.usage_flags.len() as u8);
        bytes.extend_from_slice(&self.id_lookup.data);
        bytes.push(self.id_lookup.size_code);
        bytes.extend_from_slice(&self.device_flags);
        bytes.extend_from_slice(&self.usage_flags);
        bytes
    }
}
