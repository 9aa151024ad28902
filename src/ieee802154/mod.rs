//! Features specific to IEEE 802.15.4 framing

/// Module translating between PHY-level PDUs and MCPS-DATA parameter sets
pub mod codec;

/// Module providing typed views over MAC frame headers
pub mod frame;

/// Locally cached protocol information
pub mod pib;

/// Largest PSDU a PHY packet can carry
pub const MAX_PHY_PACKET_SIZE: usize = 127;

/// Lowest 2.4 GHz O-QPSK channel number
pub const MIN_CHANNEL: u8 = 11;

/// Highest 2.4 GHz O-QPSK channel number
pub const MAX_CHANNEL: u8 = 26;

/// Length of the frame check sequence closing every frame on the air
pub const FCS_SIZE: usize = 2;

/// Frame control plus sequence number, preceding the addressing fields
pub const BASE_HEADER_SIZE: usize = 3;

/// Command frame identifier of the data request MAC command
pub const CMD_DATA_REQUEST: u8 = 0x04;
