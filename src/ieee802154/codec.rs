//! Translation between the stack's PHY-level PDUs and MCPS-DATA primitives
//!
//! The stack builds and consumes raw PSDUs, laid out exactly as a sniffer
//! would capture them. The co-processor speaks structured MCPS parameter
//! sets and performs security itself. This module converts between the two
//! representations without touching the payload: encryption, the MIC and
//! the FCS are entirely the co-processor's business, the PSDU merely
//! reserves their space.

use log::warn;

use super::frame::{Addressing, AuxSecHeader, FrameControl, FRAME_TYPE_COMMAND, FRAME_TYPE_DATA};
use super::{BASE_HEADER_SIZE, CMD_DATA_REQUEST, FCS_SIZE, MAX_PHY_PACKET_SIZE};
use crate::error::Error;
use crate::mac::types::{
    AddrMode, DataIndication, DataRequest, FullAddr, SecSpec, TX_OPTION_ACK_REQUEST,
    TX_OPTION_INDIRECT,
};
use crate::radio::RadioPacket;

/// MAC primitive a PHY-level submission translates into
#[derive(Debug, PartialEq, Eq)]
pub enum TxAction {
    /// Submit an MCPS-DATA.request; the handle is assigned by the caller
    Data(DataRequest),
    /// Issue a synchronous MLME-POLL.request (data request MAC command)
    Poll {
        /// Coordinator holding the pending data
        dst: FullAddr,
        /// Security parameters parsed from the auxiliary security header
        security: SecSpec,
    },
}

/// Translates an outgoing PHY-level PDU into its MAC primitive
///
/// Only data and MAC command frames can be handed to the hard-MAC; anything
/// else is rejected with [`Error::Abort`]. Of the MAC commands only the data
/// request is meaningful on this platform, as every other command originates
/// in the co-processor itself.
pub fn encode(packet: &RadioPacket) -> Result<TxAction, Error> {
    let psdu = packet.psdu();
    let fc = FrameControl::parse(psdu)?;

    let frame_type = fc.frame_type();
    if frame_type != FRAME_TYPE_DATA && frame_type != FRAME_TYPE_COMMAND {
        warn!("unexpected frame type {:#x} in transmit buffer", frame_type);
        return Err(Error::Abort);
    }

    let addressing = Addressing::parse(psdu, &fc)?;
    let mut header_len = BASE_HEADER_SIZE + addressing.field_len;

    let mut security = SecSpec::default();
    if fc.security_enabled() {
        let aux = AuxSecHeader::parse(psdu, header_len)?;
        security = aux.spec;
        header_len = aux.end_offset;
    }

    if frame_type == FRAME_TYPE_COMMAND {
        return match psdu.get(header_len) {
            Some(&CMD_DATA_REQUEST) => Ok(TxAction::Poll {
                dst: addressing.dst,
                security,
            }),
            command_id => {
                warn!("unsupported MAC command {:?} in transmit buffer", command_id);
                Err(Error::Abort)
            }
        };
    }

    let footer_len = security.mic_len() + FCS_SIZE;
    if psdu.len() < header_len + footer_len {
        return Err(Error::Abort);
    }

    let mut tx_options = 0;
    if fc.ack_request() {
        tx_options |= TX_OPTION_ACK_REQUEST;
    }
    if !packet.direct {
        tx_options |= TX_OPTION_INDIRECT;
    }

    Ok(TxAction::Data(DataRequest {
        src_addr_mode: fc.src_addr_mode()?,
        dst: addressing.dst,
        msdu: psdu[header_len..psdu.len() - footer_len].to_vec(),
        msdu_handle: 0,
        tx_options,
        security,
    }))
}

/// Synthesizes a PHY-level PDU from an MCPS-DATA.indication
///
/// The co-processor already verified and stripped the MAC security, so the
/// rebuilt auxiliary security header carries a zeroed frame counter and the
/// footer space is reserved but not filled. The channel field is left for
/// the caller, which knows the currently selected channel.
pub fn decode(indication: &DataIndication) -> Result<RadioPacket, Error> {
    let mut packet = RadioPacket::new();
    let psdu = &mut packet.psdu;

    let pan_compressed = indication.src.pan_id == indication.dst.pan_id;
    let fc = FrameControl::compose(
        indication.src.mode,
        indication.dst.mode,
        indication.security.is_secured(),
        pan_compressed,
    );

    let mut field_len = 0;
    if indication.dst.mode != AddrMode::None {
        let addr = indication.dst.addr();
        psdu[3..5].copy_from_slice(&indication.dst.pan_id);
        psdu[5..5 + addr.len()].copy_from_slice(addr);
        field_len += 2 + addr.len();
    }

    if indication.src.mode != AddrMode::None {
        let addr = indication.src.addr();
        let mut offset = field_len + 3;
        if !pan_compressed {
            psdu[offset..offset + 2].copy_from_slice(&indication.src.pan_id);
            offset += 2;
            field_len += 2;
        }
        psdu[offset..offset + addr.len()].copy_from_slice(addr);
        field_len += addr.len();
    }

    psdu[0..2].copy_from_slice(&fc.to_le_bytes());
    psdu[2] = indication.dsn;

    let mut header_len = BASE_HEADER_SIZE + field_len;
    if indication.security.is_secured() {
        header_len = AuxSecHeader::emit(psdu, header_len, &indication.security)?;
    }

    let footer_len = indication.security.mic_len() + FCS_SIZE;
    let length = header_len + indication.msdu.len() + footer_len;
    if length > MAX_PHY_PACKET_SIZE {
        warn!(
            "invalid frame length {} (msdu {}, header {}, footer {})",
            length,
            indication.msdu.len(),
            header_len,
            footer_len
        );
        return Err(Error::Abort);
    }

    psdu[header_len..header_len + indication.msdu.len()].copy_from_slice(&indication.msdu);

    packet.length = length as u8;
    packet.lqi = indication.mpdu_link_quality;
    packet.power = lqi_to_rssi(indication.mpdu_link_quality);

    Ok(packet)
}

/// Converts a reported link quality into a power estimate in dBm
pub fn lqi_to_rssi(lqi: u8) -> i8 {
    ((lqi as i32 - 256) / 2) as i8
}
