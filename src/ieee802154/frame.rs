use super::BASE_HEADER_SIZE;
use crate::error::Error;
use crate::mac::types::{AddrMode, FullAddr, SecSpec};

const DST_PAN_ID_OFFSET: usize = 3;
const DST_ADDR_OFFSET: usize = 5;

/// Frame type field value of data frames
pub const FRAME_TYPE_DATA: u16 = 0x0001;
/// Frame type field value of MAC command frames
pub const FRAME_TYPE_COMMAND: u16 = 0x0003;

const FRAME_TYPE_MASK: u16 = 0x0007;
const SECURITY_ENABLED: u16 = 1 << 3;
const ACK_REQUEST: u16 = 1 << 5;
const PAN_COMPRESSION: u16 = 1 << 6;
const DST_ADDR_MODE_SHIFT: u16 = 10;
const SRC_ADDR_MODE_SHIFT: u16 = 14;
const ADDR_MODE_MASK: u16 = 0x3;

/// Frame control field of an IEEE 802.15.4-2006 frame
///
/// Wraps the little-endian frame control word found in the first two PSDU
/// bytes and exposes the fields the platform cares about.
///
/// # Examples
///
/// ```
///   use hardmac_radio::ieee802154::frame::{FrameControl, FRAME_TYPE_DATA};
///
///   // data, ack request, PAN compression, short source and destination
///   let psdu = [0x61, 0x88, 0x5e];
///   let fc = FrameControl::parse(&psdu).unwrap();
///
///   assert_eq!(fc.frame_type(), FRAME_TYPE_DATA);
///   assert!(fc.ack_request());
///   assert!(fc.pan_compression());
///   assert!(!fc.security_enabled());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl(pub u16);

impl FrameControl {
    /// Reads the frame control word from the first two PSDU bytes
    pub fn parse(psdu: &[u8]) -> Result<Self, Error> {
        if psdu.len() < 2 {
            return Err(Error::Abort);
        }

        Ok(Self(u16::from_le_bytes([psdu[0], psdu[1]])))
    }

    /// Builds the frame control word of a synthesized data frame
    pub fn compose(
        src_mode: AddrMode,
        dst_mode: AddrMode,
        secured: bool,
        pan_compressed: bool,
    ) -> Self {
        let mut word = FRAME_TYPE_DATA;
        word |= (src_mode as u16) << SRC_ADDR_MODE_SHIFT;
        word |= (dst_mode as u16) << DST_ADDR_MODE_SHIFT;
        if secured {
            word |= SECURITY_ENABLED;
        }
        if pan_compressed {
            word |= PAN_COMPRESSION;
        }

        Self(word)
    }

    /// Frame type field value
    pub fn frame_type(&self) -> u16 {
        self.0 & FRAME_TYPE_MASK
    }

    /// Security enabled field
    pub fn security_enabled(&self) -> bool {
        self.0 & SECURITY_ENABLED != 0
    }

    /// AR field
    pub fn ack_request(&self) -> bool {
        self.0 & ACK_REQUEST != 0
    }

    /// PAN id compression field
    pub fn pan_compression(&self) -> bool {
        self.0 & PAN_COMPRESSION != 0
    }

    /// Destination addressing mode field
    pub fn dst_addr_mode(&self) -> Result<AddrMode, Error> {
        AddrMode::try_from(((self.0 >> DST_ADDR_MODE_SHIFT) & ADDR_MODE_MASK) as u8)
    }

    /// Source addressing mode field
    pub fn src_addr_mode(&self) -> Result<AddrMode, Error> {
        AddrMode::try_from(((self.0 >> SRC_ADDR_MODE_SHIFT) & ADDR_MODE_MASK) as u8)
    }

    /// Frame control word as it appears in the first two PSDU bytes
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

/// Addressing fields of an outgoing frame
///
/// The fields are parsed positionally: destination PAN id at offset 3,
/// destination address, then source PAN id (unless compressed away) and
/// source address. The source address itself is of no interest to the
/// co-processor, so only its contribution to the field length is computed.
#[derive(Debug, PartialEq, Eq)]
pub struct Addressing {
    /// Destination PAN id and address
    pub dst: FullAddr,
    /// Total length of the addressing fields
    pub field_len: usize,
}

impl Addressing {
    /// Parses the addressing fields following the frame control
    pub fn parse(psdu: &[u8], fc: &FrameControl) -> Result<Self, Error> {
        let dst_mode = fc.dst_addr_mode()?;
        let src_mode = fc.src_addr_mode()?;

        let mut field_len = 0;
        let mut dst = FullAddr::none();

        if dst_mode != AddrMode::None {
            let addr_len = dst_mode.len();
            if psdu.len() < DST_ADDR_OFFSET + addr_len {
                return Err(Error::Abort);
            }

            dst.mode = dst_mode;
            dst.pan_id
                .copy_from_slice(&psdu[DST_PAN_ID_OFFSET..DST_PAN_ID_OFFSET + 2]);
            dst.address[..addr_len]
                .copy_from_slice(&psdu[DST_ADDR_OFFSET..DST_ADDR_OFFSET + addr_len]);
            field_len += 2 + addr_len;
        }

        if src_mode != AddrMode::None {
            field_len += 2 + src_mode.len();
            if fc.pan_compression() {
                // The source PAN id is elided from the frame
                field_len -= 2;
            }
        }

        if psdu.len() < BASE_HEADER_SIZE + field_len {
            return Err(Error::Abort);
        }

        Ok(Self { dst, field_len })
    }
}

/// Auxiliary security header of a secured frame
///
/// The view is validated against the frame buffer: every field is bounds
/// checked before it is read, so a frame whose header overhangs the PSDU is
/// rejected instead of being read past its end.
#[derive(Debug, PartialEq, Eq)]
pub struct AuxSecHeader {
    /// Security parameters carried by the header
    pub spec: SecSpec,
    /// Offset just past the key identifier field
    pub end_offset: usize,
}

impl AuxSecHeader {
    /// Parses the auxiliary security header starting at `offset`
    ///
    /// # Examples
    ///
    /// ```
    ///   use hardmac_radio::ieee802154::frame::AuxSecHeader;
    ///
    ///   let header_bytes = [
    ///       0x0d,                   // security control: level 5, key id mode 1
    ///       0x01, 0x00, 0x00, 0x00, // frame counter
    ///       0x03,                   // key index
    ///   ];
    ///
    ///   let header = AuxSecHeader::parse(&header_bytes, 0).unwrap();
    ///
    ///   assert_eq!(header.spec.security_level, 5);
    ///   assert_eq!(header.spec.key_id_mode, 1);
    ///   assert_eq!(header.spec.key_index, 3);
    ///   assert_eq!(header.end_offset, 6);
    /// ```
    pub fn parse(psdu: &[u8], offset: usize) -> Result<Self, Error> {
        let control = *psdu.get(offset).ok_or(Error::Abort)?;
        let mut spec = SecSpec {
            security_level: control & 0x07,
            key_id_mode: (control >> 3) & 0x03,
            ..SecSpec::default()
        };

        // Skip the security control and the 4-byte frame counter
        let mut cursor = offset + 5;

        if spec.key_id_mode != 0 {
            let source_len = spec.key_source_len();
            let source = psdu.get(cursor..cursor + source_len).ok_or(Error::Abort)?;
            spec.key_source[..source_len].copy_from_slice(source);
            cursor += source_len;

            spec.key_index = *psdu.get(cursor).ok_or(Error::Abort)?;
            cursor += 1;
        } else if psdu.len() < cursor {
            return Err(Error::Abort);
        }

        Ok(Self {
            spec,
            end_offset: cursor,
        })
    }

    /// Writes a header for `spec` at `offset` and returns the end offset
    ///
    /// The frame counter space is zeroed; the co-processor consumed the
    /// actual counter before handing the frame over.
    pub fn emit(psdu: &mut [u8], offset: usize, spec: &SecSpec) -> Result<usize, Error> {
        let key_id_len = if spec.key_id_mode != 0 {
            spec.key_source_len() + 1
        } else {
            0
        };
        let end = offset + 5 + key_id_len;
        if psdu.len() < end {
            return Err(Error::Abort);
        }

        psdu[offset] = (spec.security_level & 0x07) | ((spec.key_id_mode & 0x03) << 3);
        psdu[offset + 1..offset + 5].fill(0);

        if spec.key_id_mode != 0 {
            let source_len = spec.key_source_len();
            let mut cursor = offset + 5;
            psdu[cursor..cursor + source_len].copy_from_slice(&spec.key_source[..source_len]);
            cursor += source_len;
            psdu[cursor] = spec.key_index;
        }

        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_control_fields() {
        // data, security, ack request, PAN compression, short addressing
        let psdu = [0x69, 0x88];
        let fc = FrameControl::parse(&psdu).unwrap();

        assert_eq!(fc.frame_type(), FRAME_TYPE_DATA);
        assert!(fc.security_enabled());
        assert!(fc.ack_request());
        assert!(fc.pan_compression());
        assert_eq!(fc.dst_addr_mode(), Ok(AddrMode::Short));
        assert_eq!(fc.src_addr_mode(), Ok(AddrMode::Short));
    }

    #[test]
    fn test_parse_frame_control_too_short() {
        assert_eq!(FrameControl::parse(&[0x61]), Err(Error::Abort));
    }

    #[test]
    fn test_reserved_addressing_mode_is_rejected() {
        // destination addressing mode bits = 0b01
        let fc = FrameControl(0x0401 | FRAME_TYPE_DATA);
        assert_eq!(fc.dst_addr_mode(), Err(Error::Abort));
    }

    #[test]
    fn test_compose_matches_parsed_fields() {
        let fc = FrameControl::compose(AddrMode::Short, AddrMode::Ext, true, false);

        assert_eq!(fc.frame_type(), FRAME_TYPE_DATA);
        assert_eq!(fc.src_addr_mode(), Ok(AddrMode::Short));
        assert_eq!(fc.dst_addr_mode(), Ok(AddrMode::Ext));
        assert!(fc.security_enabled());
        assert!(!fc.pan_compression());
        assert!(!fc.ack_request());
    }

    #[test]
    fn test_parse_addressing_short_compressed() {
        let psdu = [
            0x61, 0x88, // FCF: data, ack, PAN compression, short/short
            0x07, // SeqNum
            0xCE, 0xFA, // Dst Pan Id
            0x01, 0x00, // Dst Addr
            0x02, 0x00, // Src Addr
        ];
        let fc = FrameControl::parse(&psdu).unwrap();
        let addressing = Addressing::parse(&psdu, &fc).unwrap();

        assert_eq!(addressing.field_len, 6);
        assert_eq!(addressing.dst, FullAddr::short([0xCE, 0xFA], [0x01, 0x00]));
    }

    #[test]
    fn test_parse_addressing_extended_uncompressed() {
        let psdu = [
            0x01, 0xcc, // FCF: data, ext/ext, no compression
            0x07, // SeqNum
            0xCE, 0xFA, // Dst Pan Id
            1, 2, 3, 4, 5, 6, 7, 8, // Dst Addr
            0xAD, 0xDE, // Src Pan Id
            8, 7, 6, 5, 4, 3, 2, 1, // Src Addr
        ];
        let fc = FrameControl::parse(&psdu).unwrap();
        let addressing = Addressing::parse(&psdu, &fc).unwrap();

        assert_eq!(addressing.field_len, 20);
        assert_eq!(
            addressing.dst,
            FullAddr::ext([0xCE, 0xFA], [1, 2, 3, 4, 5, 6, 7, 8])
        );
    }

    #[test]
    fn test_parse_addressing_truncated_frame() {
        let psdu = [0x61, 0x88, 0x07, 0xCE, 0xFA, 0x01];
        let fc = FrameControl::parse(&psdu).unwrap();
        assert_eq!(Addressing::parse(&psdu, &fc), Err(Error::Abort));
    }

    #[test]
    fn test_parse_aux_header_key_id_mode_2() {
        let bytes = [
            0xff, 0xff, 0xff, // unrelated prefix
            0x12, // security control: level 2, key id mode 2
            0x01, 0x00, 0x00, 0x00, // frame counter
            0xAA, 0xBB, 0xCC, 0xDD, // key source
            0x09, // key index
        ];

        let header = AuxSecHeader::parse(&bytes, 3).unwrap();

        assert_eq!(header.spec.security_level, 2);
        assert_eq!(header.spec.key_id_mode, 2);
        assert_eq!(header.spec.key_source[..4], [0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(header.spec.key_index, 0x09);
        assert_eq!(header.end_offset, 13);
    }

    #[test]
    fn test_parse_aux_header_overhanging_buffer() {
        // Key id mode 3 requires 8 source bytes which are not there
        let bytes = [0x1f, 0x01, 0x00, 0x00, 0x00, 0xAA, 0xBB];
        assert_eq!(AuxSecHeader::parse(&bytes, 0), Err(Error::Abort));
    }

    #[test]
    fn test_emit_then_parse_round_trip() {
        let spec = SecSpec {
            security_level: 5,
            key_id_mode: 3,
            key_source: [1, 2, 3, 4, 5, 6, 7, 8],
            key_index: 0x42,
        };
        let mut psdu = [0u8; 32];

        let end = AuxSecHeader::emit(&mut psdu, 9, &spec).unwrap();
        assert_eq!(end, 9 + 5 + 8 + 1);

        let header = AuxSecHeader::parse(&psdu, 9).unwrap();
        assert_eq!(header.spec, spec);
        assert_eq!(header.end_offset, end);
        // the emitted frame counter space is zeroed
        assert_eq!(psdu[10..14], [0, 0, 0, 0]);
    }
}
