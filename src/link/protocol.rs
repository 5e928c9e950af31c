//! GCS control packet
//!
//! Every datagram sent to the arm controller has the same fixed layout:
//!
//!   header(3, ASCII "GCS") | code(4, i32 little-endian)
//!
//! There is no length field, checksum or sequence number. The byte order
//! of the code is fixed to little-endian and must be agreed with the
//! receiver out of band.

use bytes::BufMut;

/// Packet header, always the three ASCII bytes `G`, `C`, `S`
pub const HEADER: [u8; 3] = *b"GCS";

/// Size of an encoded packet on the wire
pub const PACKET_LEN: usize = 7;

/// Reserved code: periodic keep-alive
pub const KEEP_ALIVE_CODE: i32 = 0;

/// Reserved code: termination, sent as a burst on shutdown
pub const TERMINATE_CODE: i32 = -1;

/// Packets in a termination burst
pub const TERMINATION_REPEATS: u32 = 3;

/// A single control packet. Built fresh for every send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPacket {
    code: i32,
}

impl ControlPacket {
    /// Packet carrying an operator command code
    pub fn command(code: i32) -> Self {
        Self { code }
    }

    pub fn keep_alive() -> Self {
        Self {
            code: KEEP_ALIVE_CODE,
        }
    }

    pub fn terminate() -> Self {
        Self {
            code: TERMINATE_CODE,
        }
    }

    pub fn header(&self) -> [u8; 3] {
        HEADER
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    /// Encode into the 7-byte wire representation
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        let mut buf = &mut out[..];
        buf.put_slice(&self.header());
        buf.put_i32_le(self.code);
        out
    }
}

impl std::fmt::Display for ControlPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code() {
            KEEP_ALIVE_CODE => write!(f, "GCS keep-alive"),
            TERMINATE_CODE => write!(f, "GCS terminate"),
            code => write!(f, "GCS code={}", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(wire: &[u8; PACKET_LEN]) -> i32 {
        i32::from_le_bytes([wire[3], wire[4], wire[5], wire[6]])
    }

    #[test]
    fn test_encode_layout() {
        let wire = ControlPacket::command(5).encode();
        assert_eq!(wire.len(), 7);
        assert_eq!(&wire[..3], b"GCS");
        assert_eq!(&wire[3..], &[0x05, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_code_survives_encoding() {
        for code in [0, 1, 5, 255, 256, 65_536, 1_000_000, i32::MAX] {
            let wire = ControlPacket::command(code).encode();
            assert_eq!(&wire[..3], &HEADER);
            assert_eq!(code_of(&wire), code);
        }
    }

    #[test]
    fn test_terminate_packet() {
        let wire = ControlPacket::terminate().encode();
        assert_eq!(&wire[..3], b"GCS");
        assert_eq!(&wire[3..], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(code_of(&wire), -1);
    }

    #[test]
    fn test_keep_alive_packet() {
        let packet = ControlPacket::keep_alive();
        assert_eq!(packet.code(), 0);
        assert_eq!(packet.header(), HEADER);
        assert_eq!(packet.encode(), *b"GCS\0\0\0\0");
    }

    /// An operator entering 0 produces the same datagram as an automatic
    /// keep-alive. The receiver cannot tell them apart; this is accepted.
    #[test]
    fn test_operator_zero_aliases_keep_alive() {
        assert_eq!(ControlPacket::command(0), ControlPacket::keep_alive());
        assert_eq!(
            ControlPacket::command(0).encode(),
            ControlPacket::keep_alive().encode()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ControlPacket::keep_alive().to_string(), "GCS keep-alive");
        assert_eq!(ControlPacket::terminate().to_string(), "GCS terminate");
        assert_eq!(ControlPacket::command(42).to_string(), "GCS code=42");
    }
}
