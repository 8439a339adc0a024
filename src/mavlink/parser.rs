use bytes::BytesMut;
use tracing::warn;

use crate::mavlink::packet::{
    Packet, MAVLINK_CHECKSUM_LEN, MAVLINK_IFLAG_SIGNED, MAVLINK_MAX_PACKET_LEN,
    MAVLINK_SIGNATURE_LEN, MAVLINK_STX_V1, MAVLINK_STX_V2, MAVLINK_V1_HEADER_LEN,
    MAVLINK_V2_HEADER_LEN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Discarding bytes until a start byte appears.
    WaitingForStartByte,
    /// Accumulating the remaining header bytes.
    WaitingForHeader { header_len: usize },
    /// Accumulating payload, checksum, and signature bytes.
    WaitingForPacket { remaining: usize },
}

/// Incremental MAVLink frame parser.
///
/// Feed it one byte at a time; a completed, validated frame comes back as a
/// [`Packet`]. Garbage between frames and frames that fail validation are
/// discarded and parsing resumes at the next start byte, so a corrupt frame
/// never poisons the stream.
#[derive(Debug)]
pub struct PacketParser {
    buffer: BytesMut,
    state: State,
}

impl PacketParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAVLINK_MAX_PACKET_LEN),
            state: State::WaitingForStartByte,
        }
    }

    /// Number of bytes accumulated for the frame currently being parsed.
    #[allow(dead_code)]
    pub fn bytes_parsed(&self) -> usize {
        self.buffer.len()
    }

    /// Drops any partial frame and waits for the next start byte.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForStartByte;
    }

    /// Consumes one wire byte, returning a packet when it completes a frame.
    pub fn parse_byte(&mut self, byte: u8) -> Option<Packet> {
        match self.state {
            State::WaitingForStartByte => {
                match byte {
                    MAVLINK_STX_V1 => self.start_frame(byte, MAVLINK_V1_HEADER_LEN),
                    MAVLINK_STX_V2 => self.start_frame(byte, MAVLINK_V2_HEADER_LEN),
                    _ => {}
                }
                None
            }
            State::WaitingForHeader { header_len } => {
                self.buffer.extend_from_slice(&[byte]);
                if self.buffer.len() == header_len {
                    let mut remaining = self.buffer[1] as usize + MAVLINK_CHECKSUM_LEN;
                    if header_len == MAVLINK_V2_HEADER_LEN
                        && self.buffer[2] & MAVLINK_IFLAG_SIGNED != 0
                    {
                        remaining += MAVLINK_SIGNATURE_LEN;
                    }
                    self.state = State::WaitingForPacket { remaining };
                }
                None
            }
            State::WaitingForPacket { remaining } => {
                self.buffer.extend_from_slice(&[byte]);
                let remaining = remaining - 1;
                if remaining > 0 {
                    self.state = State::WaitingForPacket { remaining };
                    return None;
                }

                let frame = self.buffer.split().freeze();
                self.clear();
                match Packet::new(frame) {
                    Ok(packet) => Some(packet),
                    Err(error) => {
                        warn!("discarding invalid frame: {error}");
                        None
                    }
                }
            }
        }
    }

    fn start_frame(&mut self, byte: u8, header_len: usize) {
        self.buffer.extend_from_slice(&[byte]);
        self.state = State::WaitingForHeader { header_len };
    }
}

impl Default for PacketParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mavlink::testing::*;
    use crate::mavlink::MavAddress;

    fn feed(parser: &mut PacketParser, bytes: &[u8]) -> Vec<Packet> {
        bytes.iter().filter_map(|&b| parser.parse_byte(b)).collect()
    }

    #[test]
    fn parses_a_v1_frame() {
        let mut parser = PacketParser::new();
        let packets = feed(&mut parser, &ping_v1_bytes());
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].name(), "PING");
        assert_eq!(packets[0].source(), MavAddress::new(192, 168));
        assert_eq!(packets[0].data(), &ping_v1_bytes()[..]);
        assert_eq!(parser.bytes_parsed(), 0);
    }

    #[test]
    fn parses_a_signed_v2_frame() {
        let mut parser = PacketParser::new();
        let packets = feed(&mut parser, &signed_heartbeat_v2_bytes());
        assert_eq!(packets.len(), 1);
        assert!(packets[0].is_signed());
        assert_eq!(packets[0].data(), &signed_heartbeat_v2_bytes()[..]);
    }

    #[test]
    fn skips_garbage_between_frames() {
        let mut parser = PacketParser::new();
        let mut stream = vec![0x01, 0x02, 0x77];
        stream.extend_from_slice(&ping_v1_bytes());
        stream.extend_from_slice(&[0x00, 0x13]);
        stream.extend_from_slice(&heartbeat_v2_bytes());
        stream.push(0x42);

        let packets = feed(&mut parser, &stream);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].data(), &ping_v1_bytes()[..]);
        assert_eq!(packets[1].data(), &heartbeat_v2_bytes()[..]);
    }

    #[test]
    fn preserves_frame_order_and_bytes() {
        let mut parser = PacketParser::new();
        let frames = [
            ping_v2_bytes(),
            heartbeat_v2_bytes(),
            set_mode_v2_bytes(),
            ping_v1_bytes(),
        ];
        let mut stream = Vec::new();
        for frame in &frames {
            stream.extend_from_slice(frame);
        }

        let packets = feed(&mut parser, &stream);
        assert_eq!(packets.len(), frames.len());
        for (packet, frame) in packets.iter().zip(&frames) {
            assert_eq!(packet.data(), &frame[..]);
        }
    }

    #[test]
    fn recovers_from_an_invalid_message_id() {
        let mut parser = PacketParser::new();
        // ID 3 is unassigned; the frame parses structurally but fails
        // validation and is dropped.
        let bad = frame_v1(0, 1, 1, 3, &[0u8; 4]);
        assert!(feed(&mut parser, &bad).is_empty());
        assert_eq!(parser.bytes_parsed(), 0);

        let packets = feed(&mut parser, &ping_v1_bytes());
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn counts_bytes_of_partial_frames() {
        let mut parser = PacketParser::new();
        assert_eq!(parser.bytes_parsed(), 0);
        for (index, &byte) in ping_v2_bytes()[..8].iter().enumerate() {
            parser.parse_byte(byte);
            assert_eq!(parser.bytes_parsed(), index + 1);
        }
        parser.clear();
        assert_eq!(parser.bytes_parsed(), 0);
    }

    #[test]
    fn clear_discards_a_partial_frame() {
        let mut parser = PacketParser::new();
        for &byte in &ping_v2_bytes()[..12] {
            parser.parse_byte(byte);
        }
        parser.clear();

        // A fresh frame still parses from the start.
        let packets = feed(&mut parser, &ping_v2_bytes());
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn start_byte_inside_payload_is_not_a_frame_boundary() {
        let mut parser = PacketParser::new();
        // A payload full of 0xFD bytes must not restart the parser.
        let frame = frame_v2(0, 0, 9, 9, 131, &[0xFD; 255]);
        let packets = feed(&mut parser, &frame);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].name(), "ENCAPSULATED_DATA");
    }
}
