use std::fmt;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use thiserror::Error;

use crate::connection::Connection;
use crate::mavlink::address::MavAddress;
use crate::mavlink::dialect::{self, MessageInfo};

pub(crate) const MAVLINK_STX_V1: u8 = 0xFE;
pub(crate) const MAVLINK_STX_V2: u8 = 0xFD;
pub(crate) const MAVLINK_V1_HEADER_LEN: usize = 6;
pub(crate) const MAVLINK_V2_HEADER_LEN: usize = 10;
pub(crate) const MAVLINK_CHECKSUM_LEN: usize = 2;
pub(crate) const MAVLINK_SIGNATURE_LEN: usize = 13;
pub(crate) const MAVLINK_IFLAG_SIGNED: u8 = 0x01;
pub(crate) const MAVLINK_MAX_PAYLOAD_LEN: usize = 255;
pub(crate) const MAVLINK_MAX_PACKET_LEN: usize =
    MAVLINK_V2_HEADER_LEN + MAVLINK_MAX_PAYLOAD_LEN + MAVLINK_CHECKSUM_LEN + MAVLINK_SIGNATURE_LEN;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet is empty")]
    Empty,

    #[error("invalid start byte {0:#04x}, expected 0xFE (v1.0) or 0xFD (v2.0)")]
    InvalidMagic(u8),

    #[error("packet ({actual} bytes) is shorter than a {version} header ({expected} bytes)")]
    ShortHeader {
        version: MavVersion,
        actual: usize,
        expected: usize,
    },

    #[error("unknown message ID #{0}")]
    UnknownId(u32),

    #[error("packet is {actual} bytes, should be {expected} bytes")]
    WrongLength { actual: usize, expected: usize },
}

/// MAVLink wire protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MavVersion {
    V1,
    V2,
}

impl fmt::Display for MavVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MavVersion::V1 => write!(f, "v1.0"),
            MavVersion::V2 => write!(f, "v2.0"),
        }
    }
}

/// A complete MAVLink frame (v1 or v2), owning its raw bytes.
///
/// Construction validates the start byte, message ID, and exact frame
/// length (including the 13-byte signature block when the v2 signed
/// incompat flag is set). The signature is carried along verbatim; it is
/// never cryptographically checked here.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Complete frame data: magic, header, payload, checksum, signature.
    data: Bytes,
    version: MavVersion,
    /// The connection the packet arrived on, used to skip it on fan-out.
    connection: Weak<Connection>,
    /// Priority hint assigned at ingress; queue admission may override it.
    priority: i32,
}

impl Packet {
    pub fn new(data: Bytes) -> Result<Self, PacketError> {
        let version = match *data.first().ok_or(PacketError::Empty)? {
            MAVLINK_STX_V1 => MavVersion::V1,
            MAVLINK_STX_V2 => MavVersion::V2,
            other => return Err(PacketError::InvalidMagic(other)),
        };

        let header_len = match version {
            MavVersion::V1 => MAVLINK_V1_HEADER_LEN,
            MavVersion::V2 => MAVLINK_V2_HEADER_LEN,
        };
        if data.len() < header_len {
            return Err(PacketError::ShortHeader {
                version,
                actual: data.len(),
                expected: header_len,
            });
        }

        let packet = Self {
            data,
            version,
            connection: Weak::new(),
            priority: 0,
        };

        let id = packet.id();
        if dialect::by_id(id).is_none() {
            return Err(PacketError::UnknownId(id));
        }

        let mut expected = header_len + packet.payload_len() + MAVLINK_CHECKSUM_LEN;
        if packet.is_signed() {
            expected += MAVLINK_SIGNATURE_LEN;
        }
        if packet.data.len() != expected {
            return Err(PacketError::WrongLength {
                actual: packet.data.len(),
                expected,
            });
        }

        Ok(packet)
    }

    #[inline]
    pub fn version(&self) -> MavVersion {
        self.version
    }

    /// Numeric message ID (one byte for v1, 24 bits for v2).
    #[inline]
    pub fn id(&self) -> u32 {
        match self.version {
            MavVersion::V1 => self.data[5] as u32,
            MavVersion::V2 => u32::from_le_bytes([self.data[7], self.data[8], self.data[9], 0]),
        }
    }

    /// Message name from the dialect table.
    pub fn name(&self) -> &'static str {
        // The ID was checked against the dialect at construction.
        dialect::by_id(self.id()).map(|info| info.name).unwrap_or("UNKNOWN")
    }

    /// Source address, from the header's system and component IDs.
    #[inline]
    pub fn source(&self) -> MavAddress {
        match self.version {
            MavVersion::V1 => MavAddress::new(self.data[3], self.data[4]),
            MavVersion::V2 => MavAddress::new(self.data[5], self.data[6]),
        }
    }

    /// Destination address, when the message type carries target fields.
    ///
    /// v2 frames elide trailing zero payload bytes, so a target field at or
    /// beyond the declared payload length reads as zero. A message with only
    /// a target system yields component 0 (the broadcast component).
    pub fn dest(&self) -> Option<MavAddress> {
        let info: &MessageInfo = dialect::by_id(self.id())?;
        let system_offset = info.target_system?;
        let system = self.payload_byte(system_offset);
        let component = info
            .target_component
            .map_or(0, |offset| self.payload_byte(offset));
        Some(MavAddress::new(system, component))
    }

    /// Complete raw frame bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Declared payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.data[1] as usize
    }

    /// Whether the v2 signed incompat flag is set. Always false for v1.
    pub fn is_signed(&self) -> bool {
        match self.version {
            MavVersion::V1 => false,
            MavVersion::V2 => self.data[2] & MAVLINK_IFLAG_SIGNED != 0,
        }
    }

    /// The connection the packet arrived on, if it is still alive.
    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.upgrade()
    }

    pub fn set_connection(&mut self, connection: &Arc<Connection>) {
        self.connection = Arc::downgrade(connection);
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[allow(dead_code)]
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    fn header_len(&self) -> usize {
        match self.version {
            MavVersion::V1 => MAVLINK_V1_HEADER_LEN,
            MavVersion::V2 => MAVLINK_V2_HEADER_LEN,
        }
    }

    fn payload_byte(&self, offset: u8) -> u8 {
        if (offset as usize) < self.payload_len() {
            self.data[self.header_len() + offset as usize]
        } else {
            0
        }
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Packet {}

impl fmt::Display for Packet {
    /// Prints e.g. `PING (#4) from 192.168 to 127.1 (v2.0)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{}) from {}", self.name(), self.id(), self.source())?;
        if let Some(dest) = self.dest() {
            write!(f, " to {}", dest)?;
        }
        write!(f, " ({})", self.version)
    }
}
