//! Canned MAVLink frames shared by tests across the crate.
//!
//! Checksums are filler bytes; the engine forwards frames verbatim and
//! never recomputes them.

use bytes::Bytes;

use crate::mavlink::packet::Packet;

/// Builds a complete v1 frame around `payload`.
pub fn frame_v1(seq: u8, sysid: u8, compid: u8, msgid: u8, payload: &[u8]) -> Bytes {
    let mut frame = vec![0xFE, payload.len() as u8, seq, sysid, compid, msgid];
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[0xDE, 0xAD]);
    Bytes::from(frame)
}

/// Builds a complete v2 frame around `payload`, with a 13-byte signature
/// block when the signed incompat flag is set.
pub fn frame_v2(
    incompat_flags: u8,
    seq: u8,
    sysid: u8,
    compid: u8,
    msgid: u32,
    payload: &[u8],
) -> Bytes {
    let id = msgid.to_le_bytes();
    let mut frame = vec![
        0xFD,
        payload.len() as u8,
        incompat_flags,
        0x00,
        seq,
        sysid,
        compid,
        id[0],
        id[1],
        id[2],
    ];
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[0xDE, 0xAD]);
    if incompat_flags & 0x01 != 0 {
        frame.extend_from_slice(&[0x5A; 13]);
    }
    Bytes::from(frame)
}

/// PING from 192.168 to 127.1 (v1, payload 14 bytes).
pub fn ping_v1_bytes() -> Bytes {
    let mut payload = [0u8; 14];
    payload[12] = 127;
    payload[13] = 1;
    frame_v1(0x62, 192, 168, 4, &payload)
}

pub fn ping_v1() -> Packet {
    Packet::new(ping_v1_bytes()).unwrap()
}

/// PING from 192.168 to 127.1 (v2).
pub fn ping_v2_bytes() -> Bytes {
    let mut payload = [0u8; 14];
    payload[12] = 127;
    payload[13] = 1;
    frame_v2(0, 0x62, 192, 168, 4, &payload)
}

pub fn ping_v2() -> Packet {
    Packet::new(ping_v2_bytes()).unwrap()
}

/// HEARTBEAT from 127.1 (v2, no destination).
pub fn heartbeat_v2_bytes() -> Bytes {
    frame_v2(0, 0x00, 127, 1, 0, &[0u8; 9])
}

pub fn heartbeat_v2() -> Packet {
    Packet::new(heartbeat_v2_bytes()).unwrap()
}

/// HEARTBEAT from 127.1 with the signed flag and a signature block.
pub fn signed_heartbeat_v2_bytes() -> Bytes {
    frame_v2(0x01, 0x00, 127, 1, 0, &[0u8; 9])
}

/// SET_MODE from 172.0 targeting system 123 (v2, target system only).
pub fn set_mode_v2_bytes() -> Bytes {
    let mut payload = [0u8; 6];
    payload[4] = 123;
    frame_v2(0, 0x01, 172, 0, 11, &payload)
}

pub fn set_mode_v2() -> Packet {
    Packet::new(set_mode_v2_bytes()).unwrap()
}

/// MISSION_SET_CURRENT from 255.23 to 10.10 (v2).
pub fn mission_set_current_v2() -> Packet {
    let mut payload = [0u8; 4];
    payload[2] = 10;
    payload[3] = 10;
    Packet::new(frame_v2(0, 0x07, 255, 23, 41, &payload)).unwrap()
}

/// ENCAPSULATED_DATA from 224.255 (v2, broadcast, full 255-byte payload).
pub fn encapsulated_data_v2() -> Packet {
    Packet::new(frame_v2(0, 0x42, 224, 255, 131, &[0x33; 255])).unwrap()
}

/// PARAM_EXT_REQUEST_LIST from 1.255 to 32.128 (v2).
pub fn param_ext_request_list_v2() -> Packet {
    Packet::new(frame_v2(0, 0x10, 1, 255, 321, &[32, 128])).unwrap()
}

/// COMMAND_ACK with the extension target fields trimmed off (v2); the
/// destination reads as the broadcast address.
pub fn command_ack_trimmed_v2() -> Packet {
    Packet::new(frame_v2(0, 0x09, 5, 5, 77, &[0x10, 0x00, 0x00])).unwrap()
}
