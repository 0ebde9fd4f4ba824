//! Link wire protocol
//!
//! Every packet is `"32BL"` + a four character command:
//!
//! - `MLTI` + one state byte: 0 = disabled, 1 = enabled (request), 2 = enabled (reply)
//! - `USER` + `len:u16` (little-endian) + `len` payload bytes

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, warn};

pub const PACKET_PREFIX: &[u8; 4] = b"32BL";
pub const HANDSHAKE_COMMAND: &[u8; 4] = b"MLTI";
pub const USER_COMMAND: &[u8; 4] = b"USER";

/// Largest user frame the 16-bit length field can describe
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

const COMMAND_LEN: usize = 8;
const HANDSHAKE_LEN: usize = COMMAND_LEN + 1;
const USER_HEADER_LEN: usize = COMMAND_LEN + 2;

/// Handshake state byte
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    Disabled = 0,
    Request = 1,
    Reply = 2,
}

impl Handshake {
    /// Any non-zero byte means the peer has multiplayer enabled
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => Self::Disabled,
            1 => Self::Request,
            _ => Self::Reply,
        }
    }

    pub fn peer_enabled(&self) -> bool {
        *self != Self::Disabled
    }
}

/// A decoded packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Handshake(Handshake),
    User(Bytes),
}

pub fn encode_handshake(state: Handshake) -> [u8; HANDSHAKE_LEN] {
    let mut out = [0u8; HANDSHAKE_LEN];
    out[..4].copy_from_slice(PACKET_PREFIX);
    out[4..8].copy_from_slice(HANDSHAKE_COMMAND);
    out[8] = state as u8;
    out
}

/// Encode a user frame, or `None` if it does not fit the length field
pub fn encode_user(data: &[u8]) -> Option<Vec<u8>> {
    let len = u16::try_from(data.len()).ok()?;

    let mut out = Vec::with_capacity(USER_HEADER_LEN + data.len());
    out.extend_from_slice(PACKET_PREFIX);
    out.extend_from_slice(USER_COMMAND);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(data);
    Some(out)
}

/// Incremental packet decoder fed with whatever bytes the transport has
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes received but not yet part of a complete packet
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Pop the next complete packet, skipping anything that is not one
    pub fn next_packet(&mut self) -> Option<Packet> {
        let mut skipped = 0usize;

        let packet = loop {
            let n = self.buf.len().min(PACKET_PREFIX.len());
            if n == 0 {
                break None;
            }
            if self.buf[..n] != PACKET_PREFIX[..n] {
                self.buf.advance(1);
                skipped += 1;
                continue;
            }
            if self.buf.len() < COMMAND_LEN {
                break None;
            }

            let command = &self.buf[4..8];
            if command == HANDSHAKE_COMMAND {
                if self.buf.len() < HANDSHAKE_LEN {
                    break None;
                }
                let state = Handshake::from_byte(self.buf[8]);
                self.buf.advance(HANDSHAKE_LEN);
                break Some(Packet::Handshake(state));
            } else if command == USER_COMMAND {
                if self.buf.len() < USER_HEADER_LEN {
                    break None;
                }
                let len = u16::from_le_bytes([self.buf[8], self.buf[9]]) as usize;
                if self.buf.len() < USER_HEADER_LEN + len {
                    break None;
                }
                self.buf.advance(USER_HEADER_LEN);
                break Some(Packet::User(self.buf.split_to(len).freeze()));
            } else {
                debug!(
                    "Discarding unknown link command {:?}",
                    String::from_utf8_lossy(command)
                );
                self.buf.advance(COMMAND_LEN);
            }
        };

        if skipped > 0 {
            warn!("Skipped {} stray bytes on the link", skipped);
        }

        packet
    }
}
