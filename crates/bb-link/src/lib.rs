//! Multiplayer link for blitbridge
//!
//! A strictly two-endpoint message link: a handshake decides whether the
//! peer is present, and user frames are length-prefixed byte blobs pumped
//! once per tick.

pub mod link;
pub mod protocol;
pub mod transport;

pub use link::{LinkState, LinkStats, MultiplayerLink};
pub use protocol::{FrameDecoder, Handshake, Packet, MAX_FRAME_SIZE};
pub use transport::{LinkTransport, LoopbackTransport, TcpTransport};
