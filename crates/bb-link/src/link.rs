//! Multiplayer link state machine

use crate::protocol::{self, FrameDecoder, Handshake, Packet};
use crate::transport::{LinkTransport, TcpTransport};
use bb_core::config::LinkConfig;
use tracing::{debug, info, trace, warn};

/// Size of the scratch buffer used when draining the transport
const READ_CHUNK: usize = 4096;

/// Callback invoked once per received user frame
pub type MessageHandler = Box<dyn FnMut(&[u8])>;

/// Externally visible link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Multiplayer is switched off locally
    Disabled,
    /// Enabled, but no peer has answered
    Disconnected,
    /// Enabled and the peer has multiplayer enabled too
    Connected,
}

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
}

/// Session-scoped multiplayer link.
///
/// `update` and `set_enabled` are the only operations that change the
/// connection state.
pub struct MultiplayerLink {
    enabled: bool,
    peer_connected: bool,
    transport: Option<Box<dyn LinkTransport>>,
    decoder: FrameDecoder,
    handler: Option<MessageHandler>,
    stats: LinkStats,
    scratch: Box<[u8]>,
}

impl Default for MultiplayerLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiplayerLink {
    /// Create a disabled link with no transport attached
    pub fn new() -> Self {
        Self {
            enabled: false,
            peer_connected: false,
            transport: None,
            decoder: FrameDecoder::new(),
            handler: None,
            stats: LinkStats::default(),
            scratch: vec![0u8; READ_CHUNK].into_boxed_slice(),
        }
    }

    /// Create a link from configuration, connecting over TCP if asked to.
    ///
    /// A failed connection is logged and leaves the link without a transport.
    pub fn from_config(config: &LinkConfig) -> Self {
        let mut link = Self::new();

        if config.connect_on_start {
            match TcpTransport::connect(&config.host, config.port) {
                Ok(transport) => link.attach_transport(Box::new(transport)),
                Err(e) => warn!(
                    "Could not connect link to {}:{}: {}",
                    config.host, config.port, e
                ),
            }
        }

        link.set_enabled(config.enabled);
        link
    }

    /// Attach the byte transport, replacing any previous one
    pub fn attach_transport(&mut self, transport: Box<dyn LinkTransport>) {
        self.transport = Some(transport);
        self.decoder.clear();
        self.peer_connected = false;

        if self.enabled {
            self.send_handshake(Handshake::Request);
        }
    }

    /// Detach the transport; the peer is considered gone
    pub fn detach_transport(&mut self) -> Option<Box<dyn LinkTransport>> {
        self.peer_connected = false;
        self.decoder.clear();
        self.transport.take()
    }

    /// Register the delivery callback for received frames
    pub fn set_message_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&[u8]) + 'static,
    {
        self.handler = Some(Box::new(handler));
    }

    pub fn clear_message_handler(&mut self) {
        self.handler = None;
    }

    /// Switch multiplayer on or off.
    ///
    /// Disabling while connected drops the peer; this is a normal transition.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;

        if enabled {
            info!("Multiplayer enabled");
            self.send_handshake(Handshake::Request);
        } else {
            if self.peer_connected {
                debug!("Multiplayer disabled while connected, dropping peer");
            }
            info!("Multiplayer disabled");
            self.peer_connected = false;
            self.send_handshake(Handshake::Disabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_connected(&self) -> bool {
        self.enabled
            && self.peer_connected
            && self.transport.as_ref().is_some_and(|t| t.is_open())
    }

    pub fn state(&self) -> LinkState {
        if !self.enabled {
            LinkState::Disabled
        } else if self.is_connected() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        }
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Send one frame to the peer.
    ///
    /// Dropped without error when not connected or when `data` exceeds
    /// the maximum frame size. No retry.
    pub fn send_message(&mut self, data: &[u8]) {
        if !self.is_connected() {
            trace!("Dropping {} byte frame: link not connected", data.len());
            self.stats.frames_dropped += 1;
            return;
        }

        let Some(packet) = protocol::encode_user(data) else {
            warn!(
                "Dropping {} byte frame: exceeds maximum of {}",
                data.len(),
                protocol::MAX_FRAME_SIZE
            );
            self.stats.frames_dropped += 1;
            return;
        };

        if self.write(&packet) {
            self.stats.frames_sent += 1;
        } else {
            self.stats.frames_dropped += 1;
        }
    }

    /// Pump the transport once: drain available bytes, refresh the
    /// connection state and deliver complete frames in receipt order.
    pub fn update(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            self.peer_connected = false;
            return;
        };

        loop {
            match transport.read_available(&mut self.scratch) {
                Ok(0) => break,
                Ok(n) => self.decoder.extend(&self.scratch[..n]),
                Err(e) => {
                    warn!("Link read failed: {}", e);
                    break;
                }
            }
        }
        let open = transport.is_open();

        while let Some(packet) = self.decoder.next_packet() {
            self.handle_packet(packet);
        }

        if !open && self.peer_connected {
            info!("Link transport closed, peer disconnected");
            self.peer_connected = false;
        }
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Handshake(state) => {
                debug!("Peer handshake: {:?}", state);
                let was_connected = self.peer_connected;
                self.peer_connected = state.peer_enabled();

                if state == Handshake::Request && self.enabled {
                    self.send_handshake(Handshake::Reply);
                }
                if self.peer_connected != was_connected {
                    info!(
                        "Peer {}",
                        if self.peer_connected { "connected" } else { "disconnected" }
                    );
                }
            }
            Packet::User(payload) => {
                if !self.is_connected() {
                    trace!("Dropping received frame: link not connected");
                    self.stats.frames_dropped += 1;
                    return;
                }

                self.stats.frames_received += 1;
                if let Some(handler) = self.handler.as_mut() {
                    handler(&payload[..]);
                }
            }
        }
    }

    fn send_handshake(&mut self, state: Handshake) {
        if self.transport.is_some() {
            self.write(&protocol::encode_handshake(state));
        }
    }

    /// Write a packet; a failed write disconnects the peer
    fn write(&mut self, packet: &[u8]) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        match transport.write_packet(packet) {
            Ok(()) => true,
            Err(e) => {
                warn!("Link write failed: {}", e);
                self.peer_connected = false;
                false
            }
        }
    }
}
