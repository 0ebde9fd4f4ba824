//! Payload lifecycle: init once, then tick/render until the payload stops
//!
//! ```text
//! Unloaded --start--> Initialized --advance--> Running --advance(false)/fault--> Unloaded
//!                                                 ^  |
//!                                                 +--+ advance/draw
//! ```

use bb_core::error::{AssetError, HookFault, LifecycleError};
use bb_link::MultiplayerLink;
use bb_loader::{Asset, AssetId, AssetRegistry, CartridgeImage};
use bb_overlay::FrameTarget;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Runtime API a payload calls back into while one of its hooks runs.
///
/// Only the payload-facing half of the link is exposed; pumping the
/// transport stays with the runtime.
pub struct HostApi<'a> {
    assets: &'a AssetRegistry,
    link: &'a mut MultiplayerLink,
}

impl<'a> HostApi<'a> {
    pub fn new(assets: &'a AssetRegistry, link: &'a mut MultiplayerLink) -> Self {
        Self { assets, link }
    }

    /// Look up an embedded resource blob
    pub fn asset(&self, id: AssetId) -> Result<Asset<'a>, AssetError> {
        self.assets.get(id)
    }

    pub fn assets(&self) -> &'a AssetRegistry {
        self.assets
    }

    /// Send a multiplayer frame; silently dropped when not connected
    pub fn send_message(&mut self, data: &[u8]) {
        self.link.send_message(data);
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn set_multiplayer_enabled(&mut self, enabled: bool) {
        self.link.set_enabled(enabled);
    }

    /// Receive every frame the runtime delivers while the session lasts
    pub fn set_message_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&[u8]) + 'static,
    {
        self.link.set_message_handler(handler);
    }
}

/// The three lifecycle hooks of a loaded payload.
///
/// A hook returning `Err` reports a hardware-level fault (bus fault, trap)
/// and ends the session.
pub trait Cartridge {
    /// Called exactly once before any other hook. `false` means init failed.
    fn init(&mut self, api: &mut HostApi<'_>) -> Result<bool, HookFault>;

    /// Advance the game; `false` asks the runtime to stop
    fn tick(&mut self, tick_id: u32, api: &mut HostApi<'_>) -> Result<bool, HookFault>;

    /// Draw the frame for the tick that was just advanced
    fn render(
        &mut self,
        tick_id: u32,
        api: &mut HostApi<'_>,
        frame: &mut dyn FrameTarget,
    ) -> Result<(), HookFault>;
}

/// Hardware collaborator that turns a validated image into callable hooks
pub trait HookBinder {
    fn bind(&mut self, image: &Arc<CartridgeImage>) -> bb_core::Result<Box<dyn Cartridge>>;
}

impl<F> HookBinder for F
where
    F: FnMut(&Arc<CartridgeImage>) -> bb_core::Result<Box<dyn Cartridge>>,
{
    fn bind(&mut self, image: &Arc<CartridgeImage>) -> bb_core::Result<Box<dyn Cartridge>> {
        self(image)
    }
}

/// Session state of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Initialized,
    Running,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Initialized => "initialized",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives one payload through init/tick/render.
///
/// Once the session has ended (tick returned false, a fault, or `unload`)
/// the hooks are dropped and every further call is rejected. A new image
/// needs a new invoker.
pub struct LifecycleInvoker {
    cartridge: Option<Box<dyn Cartridge>>,
    state: SessionState,
    last_tick: Option<u32>,
    trace_ticks: bool,
}

impl LifecycleInvoker {
    pub fn new(cartridge: Box<dyn Cartridge>) -> Self {
        Self {
            cartridge: Some(cartridge),
            state: SessionState::Unloaded,
            last_tick: None,
            trace_ticks: false,
        }
    }

    /// Log every hook call at trace level
    pub fn with_tick_tracing(mut self, enabled: bool) -> Self {
        self.trace_ticks = enabled;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last tick id passed to `advance`
    pub fn last_tick(&self) -> Option<u32> {
        self.last_tick
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Whether the session has ended and the hooks were released
    pub fn is_finished(&self) -> bool {
        self.cartridge.is_none()
    }

    /// Call `init` once: `Unloaded -> Initialized`
    pub fn start(&mut self, api: &mut HostApi<'_>) -> Result<(), LifecycleError> {
        if self.state != SessionState::Unloaded || self.is_finished() {
            return Err(self.invalid("start", self.state));
        }
        if self.trace_ticks {
            trace!("init()");
        }

        match self.hooks("start")?.init(api) {
            Ok(true) => {
                info!("Payload initialized");
                self.state = SessionState::Initialized;
                Ok(())
            }
            Ok(false) => {
                warn!("Payload init reported failure");
                self.terminate();
                Err(LifecycleError::InitFault("init returned failure".to_string()))
            }
            Err(fault) => {
                warn!("Fault during init: {}", fault);
                self.terminate();
                Err(LifecycleError::InitFault(fault.0))
            }
        }
    }

    /// Call `tick(tick_id)`.
    ///
    /// Returns the payload's continue flag. On `false` the session is over.
    pub fn advance(
        &mut self,
        tick_id: u32,
        api: &mut HostApi<'_>,
    ) -> Result<bool, LifecycleError> {
        if !matches!(self.state, SessionState::Initialized | SessionState::Running) {
            return Err(self.invalid("advance", self.state));
        }
        if let Some(last) = self.last_tick {
            if tick_id <= last {
                return Err(LifecycleError::NonMonotonicTick { last, got: tick_id });
            }
        }

        if self.trace_ticks {
            trace!("tick({})", tick_id);
        }
        self.last_tick = Some(tick_id);

        match self.hooks("advance")?.tick(tick_id, api) {
            Ok(true) => {
                self.state = SessionState::Running;
                Ok(true)
            }
            Ok(false) => {
                info!("Payload stopped at tick {}", tick_id);
                self.terminate();
                Ok(false)
            }
            Err(fault) => Err(self.fault(tick_id, fault)),
        }
    }

    /// Call `render(tick_id)` for the tick that was just advanced
    pub fn draw(
        &mut self,
        tick_id: u32,
        api: &mut HostApi<'_>,
        frame: &mut dyn FrameTarget,
    ) -> Result<(), LifecycleError> {
        if self.state != SessionState::Running {
            return Err(self.invalid("draw", self.state));
        }
        if self.last_tick != Some(tick_id) {
            return Err(LifecycleError::RenderBeforeTick {
                last: self.last_tick,
                got: tick_id,
            });
        }

        if self.trace_ticks {
            trace!("render({})", tick_id);
        }

        match self.hooks("draw")?.render(tick_id, api, frame) {
            Ok(()) => Ok(()),
            Err(fault) => Err(self.fault(tick_id, fault)),
        }
    }

    /// End the session from the host side
    pub fn unload(&mut self) {
        if !self.is_finished() {
            info!("Unloading payload ({})", self.state);
        }
        self.terminate();
    }

    fn hooks(&mut self, op: &'static str) -> Result<&mut dyn Cartridge, LifecycleError> {
        match self.cartridge.as_deref_mut() {
            Some(cartridge) => Ok(cartridge),
            None => Err(LifecycleError::InvalidState {
                op,
                state: "finished",
            }),
        }
    }

    fn terminate(&mut self) {
        self.state = SessionState::Unloaded;
        self.cartridge = None;
    }

    fn fault(&mut self, tick: u32, fault: HookFault) -> LifecycleError {
        warn!("Fault at tick {}: {}", tick, fault);
        self.terminate();
        LifecycleError::RuntimeFault {
            tick,
            reason: fault.0,
        }
    }

    fn invalid(&self, op: &'static str, state: SessionState) -> LifecycleError {
        debug!("Rejected {} while {}", op, state);
        LifecycleError::InvalidState {
            op,
            state: if self.is_finished() { "finished" } else { state.name() },
        }
    }
}
