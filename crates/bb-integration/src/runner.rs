//! Tick loop that ties a session to the link and overlay
//!
//! The runtime owns the session-scoped services (multiplayer link, overlay)
//! and at most one loaded payload. Each `run_tick` performs, in order:
//!
//! 1. `MultiplayerLink::update`
//! 2. `advance(tick_id)`
//! 3. `draw(tick_id)`, only if the payload asked to continue
//! 4. `OverlayPresenter::try_render`

use crate::lifecycle::{HookBinder, HostApi, LifecycleInvoker, SessionState};
use crate::loader::LoadedCartridge;
use bb_core::error::LifecycleError;
use bb_core::{Config, Result};
use bb_link::MultiplayerLink;
use bb_overlay::{FrameTarget, OverlayPresenter};
use tracing::{debug, info};

/// Result of one `run_tick`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Ticked and rendered; keep driving the loop
    Continue,
    /// The payload returned false from `tick`; the session is unloaded
    Finished,
    /// No session loaded, only the link and overlay were serviced
    Idle,
}

struct Session {
    cartridge: LoadedCartridge,
    invoker: LifecycleInvoker,
}

/// Owner of the session and its services.
///
/// A message handler registered by the payload is dropped with its session.
pub struct Runtime {
    config: Config,
    link: MultiplayerLink,
    overlay: OverlayPresenter,
    session: Option<Session>,
    /// Ticks completed by the current session
    ticks: u64,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        info!("Initializing runtime");

        let link = MultiplayerLink::from_config(&config.link);
        let overlay = OverlayPresenter::from_config(&config.overlay);

        Self {
            config,
            link,
            overlay,
            session: None,
            ticks: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn link(&self) -> &MultiplayerLink {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut MultiplayerLink {
        &mut self.link
    }

    pub fn overlay(&self) -> &OverlayPresenter {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut OverlayPresenter {
        &mut self.overlay
    }

    /// Lifecycle state of the current session, `Unloaded` if there is none
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Unloaded, |s| s.invoker.state())
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// The cartridge of the current session
    pub fn loaded(&self) -> Option<&LoadedCartridge> {
        self.session.as_ref().map(|s| &s.cartridge)
    }

    /// Ticks completed by the current session
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Bind the cartridge's hooks and run `init`.
    ///
    /// On failure the runtime is left without a session.
    pub fn launch(&mut self, cartridge: LoadedCartridge, binder: &mut dyn HookBinder) -> Result<()> {
        if let Some(session) = &self.session {
            return Err(LifecycleError::InvalidState {
                op: "launch",
                state: session.invoker.state().name(),
            }
            .into());
        }

        let hooks = binder.bind(&cartridge.image)?;
        let mut invoker =
            LifecycleInvoker::new(hooks).with_tick_tracing(self.config.debug.trace_ticks);

        let started = {
            let mut api = HostApi::new(&cartridge.registry, &mut self.link);
            invoker.start(&mut api)
        };
        if let Err(e) = started {
            self.link.clear_message_handler();
            return Err(e.into());
        }

        info!(
            "Session started: {}",
            cartridge.title().unwrap_or("<untitled>")
        );
        self.ticks = 0;
        self.session = Some(Session { cartridge, invoker });
        Ok(())
    }

    /// Run one tick of the loop against `frame`
    pub fn run_tick(&mut self, tick_id: u32, frame: &mut dyn FrameTarget) -> Result<TickOutcome> {
        self.link.update();

        let result = match self.session.as_mut() {
            None => Ok(TickOutcome::Idle),
            Some(session) => {
                let mut api = HostApi::new(&session.cartridge.registry, &mut self.link);
                let result = match session.invoker.advance(tick_id, &mut api) {
                    Ok(true) => session
                        .invoker
                        .draw(tick_id, &mut api, frame)
                        .map(|()| TickOutcome::Continue),
                    Ok(false) => Ok(TickOutcome::Finished),
                    Err(e) => Err(e),
                };

                if session.invoker.is_finished() {
                    debug!("Session ended at tick {}", tick_id);
                    self.session = None;
                    self.link.clear_message_handler();
                }
                result
            }
        };

        self.overlay.try_render(frame, false);

        if result == Ok(TickOutcome::Continue) {
            self.ticks += 1;
        }
        result.map_err(Into::into)
    }

    /// Drop the current session, if any
    pub fn unload(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.invoker.unload();
            self.link.clear_message_handler();
            info!("Session unloaded after {} ticks", self.ticks);
        }
    }
}
