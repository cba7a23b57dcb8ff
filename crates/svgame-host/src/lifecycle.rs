//! Module lifecycle
//!
//! Create, warm restart and shutdown of the single module instance:
//!
//! ```text
//! Unloaded -> Created -> Running -> (Restarting -> Running)* -> Shutdown
//! ```
//!
//! Every (re)creation rewinds the entity text cursor and clears per-client
//! entity references before the module's init call, so nothing from a
//! previous instance survives into the next one.

use log::{info, warn};
use svgame_abi::GameExport;
use svgame_hal::ServerHal;

use crate::error::SessionError;
use crate::mirror::GameData;
use crate::module::{GameModule, ModuleCall, ModuleLoader};
use crate::server::GameServer;
use crate::state::ServerRunState;

/// Where the module instance is in its lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    Unloaded,
    /// Instance exists, init not yet complete
    Created,
    Running,
    /// Old instance shut down, replacement not yet initialized
    Restarting,
    Shutdown,
}

/// The one live module instance and the record layout it declared.
pub struct ModuleSession<M> {
    pub(crate) module: Option<M>,
    pub(crate) state: LifecycleState,
    pub(crate) data: GameData,
}

impl<M> Default for ModuleSession<M> {
    fn default() -> Self {
        Self {
            module: None,
            state: LifecycleState::Unloaded,
            data: GameData::default(),
        }
    }
}

impl<M: GameModule> ModuleSession<M> {
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn module(&self) -> Option<&M> {
        self.module.as_ref()
    }

    pub fn data(&self) -> &GameData {
        &self.data
    }

    /// Drop the instance and forget its layout.
    fn release(&mut self) {
        self.module = None;
        self.data.clear();
    }
}

impl<H: ServerHal, L: ModuleLoader> GameServer<H, L> {
    /// Load the module for a new map and initialize it.
    ///
    /// Any instance left from the previous map is shut down first; its
    /// resources are released even if that shutdown call fails, so loading
    /// carries on. Failure to create is fatal: there is no game without a
    /// module.
    pub fn init_game_progs(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.shutdown_game_progs() {
            warn!("[game] previous module did not shut down cleanly: {e}");
        }

        self.server.tags.clear();
        self.server.clear_sv_entities();

        let name = self.config.module_name.clone();
        let module = self.loader.create(&name).map_err(|e| SessionError::CreateFailed {
            module: name.clone(),
            reason: e.to_string(),
        })?;
        info!("[game] created module {name}");

        self.session.module = Some(module);
        self.session.data.clear();
        self.session.state = LifecycleState::Created;
        self.server.run_state = ServerRunState::Loading;

        self.init_game_vm(false)?;
        self.session.state = LifecycleState::Running;
        self.server.run_state = ServerRunState::Game;
        Ok(())
    }

    /// Warm restart: same session, fresh module state.
    ///
    /// A no-op without a module. If the replacement cannot be created the old
    /// instance is already gone; the error is fatal and there is no rollback.
    pub fn restart_game_progs(&mut self) -> Result<(), SessionError> {
        if self.session.module.is_none() {
            return Ok(());
        }
        self.invoke(&ModuleCall::new(GameExport::Shutdown, &[1]))?;
        self.session.state = LifecycleState::Restarting;

        let Some(old) = self.session.module.take() else {
            return Err(SessionError::NotRunning);
        };
        let name = old.name().to_string();
        self.session.data.clear();
        match self.loader.restart(old) {
            Ok(module) => self.session.module = Some(module),
            Err(e) => {
                self.session.state = LifecycleState::Unloaded;
                return Err(SessionError::RestartFailed {
                    module: name,
                    reason: e.to_string(),
                });
            }
        }
        info!("[game] restarted module {name}");

        self.init_game_vm(true)?;
        self.session.state = LifecycleState::Running;
        Ok(())
    }

    /// Tell the module the session is over and release it.
    ///
    /// Idempotent. Resources are released even when the shutdown call fails.
    pub fn shutdown_game_progs(&mut self) -> Result<(), SessionError> {
        if self.session.module.is_none() {
            return Ok(());
        }
        let result = self.invoke(&ModuleCall::new(GameExport::Shutdown, &[0]));
        if let Err(e) = &result {
            warn!("[game] shutdown call failed: {e}");
        }

        self.session.release();
        self.session.state = LifecycleState::Shutdown;
        self.server.deferred.clear();
        self.server.run_state = ServerRunState::Dead;
        info!("[game] module shut down");
        result.map(|_| ())
    }

    /// Reset per-instance host state and call the module's init.
    fn init_game_vm(&mut self, restart: bool) -> Result<(), SessionError> {
        let entity_text = self.hal.entity_string();
        self.server.entity_parser.reset(&entity_text);
        self.server.clear_client_entities();

        let seed = self.hal.milliseconds();
        let call = ModuleCall::new(GameExport::Init, &[self.server.time, seed, restart as i32]);
        self.invoke(&call)?;
        Ok(())
    }
}
