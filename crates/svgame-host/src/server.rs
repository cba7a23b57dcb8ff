//! Top-level server session
//!
//! [`GameServer`] owns the HAL, the configuration, the module loader, the one
//! live [`ModuleSession`] and all host-private state. Every call into the
//! module goes through [`GameServer::invoke`], which builds a fresh
//! [`TrapDispatcher`] over disjoint borrows of that state, so the module's
//! traps can never overlap with another module call.
//!
//! Calls a trap asks for (a bot's think, a dropped client's disconnect hook)
//! are queued in [`ServerState::deferred`] and delivered here after the
//! requesting call returns.

use log::{debug, error};
use svgame_abi::layout::{PlayerStateHeader, SharedEntity, UserCmd};
use svgame_abi::GameExport;
use svgame_hal::ServerHal;

use crate::client::ClientState;
use crate::config::HostConfig;
use crate::dispatch::TrapDispatcher;
use crate::error::{ConfigError, ModuleError, SessionError, TrapError};
use crate::lifecycle::{LifecycleState, ModuleSession};
use crate::memory::{addr_arg, ModuleAddr, NULL_ADDR};
use crate::module::{GameModule, ModuleCall, ModuleLoader};
use crate::state::{DeferredCall, ServerEntity, ServerRunState, ServerState, MAX_DEFERRED_CALLS};
use crate::syslog::TrapLog;

/// The server's game session: host state plus the module bound to it.
pub struct GameServer<H: ServerHal, L: ModuleLoader> {
    pub(crate) hal: H,
    pub(crate) config: HostConfig,
    pub(crate) loader: L,
    pub(crate) session: ModuleSession<L::Module>,
    pub(crate) server: ServerState,
}

impl<H: ServerHal, L: ModuleLoader> GameServer<H, L> {
    pub fn new(hal: H, config: HostConfig, loader: L) -> Result<Self, ConfigError> {
        config.validate()?;
        let server = ServerState::new(&config);
        Ok(Self {
            hal,
            config,
            loader,
            session: ModuleSession::default(),
            server,
        })
    }

    // ========================================================================
    // Module invocation
    // ========================================================================

    /// Run one module entry point, then deliver any calls its traps deferred.
    ///
    /// Delivery is capped at [`MAX_DEFERRED_CALLS`] per entry point; a module
    /// that keeps deferring from its own deferred calls drops the session.
    pub fn invoke(&mut self, call: &ModuleCall) -> Result<i32, SessionError> {
        let result = self.invoke_once(call)?;
        let mut delivered = 0;
        while let Some(deferred) = self.server.deferred.pop_front() {
            if delivered == MAX_DEFERRED_CALLS {
                error!("[game] more than {MAX_DEFERRED_CALLS} deferred calls after {:?}", call.export);
                self.server.deferred.clear();
                return Err(SessionError::DeferredLimit {
                    limit: MAX_DEFERRED_CALLS,
                });
            }
            delivered += 1;
            let call = match deferred {
                DeferredCall::ClientThink(client, cmd) => {
                    if let Some(slot) = self.server.clients.get_mut(client) {
                        slot.last_usercmd = cmd;
                    }
                    ModuleCall::new(GameExport::ClientThink, &[client as i32])
                }
                DeferredCall::ClientDisconnect(client) => {
                    ModuleCall::new(GameExport::ClientDisconnect, &[client as i32])
                }
            };
            debug!("[game] delivering deferred {:?}", call.export);
            self.invoke_once(&call)?;
        }
        Ok(result)
    }

    fn invoke_once(&mut self, call: &ModuleCall) -> Result<i32, SessionError> {
        let module = self.session.module.as_mut().ok_or(SessionError::NotRunning)?;
        let mut dispatcher = TrapDispatcher::new(&self.hal, &self.config, &mut self.server, &mut self.session.data);
        let result = module.call(call, &mut dispatcher);
        let fault = dispatcher.take_fault();

        let err = match (result, fault) {
            (_, Some(fault)) => ModuleError::Trap(fault),
            (Ok(value), None) => return Ok(value),
            (Err(e), None) => e,
        };
        error!("[game] {:?} failed in {}: {err}", call.export, module.name());
        self.server.deferred.clear();
        Err(SessionError::Drop(err))
    }

    fn check_client(&self, client: usize) -> Result<(), SessionError> {
        if client >= self.server.clients.len() {
            return Err(SessionError::BadClient { index: client });
        }
        Ok(())
    }

    fn call_client(&mut self, export: GameExport, client: usize) -> Result<i32, SessionError> {
        self.check_client(client)?;
        self.invoke(&ModuleCall::new(export, &[client as i32]))
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    pub fn run_frame(&mut self, time: i32) -> Result<(), SessionError> {
        self.server.time = time;
        self.invoke(&ModuleCall::new(GameExport::RunFrame, &[time]))?;
        Ok(())
    }

    /// Offer the current console command to the module.
    ///
    /// Only offered while a game is running; returns whether it was claimed.
    pub fn game_command(&mut self) -> Result<bool, SessionError> {
        if self.server.run_state != ServerRunState::Game {
            return Ok(false);
        }
        Ok(self.invoke(&ModuleCall::new(GameExport::ConsoleCommand, &[]))? != 0)
    }

    /// Ask the module to admit a client; `Some(reason)` means denied.
    pub fn client_connect(&mut self, client: usize, first_time: bool, is_bot: bool) -> Result<Option<String>, SessionError> {
        self.check_client(client)?;
        let call = ModuleCall::new(
            GameExport::ClientConnect,
            &[client as i32, first_time as i32, is_bot as i32],
        );
        let denial = addr_arg(self.invoke(&call)?);
        if denial == NULL_ADDR {
            return Ok(None);
        }
        self.read_module_str(denial).map(Some)
    }

    pub fn client_begin(&mut self, client: usize) -> Result<(), SessionError> {
        self.call_client(GameExport::ClientBegin, client)?;
        Ok(())
    }

    pub fn client_userinfo_changed(&mut self, client: usize) -> Result<(), SessionError> {
        self.call_client(GameExport::ClientUserinfoChanged, client)?;
        Ok(())
    }

    pub fn client_disconnect(&mut self, client: usize) -> Result<(), SessionError> {
        self.call_client(GameExport::ClientDisconnect, client)?;
        Ok(())
    }

    pub fn client_command(&mut self, client: usize) -> Result<(), SessionError> {
        self.call_client(GameExport::ClientCommand, client)?;
        Ok(())
    }

    /// Store a client's input command and let the module run it.
    pub fn client_think(&mut self, client: usize, cmd: UserCmd) -> Result<(), SessionError> {
        self.check_client(client)?;
        self.server.clients[client].last_usercmd = cmd;
        self.call_client(GameExport::ClientThink, client)?;
        Ok(())
    }

    pub fn bot_ai_start_frame(&mut self, time: i32) -> Result<i32, SessionError> {
        self.invoke(&ModuleCall::new(GameExport::BotAiStartFrame, &[time]))
    }

    /// Whether the module wants `entity` included in `client`'s snapshot.
    pub fn snapshot_callback(&mut self, entity: usize, client: usize) -> Result<bool, SessionError> {
        self.check_client(client)?;
        let call = ModuleCall::new(GameExport::SnapshotCallback, &[entity as i32, client as i32]);
        Ok(self.invoke(&call)? != 0)
    }

    /// Deliver an out-of-band message from a client to the module.
    pub fn binary_message_received(
        &mut self,
        client: usize,
        payload: &[u8],
        command_time: i32,
    ) -> Result<(), SessionError> {
        self.check_client(client)?;
        let call = ModuleCall::new(
            GameExport::MessageReceived,
            &[client as i32, payload.len() as i32, command_time],
        )
        .with_payload(payload);
        self.invoke(&call)?;
        Ok(())
    }

    // ========================================================================
    // Host-side client handling
    // ========================================================================

    /// Seat a new connection in `client` and run the module's connect hook.
    ///
    /// A denied connection frees the slot again and returns the reason.
    pub fn connect_client(&mut self, client: usize, address: &str, userinfo: &str) -> Result<Option<String>, SessionError> {
        self.check_client(client)?;
        let slot = &mut self.server.clients[client];
        slot.reset();
        slot.state = ClientState::Connected;
        slot.address = String::from(address);
        slot.set_userinfo(userinfo);
        slot.gentity = Some(client);

        let denial = self.client_connect(client, true, false)?;
        if denial.is_some() {
            self.server.clients[client].reset();
        }
        Ok(denial)
    }

    /// Hand the client's queued reliable commands to the transport.
    pub fn take_reliable_commands(&mut self, client: usize) -> Vec<String> {
        self.server
            .clients
            .get_mut(client)
            .map(|slot| slot.take_reliable_commands())
            .unwrap_or_default()
    }

    /// Hand the pending binary message to the transport, emptying the slot.
    pub fn take_binary_message(&mut self, client: usize) -> Option<Vec<u8>> {
        self.server.clients.get_mut(client)?.binary_message.take()
    }

    /// Transport could not deliver the pending message in time.
    pub fn mark_binary_overflow(&mut self, client: usize) {
        if let Some(slot) = self.server.clients.get_mut(client) {
            slot.binary_message.mark_overflowed();
        }
    }

    pub fn set_run_state(&mut self, state: ServerRunState) {
        self.server.run_state = state;
    }

    // ========================================================================
    // Shared record access
    // ========================================================================

    /// Shared header of entity `index` as the module last wrote it.
    pub fn gentity(&self, index: usize) -> Result<SharedEntity, TrapError> {
        let module = self.session.module.as_ref().ok_or(TrapError::NotLocated)?;
        self.session.data.entities()?.read_shared(module.memory(), index)
    }

    /// Player state header of client `index`.
    pub fn game_client(&self, index: usize) -> Result<PlayerStateHeader, TrapError> {
        let module = self.session.module.as_ref().ok_or(TrapError::NotLocated)?;
        self.session.data.clients()?.read_header(module.memory(), index)
    }

    /// Recover the entity index of a module record address.
    pub fn num_for_gentity(&self, addr: ModuleAddr) -> Result<usize, TrapError> {
        self.session.data.entities()?.address_to_index(addr)
    }

    pub fn sv_entity(&self, index: usize) -> Option<&ServerEntity> {
        self.server.sv_entities.get(index)
    }

    fn read_module_str(&self, addr: ModuleAddr) -> Result<String, SessionError> {
        let module = self.session.module.as_ref().ok_or(SessionError::NotRunning)?;
        module
            .memory()
            .read_str(addr)
            .map_err(|e| SessionError::Drop(ModuleError::Fault(format!("bad string from module: {e}"))))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn state(&self) -> &ServerState {
        &self.server
    }

    pub fn state_mut(&mut self) -> &mut ServerState {
        &mut self.server
    }

    pub fn trap_log(&self) -> &TrapLog {
        &self.server.trap_log
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.session.state()
    }

    pub fn module(&self) -> Option<&L::Module> {
        self.session.module.as_ref()
    }

    pub fn is_single_player(&self) -> bool {
        self.config.is_single_player()
    }

    pub fn is_coop(&self) -> bool {
        self.config.is_coop()
    }
}
