//! Host-private server state
//!
//! Everything here is owned by the host and mutated only by the single
//! active module call or by the host between calls. The module reaches it
//! exclusively through traps.

use std::collections::VecDeque;

use svgame_abi::layout::UserCmd;
use svgame_abi::{MAX_CONFIGSTRINGS, MAX_GENTITIES};

use log::warn;

use crate::client::{ClientSlot, ClientState};
use crate::config::HostConfig;
use crate::entity_string::EntityParser;
use crate::syslog::TrapLog;
use crate::tags::TagRegistry;

/// Overall server state; module console commands are only offered in `Game`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServerRunState {
    #[default]
    Dead,
    Loading,
    Game,
}

/// Host shadow of one entity slot.
///
/// Area/cluster membership computed at link time. The module never sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerEntity {
    pub linked: bool,
    pub area_num: i32,
    /// Second area when the entity spans an area portal, -1 otherwise
    pub area_num2: i32,
    pub clusters: Vec<i32>,
}

impl Default for ServerEntity {
    fn default() -> Self {
        Self {
            linked: false,
            area_num: -1,
            area_num2: -1,
            clusters: Vec::new(),
        }
    }
}

/// Deferred calls delivered after one entry point before the session drops.
pub const MAX_DEFERRED_CALLS: usize = 256;

/// Module calls requested by a trap, delivered after the current call returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferredCall {
    /// Store the command as the client's last input and run it
    ClientThink(usize, UserCmd),
    /// Notify the module that a client was dropped
    ClientDisconnect(usize),
}

/// Host-side state shared by the dispatcher and the lifecycle.
pub struct ServerState {
    pub run_state: ServerRunState,
    /// Server time in milliseconds, passed to module init
    pub time: i32,
    pub clients: Vec<ClientSlot>,
    pub sv_entities: Vec<ServerEntity>,
    pub config_strings: Vec<String>,
    pub entity_parser: EntityParser,
    pub tags: TagRegistry,
    pub deferred: VecDeque<DeferredCall>,
    pub trap_log: TrapLog,
}

impl ServerState {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            run_state: ServerRunState::Dead,
            time: 0,
            clients: vec![ClientSlot::default(); config.max_clients],
            sv_entities: vec![ServerEntity::default(); MAX_GENTITIES],
            config_strings: vec![String::new(); MAX_CONFIGSTRINGS],
            entity_parser: EntityParser::default(),
            tags: TagRegistry::default(),
            deferred: VecDeque::new(),
            trap_log: TrapLog::new(config.trap_log_capacity),
        }
    }

    /// Slot for a module-supplied client number within `[0, max_clients)`.
    pub fn client_mut(&mut self, client: i32) -> Option<&mut ClientSlot> {
        usize::try_from(client).ok().and_then(|i| self.clients.get_mut(i))
    }

    pub fn client(&self, client: i32) -> Option<&ClientSlot> {
        usize::try_from(client).ok().and_then(|i| self.clients.get(i))
    }

    /// Clear per-client entity references left from a previous instance.
    pub fn clear_client_entities(&mut self) {
        for slot in &mut self.clients {
            slot.gentity = None;
        }
    }

    /// Reset every entity shadow to unlinked.
    pub fn clear_sv_entities(&mut self) {
        for ent in &mut self.sv_entities {
            *ent = ServerEntity::default();
        }
    }

    /// Queue a reliable command to every client that receives commands.
    pub fn broadcast_command(&mut self, text: &str) {
        for client in 0..self.clients.len() {
            if self.clients[client].receives_commands() {
                self.add_server_command(client, text);
            }
        }
    }

    /// Queue a reliable command for one client, dropping it on overflow.
    pub fn add_server_command(&mut self, client: usize, text: &str) {
        let Some(slot) = self.clients.get_mut(client) else {
            return;
        };
        if slot.add_server_command(text) || slot.state <= ClientState::Zombie {
            return;
        }
        warn!("[game] client {client} ({}) dropped: server command overflow", slot.name);
        slot.state = if slot.is_bot {
            ClientState::Free
        } else {
            ClientState::Zombie
        };
        slot.drop_reason = Some(String::from("Server command overflow"));
        slot.reliable_commands.clear();
        self.deferred.push_back(DeferredCall::ClientDisconnect(client));
    }
}
