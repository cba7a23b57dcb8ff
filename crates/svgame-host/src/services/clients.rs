//! Game data location, client slots, and out-of-band messages.
//!
//! Client-index validation is deliberately asymmetric. Operations with a
//! well-defined "nobody there" meaning (drop, server command, message send
//! and status, bot console) ignore an out-of-range index. Operations whose
//! caller is expected to have validated the index (userinfo, input commands)
//! treat it as fatal.

use log::{debug, info};
use svgame_abi::layout::UserCmd;
use svgame_abi::MAX_BINARY_MESSAGE;
use svgame_hal::ServerHal;

use super::required_client;
use crate::client::ClientState;
use crate::dispatch::TrapDispatcher;
use crate::error::{TrapError, TrapResult};
use crate::memory::{ModuleAddr, ModuleMemory};
use crate::state::DeferredCall;

impl<H: ServerHal> TrapDispatcher<'_, H> {
    pub(crate) fn handle_locate_game_data(
        &mut self,
        mem: &ModuleMemory,
        entities: ModuleAddr,
        num_entities: i32,
        entity_size: i32,
        clients: ModuleAddr,
        client_size: i32,
    ) -> Result<TrapResult, TrapError> {
        self.data.locate(
            mem,
            entities,
            num_entities,
            entity_size,
            clients,
            client_size,
            self.config.max_clients,
        )?;
        debug!(
            "[game] located {num_entities} entities of {entity_size} bytes at {entities:#x}, clients of {client_size} bytes at {clients:#x}"
        );
        Ok(TrapResult::Ok(0))
    }

    /// Drop a client with a reason, optionally banning its address.
    ///
    /// The module's disconnect hook runs after the current call returns.
    pub(crate) fn handle_drop_client(
        &mut self,
        mem: &ModuleMemory,
        client: i32,
        reason: ModuleAddr,
        ban_seconds: i32,
    ) -> Result<TrapResult, TrapError> {
        let Some(slot) = self.server.client_mut(client) else {
            debug!("[game] drop of bad client {client} ignored");
            return Ok(TrapResult::Ignored);
        };
        if slot.state <= ClientState::Zombie {
            debug!("[game] drop of unconnected client {client} ignored");
            return Ok(TrapResult::Ignored);
        }

        let reason = mem.read_str(reason)?;
        info!("[game] dropping client {client} ({}): {reason}", slot.name);
        if ban_seconds > 0 {
            self.hal.temp_ban(&slot.address, ban_seconds);
        }
        slot.state = if slot.is_bot {
            ClientState::Free
        } else {
            ClientState::Zombie
        };
        slot.drop_reason = Some(reason);

        self.server
            .deferred
            .push_back(DeferredCall::ClientDisconnect(client as usize));
        Ok(TrapResult::Ok(0))
    }

    /// Queue a reliable command; client -1 broadcasts.
    pub(crate) fn handle_send_server_command(
        &mut self,
        mem: &ModuleMemory,
        client: i32,
        text: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        if client == -1 {
            let text = mem.read_str(text)?;
            self.server.broadcast_command(&text);
            return Ok(TrapResult::Ok(0));
        }
        if self.server.client(client).is_none() {
            debug!("[game] server command to bad client {client} ignored");
            return Ok(TrapResult::Ignored);
        }
        self.server.add_server_command(client as usize, &mem.read_str(text)?);
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_set_userinfo(
        &mut self,
        mem: &ModuleMemory,
        client: i32,
        value: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let slot = required_client(self.server, client)?;
        slot.set_userinfo(&mem.read_str(value)?);
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_get_userinfo(
        &mut self,
        mem: &mut ModuleMemory,
        client: i32,
        buf: ModuleAddr,
        size: i32,
    ) -> Result<TrapResult, TrapError> {
        if size < 1 {
            return Err(TrapError::BadBufferSize { size });
        }
        let slot = required_client(self.server, client)?;
        mem.write_str(buf, size, &slot.userinfo)?;
        Ok(TrapResult::Ok(0))
    }

    /// Copy the client's last input command; a bad index is fatal.
    pub(crate) fn handle_get_usercmd(
        &mut self,
        mem: &mut ModuleMemory,
        client: i32,
        cmd: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let slot = required_client(self.server, client)?;
        slot.last_usercmd.encode(mem.translate_mut(cmd, UserCmd::SIZE)?);
        Ok(TrapResult::Ok(0))
    }

    /// Claim a slot for a bot.
    ///
    /// A positive `client` asks for that exact slot; otherwise the first free
    /// slot at or above the private range is taken. Returns -1 when none is
    /// available.
    pub(crate) fn handle_bot_allocate_client(
        &mut self,
        mem: &mut ModuleMemory,
        client: i32,
    ) -> Result<TrapResult, TrapError> {
        let max_clients = self.server.clients.len();
        let index = if client > 0 {
            match self.server.client(client) {
                Some(slot) if slot.state == ClientState::Free => client as usize,
                _ => return Ok(TrapResult::Ok(-1)),
            }
        } else {
            let first_free = (self.config.private_clients..max_clients)
                .find(|&i| self.server.clients[i].state == ClientState::Free);
            match first_free {
                Some(i) => i,
                None => return Ok(TrapResult::Ok(-1)),
            }
        };

        let slot = &mut self.server.clients[index];
        slot.reset();
        slot.state = ClientState::Active;
        slot.is_bot = true;
        slot.address = String::from("bot");
        slot.gentity = Some(index);

        if let Ok(entities) = self.data.entities() {
            if index < entities.num_entities() {
                let mut shared = entities.read_shared(mem, index)?;
                shared.number = index as i32;
                entities.write_shared(mem, index, &shared)?;
            }
        }
        info!("[game] bot allocated client slot {index}");
        Ok(TrapResult::Ok(index as i32))
    }

    /// Store a binary message for a client.
    ///
    /// An out-of-range client is ignored. A bad length clears the slot and
    /// is fatal, so no partially written message is ever left behind.
    pub(crate) fn handle_send_message(
        &mut self,
        mem: &ModuleMemory,
        client: i32,
        buf: ModuleAddr,
        len: i32,
    ) -> Result<TrapResult, TrapError> {
        let Some(slot) = self.server.client_mut(client) else {
            debug!("[game] binary message to bad client {client} ignored");
            return Ok(TrapResult::Ignored);
        };
        if len < 0 || len as usize > MAX_BINARY_MESSAGE {
            slot.binary_message.clear();
            return Err(TrapError::BinaryMessageLength { client, length: len });
        }
        let payload = mem.translate(buf, len as usize)?;
        slot.binary_message.store(payload);
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_message_status(&mut self, client: i32) -> Result<TrapResult, TrapError> {
        match self.server.client(client) {
            Some(slot) => Ok(TrapResult::Ok(slot.binary_message.status())),
            None => {
                debug!("[game] message status of bad client {client} ignored");
                Ok(TrapResult::Ignored)
            }
        }
    }
}
