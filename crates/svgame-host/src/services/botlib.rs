//! Bot library pass-throughs: script parser, bot console, bot input.

use log::debug;
use svgame_abi::layout::{PcToken, UserCmd};
use svgame_abi::MAX_QPATH;
use svgame_hal::ServerHal;

use super::required_client;
use crate::dispatch::TrapDispatcher;
use crate::error::{TrapError, TrapResult};
use crate::memory::{ModuleAddr, ModuleMemory};
use crate::state::DeferredCall;

impl<H: ServerHal> TrapDispatcher<'_, H> {
    pub(crate) fn handle_pc_load_source(&mut self, mem: &ModuleMemory, filename: ModuleAddr) -> Result<TrapResult, TrapError> {
        Ok(TrapResult::Ok(self.hal.pc_load_source(&mem.read_str(filename)?)))
    }

    /// Returns 1 with the token written, or 0 at end of source.
    pub(crate) fn handle_pc_read_token(
        &mut self,
        mem: &mut ModuleMemory,
        handle: i32,
        token: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let Some(next) = self.hal.pc_read_token(handle) else {
            return Ok(TrapResult::Ok(0));
        };
        next.encode(mem.translate_mut(token, PcToken::SIZE)?);
        Ok(TrapResult::Ok(1))
    }

    pub(crate) fn handle_pc_source_file_and_line(
        &mut self,
        mem: &mut ModuleMemory,
        handle: i32,
        filename: ModuleAddr,
        line: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let Some((name, number)) = self.hal.pc_source_file_and_line(handle) else {
            return Ok(TrapResult::Ok(0));
        };
        mem.write_str(filename, MAX_QPATH as i32, &name)?;
        mem.write_i32(line, number)?;
        Ok(TrapResult::Ok(1))
    }

    /// Pop the oldest command queued for a bot; 0 when there is none.
    pub(crate) fn handle_bot_get_console_message(
        &mut self,
        mem: &mut ModuleMemory,
        client: i32,
        buf: ModuleAddr,
        size: i32,
    ) -> Result<TrapResult, TrapError> {
        let Some(slot) = self.server.client_mut(client) else {
            debug!("[game] console message for bad client {client} ignored");
            return Ok(TrapResult::Ignored);
        };
        let Some(message) = slot.bot_console.pop_front() else {
            return Ok(TrapResult::Ok(0));
        };
        mem.write_str(buf, size, &message)?;
        Ok(TrapResult::Ok(1))
    }

    /// Queue a bot's input command; it becomes the client's last command when
    /// the think hook runs after the current call.
    pub(crate) fn handle_bot_user_command(
        &mut self,
        mem: &ModuleMemory,
        client: i32,
        cmd: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let bytes = mem.translate(cmd, UserCmd::SIZE)?;
        let cmd = UserCmd::decode(bytes).unwrap_or_default();
        required_client(self.server, client)?;
        self.server
            .deferred
            .push_back(DeferredCall::ClientThink(client as usize, cmd));
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_bot_ea_command(
        &mut self,
        mem: &ModuleMemory,
        client: i32,
        command: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        self.hal.ea_command(client, &mem.read_str(command)?);
        Ok(TrapResult::Ok(0))
    }
}
