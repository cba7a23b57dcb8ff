//! Console output, cvars and command line.

use svgame_abi::layout::{get_i32, VmCvar};
use svgame_abi::MAX_CVAR_VALUE_STRING;
use svgame_hal::ServerHal;

use crate::dispatch::TrapDispatcher;
use crate::error::{TrapError, TrapResult};
use crate::memory::{ModuleAddr, ModuleMemory, NULL_ADDR};

impl<H: ServerHal> TrapDispatcher<'_, H> {
    pub(crate) fn handle_print(&mut self, mem: &ModuleMemory, text: ModuleAddr) -> Result<TrapResult, TrapError> {
        self.hal.print(&mem.read_str(text)?);
        Ok(TrapResult::Ok(0))
    }

    /// The module gave up; its message becomes the fatal error.
    pub(crate) fn handle_error(&mut self, mem: &ModuleMemory, text: ModuleAddr) -> Result<TrapResult, TrapError> {
        Err(TrapError::ModuleError {
            message: mem.read_str(text)?,
        })
    }

    /// Register a cvar and fill the module's record when one is given.
    pub(crate) fn handle_cvar_register(
        &mut self,
        mem: &mut ModuleMemory,
        cvar: ModuleAddr,
        name: ModuleAddr,
        default_value: ModuleAddr,
        flags: i32,
    ) -> Result<TrapResult, TrapError> {
        let name = mem.read_str(name)?;
        let default_value = mem.read_str(default_value)?;
        let snapshot = self.hal.cvar_register(&name, &default_value, flags);
        if cvar != NULL_ADDR {
            snapshot.encode(mem.translate_mut(cvar, VmCvar::SIZE)?);
        }
        Ok(TrapResult::Ok(0))
    }

    /// Refresh a module cvar record if the cvar changed since the last update.
    pub(crate) fn handle_cvar_update(&mut self, mem: &mut ModuleMemory, cvar: ModuleAddr) -> Result<TrapResult, TrapError> {
        let record = mem.translate(cvar, VmCvar::SIZE)?;
        let handle = get_i32(record, VmCvar::OFF_HANDLE);
        let seen = get_i32(record, VmCvar::OFF_MODIFICATION_COUNT);

        let current = self
            .hal
            .cvar_snapshot(handle)
            .ok_or(TrapError::BadCvarHandle { handle })?;
        if current.modification_count == seen {
            return Ok(TrapResult::Ok(0));
        }
        if current.string.len() >= MAX_CVAR_VALUE_STRING {
            return Err(TrapError::CvarValueTooLong {
                handle,
                length: current.string.len(),
            });
        }
        current.encode(mem.translate_mut(cvar, VmCvar::SIZE)?);
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_cvar_set(
        &mut self,
        mem: &ModuleMemory,
        name: ModuleAddr,
        value: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        self.hal.cvar_set(&mem.read_str(name)?, &mem.read_str(value)?);
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_cvar_integer_value(&mut self, mem: &ModuleMemory, name: ModuleAddr) -> Result<TrapResult, TrapError> {
        Ok(TrapResult::Ok(self.hal.cvar_integer_value(&mem.read_str(name)?)))
    }

    pub(crate) fn handle_cvar_string_buffer(
        &mut self,
        mem: &mut ModuleMemory,
        name: ModuleAddr,
        buf: ModuleAddr,
        size: i32,
        latched: bool,
    ) -> Result<TrapResult, TrapError> {
        let name = mem.read_str(name)?;
        let value = if latched {
            self.hal.cvar_latched_string(&name)
        } else {
            self.hal.cvar_string(&name)
        };
        mem.write_str(buf, size, &value)?;
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_argv(
        &mut self,
        mem: &mut ModuleMemory,
        n: i32,
        buf: ModuleAddr,
        size: i32,
    ) -> Result<TrapResult, TrapError> {
        mem.write_str(buf, size, &self.hal.argv(n))?;
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_send_console_command(
        &mut self,
        mem: &ModuleMemory,
        when: i32,
        text: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        self.hal.exec_text(when, &mem.read_str(text)?);
        Ok(TrapResult::Ok(0))
    }
}
