//! Filesystem pass-throughs.

use svgame_hal::ServerHal;

use crate::dispatch::TrapDispatcher;
use crate::error::{TrapError, TrapResult};
use crate::memory::{ModuleAddr, ModuleMemory, NULL_ADDR};

impl<H: ServerHal> TrapDispatcher<'_, H> {
    /// Open a file, storing the handle when an out slot is given.
    ///
    /// Returns the file length, or -1 when it could not be opened.
    pub(crate) fn handle_fs_open(
        &mut self,
        mem: &mut ModuleMemory,
        path: ModuleAddr,
        handle_out: ModuleAddr,
        mode: i32,
    ) -> Result<TrapResult, TrapError> {
        let path = mem.read_str(path)?;
        let (handle, len) = self.hal.fs_open(&path, mode);
        if handle_out != NULL_ADDR {
            mem.write_i32(handle_out, handle)?;
        }
        Ok(TrapResult::Ok(len))
    }

    pub(crate) fn handle_fs_read(
        &mut self,
        mem: &mut ModuleMemory,
        buf: ModuleAddr,
        len: i32,
        handle: i32,
    ) -> Result<TrapResult, TrapError> {
        if len < 0 {
            return Err(TrapError::NegativeLength { length: len });
        }
        self.hal.fs_read(handle, mem.translate_mut(buf, len as usize)?);
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_fs_write(
        &mut self,
        mem: &ModuleMemory,
        buf: ModuleAddr,
        len: i32,
        handle: i32,
    ) -> Result<TrapResult, TrapError> {
        let data = mem.translate_len(buf, len)?;
        Ok(TrapResult::Ok(self.hal.fs_write(handle, data)))
    }

    pub(crate) fn handle_fs_rename(
        &mut self,
        mem: &ModuleMemory,
        from: ModuleAddr,
        to: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        self.hal.fs_rename(&mem.read_str(from)?, &mem.read_str(to)?);
        Ok(TrapResult::Ok(0))
    }

    /// Write matching names NUL-separated into `buf`; returns how many fit.
    pub(crate) fn handle_fs_file_list(
        &mut self,
        mem: &mut ModuleMemory,
        path: ModuleAddr,
        extension: ModuleAddr,
        buf: ModuleAddr,
        size: i32,
    ) -> Result<TrapResult, TrapError> {
        let names = self.hal.fs_file_list(&mem.read_str(path)?, &mem.read_str(extension)?);
        let size = size.max(0) as usize;
        let out = mem.translate_mut(buf, size)?;
        Ok(TrapResult::Ok(pack_names(&names, out)))
    }
}

/// Pack names as consecutive NUL-terminated strings, stopping at the first
/// that does not fit.
fn pack_names(names: &[String], out: &mut [u8]) -> i32 {
    let mut offset = 0;
    let mut count = 0;
    for name in names {
        let needed = name.len() + 1;
        if offset + needed > out.len() {
            break;
        }
        out[offset..offset + name.len()].copy_from_slice(name.as_bytes());
        out[offset + name.len()] = 0;
        offset += needed;
        count += 1;
    }
    count
}
