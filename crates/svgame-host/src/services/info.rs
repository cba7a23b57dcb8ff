//! Config strings, server info, entity text, tags, sound, and time.

use log::{debug, warn};
use svgame_abi::layout::{decode_vec3_array, Orientation, QTime};
use svgame_abi::{MAX_CONFIGSTRINGS, MAX_STRING_CHARS};
use svgame_hal::ServerHal;

use crate::dispatch::TrapDispatcher;
use crate::error::{TrapError, TrapResult};
use crate::memory::{ModuleAddr, ModuleMemory, NULL_ADDR};
use crate::state::{ServerRunState, ServerState};

/// Longest config string sent in one command; longer ones are split.
const MAX_CONFIGSTRING_CHUNK: usize = MAX_STRING_CHARS - 24;

fn configstring_index(index: i32) -> Result<usize, TrapError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < MAX_CONFIGSTRINGS)
        .ok_or(TrapError::BadConfigStringIndex { index })
}

impl<H: ServerHal> TrapDispatcher<'_, H> {
    /// Change a config string and tell every primed client.
    pub(crate) fn handle_set_configstring(
        &mut self,
        mem: &ModuleMemory,
        index: i32,
        value: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let slot = configstring_index(index)?;
        let value = if value == NULL_ADDR {
            String::new()
        } else {
            mem.read_str(value)?
        };
        if self.server.config_strings[slot] == value {
            return Ok(TrapResult::Ok(0));
        }
        if self.server.run_state == ServerRunState::Game {
            send_configstring(self.server, index, &value);
        }
        self.server.config_strings[slot] = value;
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_get_configstring(
        &mut self,
        mem: &mut ModuleMemory,
        index: i32,
        buf: ModuleAddr,
        size: i32,
    ) -> Result<TrapResult, TrapError> {
        if size < 1 {
            return Err(TrapError::BadBufferSize { size });
        }
        let slot = configstring_index(index)?;
        mem.write_str(buf, size, &self.server.config_strings[slot])?;
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_get_serverinfo(
        &mut self,
        mem: &mut ModuleMemory,
        buf: ModuleAddr,
        size: i32,
    ) -> Result<TrapResult, TrapError> {
        if size < 1 {
            return Err(TrapError::BadBufferSize { size });
        }
        mem.write_str(buf, size, &self.hal.server_info())?;
        Ok(TrapResult::Ok(0))
    }

    /// Next token of the entity text; 0 once the text is used up.
    pub(crate) fn handle_get_entity_token(
        &mut self,
        mem: &mut ModuleMemory,
        buf: ModuleAddr,
        size: i32,
    ) -> Result<TrapResult, TrapError> {
        let token = self.server.entity_parser.next_token();
        mem.write_str(buf, size, &token)?;
        let more = !(self.server.entity_parser.is_exhausted() && token.is_empty());
        Ok(TrapResult::Ok(more as i32))
    }

    pub(crate) fn handle_debug_polygon_create(
        &mut self,
        mem: &ModuleMemory,
        color: i32,
        num_points: i32,
        points: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        if num_points < 0 {
            return Err(TrapError::NegativeLength { length: num_points });
        }
        let count = num_points as usize;
        let bytes = mem.translate(points, count * 12)?;
        let points = decode_vec3_array(bytes, count).unwrap_or_default();
        Ok(TrapResult::Ok(self.hal.debug_polygon_create(color, &points)))
    }

    /// Seconds since the epoch; fills the calendar record when one is given.
    pub(crate) fn handle_real_time(&mut self, mem: &mut ModuleMemory, qtime: ModuleAddr) -> Result<TrapResult, TrapError> {
        let (seconds, calendar) = self.hal.real_time();
        if qtime != NULL_ADDR {
            calendar.encode(mem.translate_mut(qtime, QTime::SIZE)?);
        }
        Ok(TrapResult::Ok(seconds))
    }

    /// Round a vector to integral components, ties to even.
    pub(crate) fn handle_snap_vector(&mut self, mem: &mut ModuleMemory, v: ModuleAddr) -> Result<TrapResult, TrapError> {
        let snapped = mem.read_vec3(v)?.map(f32::round_ties_even);
        mem.write_vec3(v, &snapped)?;
        Ok(TrapResult::Ok(0))
    }

    /// Look up an attachment tag.
    ///
    /// Server tag files are searched first. A host with a render client then
    /// asks the presentation side. Returns 0 when no tag was found.
    pub(crate) fn handle_get_tag(
        &mut self,
        mem: &mut ModuleMemory,
        client: i32,
        tag_file: i32,
        name: ModuleAddr,
        orientation: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let name = mem.read_str(name)?;
        let found = match self.server.tags.lookup(tag_file, &name) {
            Some(tag) => Some(tag.clone()),
            None if !self.config.dedicated => self.hal.client_tag(client, &name),
            None => None,
        };
        let Some(found) = found else {
            debug!("[game] tag {name} not found for client {client}");
            return Ok(TrapResult::Ok(0));
        };
        found.encode(mem.translate_mut(orientation, Orientation::SIZE)?);
        Ok(TrapResult::Ok(1))
    }

    /// Load a tag file; returns its 1-based number, or 0 if unreadable.
    pub(crate) fn handle_register_tag(&mut self, mem: &ModuleMemory, filename: ModuleAddr) -> Result<TrapResult, TrapError> {
        let filename = mem.read_str(filename)?;
        if let Some(number) = self.server.tags.file_number(&filename) {
            return Ok(TrapResult::Ok(number));
        }
        let data = match self.hal.fs_read_file(&filename) {
            Ok(data) => data,
            Err(e) => {
                warn!("[game] could not read tag file {filename}: {e}");
                return Ok(TrapResult::Ok(0));
            }
        };
        Ok(TrapResult::Ok(self.server.tags.register(&filename, &data)?))
    }

    pub(crate) fn handle_register_sound(
        &mut self,
        mem: &ModuleMemory,
        name: ModuleAddr,
        compressed: bool,
    ) -> Result<TrapResult, TrapError> {
        Ok(TrapResult::Ok(self.hal.register_sound(&mem.read_str(name)?, compressed)))
    }
}

/// Queue a config string change to every primed client.
///
/// Values too long for one command go out as `bcs0`, `bcs1`..., `bcs2`
/// pieces that the client reassembles.
fn send_configstring(server: &mut ServerState, index: i32, value: &str) {
    let bytes = value.as_bytes();
    if bytes.len() < MAX_CONFIGSTRING_CHUNK {
        server.broadcast_command(&format!("cs {index} \"{value}\""));
        return;
    }

    let piece = MAX_CONFIGSTRING_CHUNK - 1;
    let mut sent = 0;
    while sent < bytes.len() {
        let remaining = bytes.len() - sent;
        let cmd = if sent == 0 {
            "bcs0"
        } else if remaining < MAX_CONFIGSTRING_CHUNK {
            "bcs2"
        } else {
            "bcs1"
        };
        let chunk = String::from_utf8_lossy(&bytes[sent..sent + remaining.min(piece)]);
        server.broadcast_command(&format!("{cmd} {index} \"{chunk}\""));
        sent += piece;
    }
}
