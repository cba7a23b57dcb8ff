//! Trap dispatcher
//!
//! Receives `(opcode, args)` from the running module, decodes it into a
//! [`Trap`], and routes it to the matching service handler in
//! [`crate::services`]. The match is exhaustive over [`Trap`], so adding an
//! opcode without a handler does not compile.
//!
//! Handlers return `Result<TrapResult, TrapError>`; the dispatcher tags any
//! error with its opcode, logs it, and records every request and response in
//! the [`TrapLog`](crate::syslog::TrapLog).
//!
//! The first fatal trap poisons the dispatcher: every later trap in the same
//! module call is refused with that fault, and the server drops the session
//! once the call returns, whatever the module made of the error.

use log::{error, warn};
use svgame_hal::ServerHal;

use crate::config::HostConfig;
use crate::error::{TrapError, TrapFault, TrapResult};
use crate::memory::ModuleMemory;
use crate::mirror::GameData;
use crate::module::TrapHandler;
use crate::state::ServerState;
use crate::trap::Trap;

/// Services traps for one module call.
///
/// Borrows host state for the duration of the call only; a fresh dispatcher
/// is built for every call into the module.
pub struct TrapDispatcher<'a, H: ServerHal> {
    pub(crate) hal: &'a H,
    pub(crate) config: &'a HostConfig,
    pub(crate) server: &'a mut ServerState,
    pub(crate) data: &'a mut GameData,
    fault: Option<TrapFault>,
}

impl<'a, H: ServerHal> TrapDispatcher<'a, H> {
    pub fn new(
        hal: &'a H,
        config: &'a HostConfig,
        server: &'a mut ServerState,
        data: &'a mut GameData,
    ) -> Self {
        Self {
            hal,
            config,
            server,
            data,
            fault: None,
        }
    }

    /// First fatal trap of this call, if any.
    pub fn fault(&self) -> Option<&TrapFault> {
        self.fault.as_ref()
    }

    pub(crate) fn take_fault(&mut self) -> Option<TrapFault> {
        self.fault.take()
    }

    /// Serve one raw trap request.
    pub fn dispatch(&mut self, memory: &mut ModuleMemory, opcode: u32, args: &[i32]) -> TrapResult {
        let now = self.hal.milliseconds();
        let request_id = self.server.trap_log.log_request(opcode, args, now);

        let result = if let Some(fault) = &self.fault {
            warn!("[game] trap {opcode:#x} refused after fatal {fault}");
            TrapResult::Fatal(fault.clone())
        } else {
            match Trap::decode(opcode, args).and_then(|trap| self.handle(memory, trap)) {
                Ok(result) => result,
                Err(e) => {
                    let fault = TrapFault::new(opcode, e);
                    error!("[game] fatal trap {fault}");
                    self.fault = Some(fault.clone());
                    TrapResult::Fatal(fault)
                }
            }
        };

        self.server
            .trap_log
            .log_response(request_id, result.log_value(), now);
        result
    }

    fn handle(&mut self, mem: &mut ModuleMemory, trap: Trap) -> Result<TrapResult, TrapError> {
        match trap {
            // Console, clock, cvars, command line
            Trap::Print { text } => self.handle_print(mem, text),
            Trap::Error { text } => self.handle_error(mem, text),
            Trap::Milliseconds => Ok(TrapResult::Ok(self.hal.milliseconds())),
            Trap::CvarRegister {
                cvar,
                name,
                default_value,
                flags,
            } => self.handle_cvar_register(mem, cvar, name, default_value, flags),
            Trap::CvarUpdate { cvar } => self.handle_cvar_update(mem, cvar),
            Trap::CvarSet { name, value } => self.handle_cvar_set(mem, name, value),
            Trap::CvarIntegerValue { name } => self.handle_cvar_integer_value(mem, name),
            Trap::CvarStringBuffer { name, buf, size } => {
                self.handle_cvar_string_buffer(mem, name, buf, size, false)
            }
            Trap::CvarLatchedStringBuffer { name, buf, size } => {
                self.handle_cvar_string_buffer(mem, name, buf, size, true)
            }
            Trap::Argc => Ok(TrapResult::Ok(self.hal.argc())),
            Trap::Argv { n, buf, size } => self.handle_argv(mem, n, buf, size),
            Trap::SendConsoleCommand { when, text } => self.handle_send_console_command(mem, when, text),

            // Filesystem
            Trap::FsOpen { path, handle_out, mode } => self.handle_fs_open(mem, path, handle_out, mode),
            Trap::FsRead { buf, len, handle } => self.handle_fs_read(mem, buf, len, handle),
            Trap::FsWrite { buf, len, handle } => self.handle_fs_write(mem, buf, len, handle),
            Trap::FsRename { from, to } => self.handle_fs_rename(mem, from, to),
            Trap::FsClose { handle } => {
                self.hal.fs_close(handle);
                Ok(TrapResult::Ok(0))
            }
            Trap::FsFileList {
                path,
                extension,
                buf,
                size,
            } => self.handle_fs_file_list(mem, path, extension, buf, size),

            // Session bootstrap and client slots
            Trap::LocateGameData {
                entities,
                num_entities,
                entity_size,
                clients,
                client_size,
            } => self.handle_locate_game_data(mem, entities, num_entities, entity_size, clients, client_size),
            Trap::DropClient {
                client,
                reason,
                ban_seconds,
            } => self.handle_drop_client(mem, client, reason, ban_seconds),
            Trap::SendServerCommand { client, text } => self.handle_send_server_command(mem, client, text),
            Trap::SetUserinfo { client, value } => self.handle_set_userinfo(mem, client, value),
            Trap::GetUserinfo { client, buf, size } => self.handle_get_userinfo(mem, client, buf, size),
            Trap::GetUsercmd { client, cmd } => self.handle_get_usercmd(mem, client, cmd),
            Trap::BotAllocateClient { client } => self.handle_bot_allocate_client(mem, client),

            // World linkage and collision
            Trap::LinkEntity { ent } => self.handle_link_entity(mem, ent),
            Trap::UnlinkEntity { ent } => self.handle_unlink_entity(mem, ent),
            Trap::EntitiesInBox {
                mins,
                maxs,
                list,
                max_count,
            } => self.handle_entities_in_box(mem, mins, maxs, list, max_count),
            Trap::EntityContact {
                mins,
                maxs,
                ent,
                capsule,
            } => self.handle_entity_contact(mem, mins, maxs, ent, capsule),
            Trap::Trace {
                results,
                start,
                mins,
                maxs,
                end,
                pass_entity,
                content_mask,
                capsule,
            } => self.handle_trace(mem, results, [start, mins, maxs, end], pass_entity, content_mask, capsule),
            Trap::PointContents { point, pass_entity } => self.handle_point_contents(mem, point, pass_entity),
            Trap::SetBrushModel { ent, name } => self.handle_set_brush_model(mem, ent, name),

            // Visibility and area portals
            Trap::InPvs { p1, p2, ignore_portals } => self.handle_in_pvs(mem, p1, p2, ignore_portals),
            Trap::AdjustAreaPortalState { ent, open } => self.handle_adjust_area_portal_state(mem, ent, open),
            Trap::AreasConnected { area1, area2 } => {
                Ok(TrapResult::Ok(self.hal.areas_connected(area1, area2) as i32))
            }

            // Config strings and info strings
            Trap::SetConfigstring { index, value } => self.handle_set_configstring(mem, index, value),
            Trap::GetConfigstring { index, buf, size } => self.handle_get_configstring(mem, index, buf, size),
            Trap::GetServerinfo { buf, size } => self.handle_get_serverinfo(mem, buf, size),

            // Entity text, debug, real time, tags, sound
            Trap::GetEntityToken { buf, size } => self.handle_get_entity_token(mem, buf, size),
            Trap::DebugPolygonCreate {
                color,
                num_points,
                points,
            } => self.handle_debug_polygon_create(mem, color, num_points, points),
            Trap::DebugPolygonDelete { id } => {
                self.hal.debug_polygon_delete(id);
                Ok(TrapResult::Ok(0))
            }
            Trap::RealTime { qtime } => self.handle_real_time(mem, qtime),
            Trap::SnapVector { v } => self.handle_snap_vector(mem, v),
            Trap::GetTag {
                client,
                tag_file,
                name,
                orientation,
            } => self.handle_get_tag(mem, client, tag_file, name, orientation),
            Trap::RegisterTag { filename } => self.handle_register_tag(mem, filename),
            Trap::RegisterSound { name, compressed } => self.handle_register_sound(mem, name, compressed),
            Trap::GetSoundLength { handle } => Ok(TrapResult::Ok(self.hal.sound_length(handle))),

            // Out-of-band binary messages
            Trap::SendMessage { client, buf, len } => self.handle_send_message(mem, client, buf, len),
            Trap::MessageStatus { client } => self.handle_message_status(client),
            Trap::StatReport => Ok(TrapResult::Ok(0)),

            // Raw memory and math helpers
            Trap::Memset { dst, value, len } => self.handle_memset(mem, dst, value, len),
            Trap::Memcpy { dst, src, len } => self.handle_memcpy(mem, dst, src, len),
            Trap::Strncpy { dst, src, len } => self.handle_strncpy(mem, dst, src, len),
            Trap::Sin { x } => Ok(float(x.sin())),
            Trap::Cos { x } => Ok(float(x.cos())),
            Trap::Atan2 { y, x } => Ok(float(y.atan2(x))),
            Trap::Sqrt { x } => Ok(float(x.sqrt())),
            Trap::MatrixMultiply { in1, in2, out } => self.handle_matrix_multiply(mem, in1, in2, out),
            Trap::AngleVectors {
                angles,
                forward,
                right,
                up,
            } => self.handle_angle_vectors(mem, angles, forward, right, up),
            Trap::PerpendicularVector { dst, src } => self.handle_perpendicular_vector(mem, dst, src),
            Trap::Floor { x } => Ok(float(x.floor())),
            Trap::Ceil { x } => Ok(float(x.ceil())),

            // Bot library
            Trap::PcLoadSource { filename } => self.handle_pc_load_source(mem, filename),
            Trap::PcFreeSource { handle } => Ok(TrapResult::Ok(self.hal.pc_free_source(handle))),
            Trap::PcReadToken { handle, token } => self.handle_pc_read_token(mem, handle, token),
            Trap::PcSourceFileAndLine { handle, filename, line } => {
                self.handle_pc_source_file_and_line(mem, handle, filename, line)
            }
            Trap::PcUnreadToken { handle } => {
                self.hal.pc_unread_token(handle);
                Ok(TrapResult::Ok(0))
            }
            Trap::BotGetConsoleMessage { client, buf, size } => {
                self.handle_bot_get_console_message(mem, client, buf, size)
            }
            Trap::BotUserCommand { client, cmd } => self.handle_bot_user_command(mem, client, cmd),
            Trap::BotEaCommand { client, command } => self.handle_bot_ea_command(mem, client, command),
        }
    }
}

impl<H: ServerHal> TrapHandler for TrapDispatcher<'_, H> {
    fn trap(&mut self, memory: &mut ModuleMemory, opcode: u32, args: &[i32]) -> Result<i32, TrapFault> {
        self.dispatch(memory, opcode, args).into_wire()
    }
}

/// A float result travels as its bit pattern.
fn float(value: f32) -> TrapResult {
    TrapResult::Ok(crate::memory::float_result(value))
}
