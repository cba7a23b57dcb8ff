//! Boundary integration tests
//!
//! Drive a [`GameServer`] with a scripted in-process module over a mock HAL
//! that has a tiny four-leaf map, real cvar storage and an in-memory
//! filesystem.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use svgame_abi::layout::{Orientation, PlayerStateHeader, QTime, SharedEntity, TraceResult, UserCmd, Vec3, VmCvar};
use svgame_abi::{message_status, trap, ENTITYNUM_NONE, MAX_BINARY_MESSAGE};
use svgame_hal::{EntityLink, FileHandle, HalError, ServerHal};
use svgame_host::{
    encode_tag_file, ClientState, GameData, GameExport, GameModule, GameServer, HostConfig, LifecycleState,
    ModuleCall, ModuleError, ModuleLoader, ModuleMemory, ServerRunState, ServerState, SessionError, TrapDispatcher,
    TrapError, TrapHandler, TrapResult, MAX_DEFERRED_CALLS,
};

// ============================================================================
// Mock HAL for Testing
// ============================================================================

/// Four leaves along the x axis, 100 units each.
///
/// Leaves 0-2 share cluster 0 and leaf 3 is cluster 1. Every leaf is its own
/// area. Each cluster sees only itself. Areas 0 and 1 start connected by an
/// open portal; area 2 is sealed off.
pub struct MockHal {
    time: Cell<i32>,
    prints: RefCell<Vec<String>>,
    cvars: RefCell<Vec<(String, VmCvar)>>,
    files: RefCell<BTreeMap<String, Vec<u8>>>,
    bans: RefCell<Vec<(String, i32)>>,
    open_portals: RefCell<BTreeSet<(i32, i32)>>,
    entity_text: String,
}

impl MockHal {
    pub fn new() -> Self {
        Self {
            time: Cell::new(0),
            prints: RefCell::new(Vec::new()),
            cvars: RefCell::new(Vec::new()),
            files: RefCell::new(BTreeMap::new()),
            bans: RefCell::new(Vec::new()),
            open_portals: RefCell::new(BTreeSet::from([(0, 1)])),
            entity_text: String::from("{ \"classname\" \"worldspawn\" }"),
        }
    }

    pub fn add_file(&self, path: &str, data: Vec<u8>) {
        self.files.borrow_mut().insert(path.to_string(), data);
    }

    fn find_cvar(&self, name: &str) -> Option<VmCvar> {
        self.cvars
            .borrow()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, c)| c.clone())
    }
}

fn portal_key(a: i32, b: i32) -> (i32, i32) {
    (a.min(b), a.max(b))
}

impl ServerHal for MockHal {
    fn print(&self, msg: &str) {
        self.prints.borrow_mut().push(msg.to_string());
    }

    fn milliseconds(&self) -> i32 {
        self.time.get()
    }

    fn real_time(&self) -> (i32, QTime) {
        (1737504000, QTime::default())
    }

    fn cvar_register(&self, name: &str, default_value: &str, _flags: i32) -> VmCvar {
        if let Some(existing) = self.find_cvar(name) {
            return existing;
        }
        let mut cvars = self.cvars.borrow_mut();
        let cvar = VmCvar {
            handle: cvars.len() as i32 + 1,
            modification_count: 1,
            value: default_value.parse().unwrap_or(0.0),
            integer: default_value.parse().unwrap_or(0),
            string: default_value.to_string(),
        };
        cvars.push((name.to_string(), cvar.clone()));
        cvar
    }

    fn cvar_snapshot(&self, handle: i32) -> Option<VmCvar> {
        self.cvars
            .borrow()
            .iter()
            .find(|(_, c)| c.handle == handle)
            .map(|(_, c)| c.clone())
    }

    fn cvar_set(&self, name: &str, value: &str) {
        let mut cvars = self.cvars.borrow_mut();
        if let Some((_, c)) = cvars.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            c.string = value.to_string();
            c.integer = value.parse().unwrap_or(0);
            c.value = value.parse().unwrap_or(0.0);
            c.modification_count += 1;
        }
    }

    fn cvar_integer_value(&self, name: &str) -> i32 {
        self.find_cvar(name).map(|c| c.integer).unwrap_or(0)
    }

    fn cvar_string(&self, name: &str) -> String {
        self.find_cvar(name).map(|c| c.string).unwrap_or_default()
    }

    fn cvar_latched_string(&self, name: &str) -> String {
        self.cvar_string(name)
    }

    fn server_info(&self) -> String {
        String::from("\\mapname\\q3dm1\\sv_maxclients\\8")
    }

    fn argc(&self) -> i32 {
        0
    }

    fn argv(&self, _n: i32) -> String {
        String::new()
    }

    fn exec_text(&self, _when: i32, _text: &str) {}

    fn fs_open(&self, path: &str, _mode: i32) -> (FileHandle, i32) {
        match self.files.borrow().get(path) {
            Some(data) => (1, data.len() as i32),
            None => (0, -1),
        }
    }

    fn fs_read(&self, _handle: FileHandle, _buf: &mut [u8]) -> usize {
        0
    }

    fn fs_write(&self, _handle: FileHandle, data: &[u8]) -> i32 {
        data.len() as i32
    }

    fn fs_rename(&self, _from: &str, _to: &str) {}

    fn fs_close(&self, _handle: FileHandle) {}

    fn fs_file_list(&self, _path: &str, _extension: &str) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }

    fn fs_read_file(&self, path: &str) -> Result<Vec<u8>, HalError> {
        self.files.borrow().get(path).cloned().ok_or(HalError::NotFound)
    }

    fn entity_string(&self) -> String {
        self.entity_text.clone()
    }

    fn point_leafnum(&self, point: &Vec3) -> i32 {
        ((point[0] / 100.0).floor() as i32).clamp(0, 3)
    }

    fn leaf_cluster(&self, leafnum: i32) -> i32 {
        if leafnum == 3 {
            1
        } else {
            0
        }
    }

    fn leaf_area(&self, leafnum: i32) -> i32 {
        leafnum
    }

    fn cluster_pvs(&self, cluster: i32) -> Option<Vec<u8>> {
        Some(vec![1u8 << cluster])
    }

    fn areas_connected(&self, area1: i32, area2: i32) -> bool {
        area1 == area2 || self.open_portals.borrow().contains(&portal_key(area1, area2))
    }

    fn adjust_area_portal_state(&self, area1: i32, area2: i32, open: bool) {
        let mut portals = self.open_portals.borrow_mut();
        if open {
            portals.insert(portal_key(area1, area2));
        } else {
            portals.remove(&portal_key(area1, area2));
        }
    }

    fn inline_model_bounds(&self, index: i32) -> Option<(Vec3, Vec3)> {
        (0..4).contains(&index).then_some(([-8.0; 3], [8.0; 3]))
    }

    fn link_entity(&self, _index: usize, ent: &SharedEntity) -> EntityLink {
        let absmin = [ent.origin[0] + ent.mins[0], ent.origin[1] + ent.mins[1], ent.origin[2] + ent.mins[2]];
        let absmax = [ent.origin[0] + ent.maxs[0], ent.origin[1] + ent.maxs[1], ent.origin[2] + ent.maxs[2]];
        let first = self.point_leafnum(&absmin);
        let last = self.point_leafnum(&absmax);
        let area_num2 = if first == last { -1 } else { self.leaf_area(last) };
        EntityLink {
            absmin,
            absmax,
            area_num: self.leaf_area(first),
            area_num2,
            clusters: (first..=last).map(|leaf| self.leaf_cluster(leaf)).collect(),
        }
    }

    fn unlink_entity(&self, _index: usize) {}

    fn entities_in_box(&self, _mins: &Vec3, _maxs: &Vec3, _max_count: usize) -> Vec<i32> {
        Vec::new()
    }

    fn entity_contact(&self, _mins: &Vec3, _maxs: &Vec3, _ent: &SharedEntity, _capsule: bool) -> bool {
        false
    }

    fn trace(
        &self,
        _start: &Vec3,
        _mins: &Vec3,
        _maxs: &Vec3,
        end: &Vec3,
        _pass_entity: i32,
        _content_mask: i32,
        _capsule: bool,
    ) -> TraceResult {
        TraceResult {
            fraction: 1.0,
            end_pos: *end,
            entity_num: ENTITYNUM_NONE,
            ..Default::default()
        }
    }

    fn point_contents(&self, _point: &Vec3, _pass_entity: i32) -> i32 {
        0
    }

    fn temp_ban(&self, address: &str, seconds: i32) {
        self.bans.borrow_mut().push((address.to_string(), seconds));
    }
}

// ============================================================================
// Scripted module
// ============================================================================

const MEMORY_SIZE: usize = 0x30000;
const ENTITY_BASE: u32 = 0x1000;
const ENTITY_STRIDE: u32 = 0x200;
const NUM_ENTITIES: u32 = 64;
const CLIENT_BASE: u32 = 0x10000;
const CLIENT_STRIDE: u32 = 0x400;
const SCRATCH: u32 = 0x20000;
const MAX_CLIENTS: usize = 8;

type Script = dyn Fn(&ModuleCall, &mut ModuleMemory, &mut dyn TrapHandler) -> Result<i32, ModuleError>;

/// Module whose entry points are a closure over its own memory.
pub struct ScriptedModule {
    memory: ModuleMemory,
    script: Rc<Script>,
    calls: Rc<RefCell<Vec<GameExport>>>,
}

impl GameModule for ScriptedModule {
    fn name(&self) -> &str {
        "scripted"
    }

    fn memory(&self) -> &ModuleMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut ModuleMemory {
        &mut self.memory
    }

    fn call(&mut self, call: &ModuleCall, host: &mut dyn TrapHandler) -> Result<i32, ModuleError> {
        self.calls.borrow_mut().push(call.export);
        (self.script)(call, &mut self.memory, host)
    }
}

pub struct ScriptLoader {
    script: Rc<Script>,
    calls: Rc<RefCell<Vec<GameExport>>>,
    instances: usize,
}

impl ModuleLoader for ScriptLoader {
    type Module = ScriptedModule;

    fn create(&mut self, _name: &str) -> Result<ScriptedModule, ModuleError> {
        self.instances += 1;
        Ok(ScriptedModule {
            memory: ModuleMemory::new(MEMORY_SIZE),
            script: Rc::clone(&self.script),
            calls: Rc::clone(&self.calls),
        })
    }

    fn restart(&mut self, _old: ScriptedModule) -> Result<ScriptedModule, ModuleError> {
        self.create("scripted")
    }
}

fn call_trap(host: &mut dyn TrapHandler, mem: &mut ModuleMemory, opcode: u32, args: &[i32]) -> Result<i32, ModuleError> {
    Ok(host.trap(mem, opcode, args)?)
}

fn put_str(mem: &mut ModuleMemory, addr: u32, text: &str) {
    let buf = mem.translate_mut(addr, text.len() + 1).unwrap();
    buf[..text.len()].copy_from_slice(text.as_bytes());
    buf[text.len()] = 0;
}

fn entity_addr(index: u32) -> u32 {
    ENTITY_BASE + index * ENTITY_STRIDE
}

/// A module that numbers its entities and locates them on init, then hands
/// every call to `on_call`.
fn game<F>(on_call: F) -> Rc<Script>
where
    F: Fn(&ModuleCall, &mut ModuleMemory, &mut dyn TrapHandler) -> Result<i32, ModuleError> + 'static,
{
    Rc::new(
        move |call: &ModuleCall, mem: &mut ModuleMemory, host: &mut dyn TrapHandler| {
            if call.export == GameExport::Init {
                for i in 0..NUM_ENTITIES {
                    mem.write_i32(entity_addr(i), i as i32).unwrap();
                }
                call_trap(
                    host,
                    mem,
                    trap::G_LOCATE_GAME_DATA,
                    &[
                        ENTITY_BASE as i32,
                        NUM_ENTITIES as i32,
                        ENTITY_STRIDE as i32,
                        CLIENT_BASE as i32,
                        CLIENT_STRIDE as i32,
                    ],
                )?;
            }
            on_call(call, mem, host)
        },
    )
}

struct Harness {
    server: GameServer<MockHal, ScriptLoader>,
    calls: Rc<RefCell<Vec<GameExport>>>,
}

fn config() -> HostConfig {
    HostConfig {
        max_clients: MAX_CLIENTS,
        ..Default::default()
    }
}

fn start(hal: MockHal, script: Rc<Script>) -> Harness {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let loader = ScriptLoader {
        script,
        calls: Rc::clone(&calls),
        instances: 0,
    };
    let mut server = GameServer::new(hal, config(), loader).unwrap();
    server.init_game_progs().unwrap();
    Harness { server, calls }
}

fn idle() -> Rc<Script> {
    game(|_, _, _| Ok(0))
}

fn fatal_error(err: SessionError) -> TrapError {
    match err {
        SessionError::Drop(ModuleError::Trap(fault)) => fault.error,
        other => panic!("expected a fatal trap, got {other:?}"),
    }
}

// ============================================================================
// Record mirrors
// ============================================================================

#[test]
fn test_entity_index_address_round_trip() {
    let h = start(MockHal::new(), idle());
    for i in 0..NUM_ENTITIES {
        assert_eq!(h.server.num_for_gentity(entity_addr(i)).unwrap(), i as usize);
        assert_eq!(h.server.gentity(i as usize).unwrap().number, i as i32);
    }
    assert_eq!(
        h.server.num_for_gentity(entity_addr(1) + 4),
        Err(TrapError::MisalignedEntityAddress { addr: entity_addr(1) + 4 })
    );
}

#[test]
fn test_client_header_is_read_from_module_memory() {
    let script = game(|call, mem, _| {
        if call.export == GameExport::RunFrame {
            let header = PlayerStateHeader {
                command_time: call.arg(0),
                client_num: 2,
                ..Default::default()
            };
            let addr = CLIENT_BASE + 2 * CLIENT_STRIDE;
            header.encode(mem.translate_mut(addr, PlayerStateHeader::SIZE).unwrap());
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);

    h.server.run_frame(900).unwrap();
    let header = h.server.game_client(2).unwrap();
    assert_eq!((header.command_time, header.client_num), (900, 2));
    assert_eq!(
        h.server.game_client(MAX_CLIENTS),
        Err(TrapError::BadClientIndex {
            index: MAX_CLIENTS as i64,
            capacity: MAX_CLIENTS,
        })
    );
}

// ============================================================================
// Client index validation
// ============================================================================

#[test]
fn test_send_to_bad_client_ignored_but_get_usercmd_fatal() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::RunFrame {
            let bad = MAX_CLIENTS as i32;
            assert_eq!(call_trap(host, mem, trap::G_SENDMESSAGE, &[bad, SCRATCH as i32, 4])?, 0);
            call_trap(host, mem, trap::G_GET_USERCMD, &[bad, SCRATCH as i32])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);

    let err = h.server.run_frame(100).unwrap_err();
    assert_eq!(
        fatal_error(err),
        TrapError::BadClientIndex {
            index: MAX_CLIENTS as i64,
            capacity: MAX_CLIENTS,
        }
    );
    for slot in &h.server.state().clients {
        assert_eq!(slot.binary_message.status(), message_status::MESSAGE_EMPTY);
    }
}

#[test]
fn test_binary_message_store_then_overflow() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::RunFrame {
            let len = call.arg(0);
            mem.fill(SCRATCH, 0xAB, 16).unwrap();
            call_trap(host, mem, trap::G_SENDMESSAGE, &[1, SCRATCH as i32, len])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);

    h.server.run_frame(16).unwrap();
    let message = &h.server.state().clients[1].binary_message;
    assert_eq!(message.status(), message_status::MESSAGE_WAITING);
    assert_eq!(message.payload(), &[0xAB; 16]);

    let too_long = MAX_BINARY_MESSAGE as i32 + 1;
    let err = h.server.run_frame(too_long).unwrap_err();
    assert!(matches!(fatal_error(err), TrapError::BinaryMessageLength { client: 1, .. }));
    assert_eq!(
        h.server.state().clients[1].binary_message.status(),
        message_status::MESSAGE_EMPTY
    );
}

#[test]
fn test_overflow_flag_reported_to_module() {
    let status = Rc::new(Cell::new(-1));
    let seen = Rc::clone(&status);
    let script = game(move |call, mem, host| {
        if call.export == GameExport::RunFrame {
            mem.fill(SCRATCH, 1, 8).unwrap();
            call_trap(host, mem, trap::G_SENDMESSAGE, &[0, SCRATCH as i32, 8])?;
        }
        if call.export == GameExport::BotAiStartFrame {
            seen.set(call_trap(host, mem, trap::G_MESSAGESTATUS, &[0])?);
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);

    h.server.run_frame(0).unwrap();
    h.server.mark_binary_overflow(0);
    h.server.bot_ai_start_frame(0).unwrap();
    assert_eq!(status.get(), message_status::MESSAGE_WAITING_OVERFLOW);

    assert_eq!(h.server.take_binary_message(0), Some(vec![1; 8]));
    h.server.bot_ai_start_frame(0).unwrap();
    assert_eq!(status.get(), message_status::MESSAGE_EMPTY);
}

// ============================================================================
// Brush models
// ============================================================================

#[test]
fn test_brush_model_name_must_carry_marker() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::RunFrame {
            let name = if call.arg(0) == 0 { "models/door.md3" } else { "*abc" };
            put_str(mem, SCRATCH, name);
            call_trap(host, mem, trap::G_SET_BRUSH_MODEL, &[entity_addr(5) as i32, SCRATCH as i32])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);

    let err = h.server.run_frame(0).unwrap_err();
    assert!(matches!(fatal_error(err), TrapError::NotBrushModel { name } if name == "models/door.md3"));

    // A non-numeric tail parses as inline model 0.
    h.server.run_frame(1).unwrap();
    let ent = h.server.gentity(5).unwrap();
    assert_eq!(ent.model_index, 0);
    assert!(ent.bmodel);
    assert!(ent.linked);
    assert_eq!(ent.mins, [-8.0; 3]);
    assert!(h.server.sv_entity(5).unwrap().linked);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_warm_restart_clears_client_entities_and_rewinds_entity_text() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::RunFrame {
            call_trap(host, mem, trap::G_GET_ENTITY_TOKEN, &[SCRATCH as i32, 64])?;
            call_trap(host, mem, trap::G_GET_ENTITY_TOKEN, &[SCRATCH as i32, 64])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);
    assert_eq!(h.server.connect_client(3, "10.0.0.3:27960", "\\name\\Visor").unwrap(), None);
    assert_eq!(h.server.state().clients[3].gentity, Some(3));

    h.server.run_frame(50).unwrap();
    assert_ne!(h.server.state().entity_parser.position(), Some(0));

    h.server.restart_game_progs().unwrap();
    assert_eq!(h.server.lifecycle_state(), LifecycleState::Running);
    assert_eq!(h.server.state().clients[3].gentity, None);
    assert_eq!(h.server.state().entity_parser.position(), Some(0));
    assert_eq!(h.server.state().clients[3].state, ClientState::Connected);

    let calls = h.calls.borrow();
    let tail: Vec<GameExport> = calls.iter().rev().take(2).rev().copied().collect();
    assert_eq!(tail, vec![GameExport::Shutdown, GameExport::Init]);
    assert_eq!(h.server.module().map(|m| m.name()), Some("scripted"));
}

#[test]
fn test_init_locates_game_data_and_logs_trap() {
    let h = start(MockHal::new(), idle());
    assert_eq!(h.server.trap_log().last_request(), Some(trap::G_LOCATE_GAME_DATA));
    assert_eq!(h.server.state().run_state, ServerRunState::Game);
    assert!(!h.server.trap_log().to_json().is_empty());
}

#[test]
fn test_fatal_trap_drops_session_with_opcode_context() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::RunFrame {
            put_str(mem, SCRATCH, "G_Spawn: no free entities");
            call_trap(host, mem, trap::G_ERROR, &[SCRATCH as i32])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);
    let SessionError::Drop(ModuleError::Trap(fault)) = h.server.run_frame(0).unwrap_err() else {
        panic!("expected a dropped session");
    };
    assert_eq!(fault.opcode, trap::G_ERROR);
    assert_eq!(fault.name, "G_ERROR");
    assert!(fault.to_string().contains("no free entities"));
}

#[test]
fn test_fatal_trap_ends_call_even_if_module_ignores_it() {
    let outcomes = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&outcomes);
    let script = game(move |call, mem, host| {
        if call.export == GameExport::RunFrame {
            put_str(mem, SCRATCH, "bad state");
            seen.borrow_mut().push(host.trap(mem, trap::G_ERROR, &[SCRATCH as i32]));
            mem.fill(SCRATCH + 0x100, 7, 4).unwrap();
            seen.borrow_mut()
                .push(host.trap(mem, trap::G_SENDMESSAGE, &[1, (SCRATCH + 0x100) as i32, 4]));
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);

    let SessionError::Drop(ModuleError::Trap(fault)) = h.server.run_frame(0).unwrap_err() else {
        panic!("expected a dropped session");
    };
    assert_eq!(fault.opcode, trap::G_ERROR);

    let outcomes = outcomes.borrow();
    assert_eq!(outcomes.len(), 2);
    for outcome in outcomes.iter() {
        assert_eq!(outcome.as_ref().unwrap_err().opcode, trap::G_ERROR);
    }
    assert_eq!(
        h.server.state().clients[1].binary_message.status(),
        message_status::MESSAGE_EMPTY
    );
}

#[test]
fn test_game_command_only_in_game_state() {
    let script = game(|call, _, _| Ok((call.export == GameExport::ConsoleCommand) as i32));
    let mut h = start(MockHal::new(), script);
    assert!(h.server.game_command().unwrap());

    h.server.set_run_state(ServerRunState::Loading);
    assert!(!h.server.game_command().unwrap());
}

#[test]
fn test_connect_denial_frees_slot() {
    let script = game(|call, mem, _| {
        if call.export == GameExport::ClientConnect && call.arg(0) == 4 {
            put_str(mem, SCRATCH, "server is for members only");
            return Ok(SCRATCH as i32);
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);

    let denial = h.server.connect_client(4, "10.0.0.4:27960", "\\name\\Grunt").unwrap();
    assert_eq!(denial.as_deref(), Some("server is for members only"));
    assert_eq!(h.server.state().clients[4].state, ClientState::Free);

    assert_eq!(h.server.connect_client(5, "10.0.0.5:27960", "\\name\\Doom").unwrap(), None);
    assert_eq!(h.server.state().clients[5].name, "Doom");
    assert_eq!(
        h.server.client_begin(MAX_CLIENTS),
        Err(SessionError::BadClient { index: MAX_CLIENTS })
    );
}

// ============================================================================
// Visibility and area portals
// ============================================================================

fn in_pvs(hal: &MockHal, p1: Vec3, p2: Vec3, ignore_portals: bool) -> TrapResult {
    let config = config();
    let mut server = ServerState::new(&config);
    let mut data = GameData::default();
    let mut mem = ModuleMemory::new(1024);
    mem.write_vec3(100, &p1).unwrap();
    mem.write_vec3(200, &p2).unwrap();
    let opcode = if ignore_portals {
        trap::G_IN_PVS_IGNORE_PORTALS
    } else {
        trap::G_IN_PVS
    };
    TrapDispatcher::new(hal, &config, &mut server, &mut data).dispatch(&mut mem, opcode, &[100, 200])
}

#[test]
fn test_pvs_with_and_without_portals() {
    let hal = MockHal::new();
    let a0 = [50.0, 0.0, 0.0];
    let a1 = [150.0, 0.0, 0.0];
    let a2 = [250.0, 0.0, 0.0];
    let other_cluster = [350.0, 0.0, 0.0];

    // Same cluster, connected areas.
    assert_eq!(in_pvs(&hal, a0, a1, false), TrapResult::Ok(1));
    assert_eq!(in_pvs(&hal, a0, a1, true), TrapResult::Ok(1));

    // Same cluster, disconnected areas.
    assert_eq!(in_pvs(&hal, a0, a2, false), TrapResult::Ok(0));
    assert_eq!(in_pvs(&hal, a0, a2, true), TrapResult::Ok(1));

    // Different clusters.
    assert_eq!(in_pvs(&hal, a0, other_cluster, true), TrapResult::Ok(0));
}

#[test]
fn test_door_closes_area_portal() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::RunFrame {
            let door = entity_addr(7);
            let mut ent = SharedEntity::decode(mem.translate(door, SharedEntity::SIZE).unwrap()).unwrap();
            ent.origin = [100.0, 0.0, 0.0];
            ent.mins = [-50.0; 3];
            ent.maxs = [50.0; 3];
            ent.encode(mem.translate_mut(door, SharedEntity::SIZE).unwrap());
            call_trap(host, mem, trap::G_LINK_ENTITY, &[door as i32])?;
            call_trap(host, mem, trap::G_ADJUST_AREA_PORTAL_STATE, &[door as i32, call.arg(0)])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);

    h.server.run_frame(0).unwrap();
    let shadow = h.server.sv_entity(7).unwrap();
    assert_eq!((shadow.area_num, shadow.area_num2), (0, 1));
    assert!(!h.server.hal().areas_connected(0, 1));

    h.server.run_frame(1).unwrap();
    assert!(h.server.hal().areas_connected(0, 1));
    assert_eq!(h.server.gentity(7).unwrap().link_count, 2);
}

// ============================================================================
// Deferred calls
// ============================================================================

#[test]
fn test_bot_user_command_runs_think_after_call() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::BotAiStartFrame {
            let cmd = UserCmd {
                server_time: call.arg(0),
                forward_move: 127,
                ..Default::default()
            };
            cmd.encode(mem.translate_mut(SCRATCH, UserCmd::SIZE).unwrap());
            call_trap(host, mem, trap::BOTLIB_USER_COMMAND, &[2, SCRATCH as i32])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);
    h.calls.borrow_mut().clear();

    h.server.bot_ai_start_frame(700).unwrap();
    assert_eq!(*h.calls.borrow(), vec![GameExport::BotAiStartFrame, GameExport::ClientThink]);
    assert_eq!(h.server.state().clients[2].last_usercmd.server_time, 700);
    assert!(h.server.state().deferred.is_empty());
}

#[test]
fn test_each_deferred_think_sees_its_own_command() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let thinks = Rc::clone(&seen);
    let script = game(move |call, mem, host| {
        match call.export {
            GameExport::BotAiStartFrame => {
                for (i, server_time) in [100, 200].into_iter().enumerate() {
                    let addr = SCRATCH + (i as u32) * 0x40;
                    let cmd = UserCmd {
                        server_time,
                        ..Default::default()
                    };
                    cmd.encode(mem.translate_mut(addr, UserCmd::SIZE).unwrap());
                    call_trap(host, mem, trap::BOTLIB_USER_COMMAND, &[2, addr as i32])?;
                }
            }
            GameExport::ClientThink => {
                let out = SCRATCH + 0x200;
                call_trap(host, mem, trap::G_GET_USERCMD, &[call.arg(0), out as i32])?;
                let cmd = UserCmd::decode(mem.translate(out, UserCmd::SIZE).unwrap()).unwrap();
                thinks.borrow_mut().push(cmd.server_time);
            }
            _ => {}
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);

    h.server.bot_ai_start_frame(0).unwrap();
    assert_eq!(*seen.borrow(), vec![100, 200]);
    assert_eq!(h.server.state().clients[2].last_usercmd.server_time, 200);
}

#[test]
fn test_self_requeueing_think_is_capped() {
    let script = game(|call, mem, host| {
        if matches!(call.export, GameExport::BotAiStartFrame | GameExport::ClientThink) {
            UserCmd::default().encode(mem.translate_mut(SCRATCH, UserCmd::SIZE).unwrap());
            call_trap(host, mem, trap::BOTLIB_USER_COMMAND, &[3, SCRATCH as i32])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);
    h.calls.borrow_mut().clear();

    let err = h.server.bot_ai_start_frame(0).unwrap_err();
    assert_eq!(err, SessionError::DeferredLimit { limit: MAX_DEFERRED_CALLS });
    let thinks = h.calls.borrow().iter().filter(|e| **e == GameExport::ClientThink).count();
    assert_eq!(thinks, MAX_DEFERRED_CALLS);
    assert!(h.server.state().deferred.is_empty());
}

#[test]
fn test_drop_client_bans_and_runs_disconnect_hook() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::ClientCommand {
            put_str(mem, SCRATCH, "cheating");
            call_trap(host, mem, trap::G_DROP_CLIENT, &[call.arg(0), SCRATCH as i32, 300])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);
    h.server.connect_client(1, "10.0.0.1:27960", "\\name\\Klesk").unwrap();
    h.calls.borrow_mut().clear();

    h.server.client_command(1).unwrap();
    assert_eq!(*h.calls.borrow(), vec![GameExport::ClientCommand, GameExport::ClientDisconnect]);
    assert_eq!(*h.server.hal().bans.borrow(), vec![(String::from("10.0.0.1:27960"), 300)]);
    let slot = &h.server.state().clients[1];
    assert_eq!(slot.state, ClientState::Zombie);
    assert_eq!(slot.drop_reason.as_deref(), Some("cheating"));
}

// ============================================================================
// Config strings, cvars, tags
// ============================================================================

#[test]
fn test_configstring_broadcast_to_active_clients() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::RunFrame {
            put_str(mem, SCRATCH, "Capture the Flag");
            call_trap(host, mem, trap::G_SET_CONFIGSTRING, &[2, SCRATCH as i32])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);
    h.server.connect_client(0, "10.0.0.9:27960", "\\name\\Anarki").unwrap();
    h.server.state_mut().clients[0].state = ClientState::Active;
    h.server.connect_client(1, "10.0.0.8:27960", "\\name\\Orbb").unwrap();

    h.server.run_frame(0).unwrap();
    assert_eq!(h.server.state().config_strings[2], "Capture the Flag");
    assert_eq!(
        h.server.state().clients[0].reliable_commands,
        vec![String::from("cs 2 \"Capture the Flag\"")]
    );
    assert!(h.server.state().clients[1].reliable_commands.is_empty());
}

#[test]
fn test_reliable_commands_drain_to_transport() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::ClientCommand {
            put_str(mem, SCRATCH, "print \"pong\"");
            call_trap(host, mem, trap::G_SEND_SERVER_COMMAND, &[call.arg(0), SCRATCH as i32])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);
    h.server.connect_client(4, "10.0.0.7:27960", "\\name\\Sarge").unwrap();
    h.server.state_mut().clients[4].state = ClientState::Active;

    h.server.client_command(4).unwrap();
    assert_eq!(h.server.take_reliable_commands(4), vec![String::from("print \"pong\"")]);
    assert!(h.server.take_reliable_commands(4).is_empty());
    assert!(h.server.take_reliable_commands(99).is_empty());
}

#[test]
fn test_cvar_update_follows_modification_count() {
    const CVAR: u32 = SCRATCH + 0x100;
    let script = game(|call, mem, host| {
        match call.export {
            GameExport::Init => {
                put_str(mem, SCRATCH, "g_gravity");
                put_str(mem, SCRATCH + 0x40, "800");
                call_trap(host, mem, trap::G_CVAR_REGISTER, &[CVAR as i32, SCRATCH as i32, (SCRATCH + 0x40) as i32, 0])?;
            }
            GameExport::RunFrame => {
                call_trap(host, mem, trap::G_CVAR_UPDATE, &[CVAR as i32])?;
            }
            _ => {}
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);
    h.server.hal().cvar_set("g_gravity", "400");
    h.server.run_frame(0).unwrap();

    let module = h.server.module().unwrap();
    let record = VmCvar::decode(module.memory().translate(CVAR, VmCvar::SIZE).unwrap()).unwrap();
    assert_eq!(record.integer, 400);
    assert_eq!(record.modification_count, 2);
}

#[test]
fn test_registered_tag_lookup() {
    let hal = MockHal::new();
    let muzzle = Orientation {
        origin: [12.0, 0.0, 4.0],
        axis: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };
    hal.add_file("models/mapobjects/turret.tag", encode_tag_file(&[("tag_muzzle", muzzle.clone())]));

    let found = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&found);
    let script = game(move |call, mem, host| {
        if call.export == GameExport::RunFrame {
            put_str(mem, SCRATCH, "models/mapobjects/turret.tag");
            let file = call_trap(host, mem, trap::G_REGISTERTAG, &[SCRATCH as i32])?;
            let again = call_trap(host, mem, trap::G_REGISTERTAG, &[SCRATCH as i32])?;
            put_str(mem, SCRATCH, "TAG_MUZZLE");
            let hit = call_trap(host, mem, trap::G_GETTAG, &[0, file, SCRATCH as i32, (SCRATCH + 0x100) as i32])?;
            put_str(mem, SCRATCH, "tag_barrel");
            let miss = call_trap(host, mem, trap::G_GETTAG, &[0, file, SCRATCH as i32, (SCRATCH + 0x100) as i32])?;
            let orient = Orientation::decode(mem.translate(SCRATCH + 0x100, Orientation::SIZE).unwrap());
            seen.borrow_mut().push((file, again, hit, miss, orient));
        }
        Ok(0)
    });
    let mut h = start(hal, script);
    h.server.run_frame(0).unwrap();

    let results = found.borrow();
    assert_eq!(results.len(), 1);
    let (file, again, hit, miss, orient) = &results[0];
    assert_eq!((*file, *again, *hit, *miss), (1, 1, 1, 0));
    assert_eq!(orient.as_ref(), Some(&muzzle));
    assert_eq!(h.server.state().tags.num_tags(), 1);
}

// ============================================================================
// Unknown opcodes
// ============================================================================

#[test]
fn test_unknown_opcode_fatal_for_any_arguments() {
    let hal = MockHal::new();
    let config = config();
    let mut server = ServerState::new(&config);
    let mut data = GameData::default();
    let mut mem = ModuleMemory::new(1024);

    for args in [&[][..], &[0][..], &[1, 2, 3, 4, 5, 6, 7, 8][..], &[-1; 13][..]] {
        for opcode in [0x0FF, 0x073, 0x300, u32::MAX] {
            let result = TrapDispatcher::new(&hal, &config, &mut server, &mut data).dispatch(&mut mem, opcode, args);
            let TrapResult::Fatal(fault) = result else {
                panic!("opcode {opcode:#x} was not fatal");
            };
            assert_eq!(fault.error, TrapError::UnknownOpcode { opcode });
        }
    }
    // Every attempt is still in the audit log.
    assert_eq!(server.trap_log.len(), 32);
}

#[test]
fn test_module_print_reaches_console() {
    let script = game(|call, mem, host| {
        if call.export == GameExport::RunFrame {
            put_str(mem, SCRATCH, "Timelimit hit.\n");
            call_trap(host, mem, trap::G_PRINT, &[SCRATCH as i32])?;
        }
        Ok(0)
    });
    let mut h = start(MockHal::new(), script);
    h.server.run_frame(0).unwrap();
    assert_eq!(*h.server.hal().prints.borrow(), vec![String::from("Timelimit hit.\n")]);
}
