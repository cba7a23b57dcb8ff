//! Host Abstraction Layer for the game module boundary
//!
//! This crate defines the [`ServerHal`] trait: every host subsystem a game
//! module can reach through a trap, specified only at its interface. The
//! boundary core forwards translated arguments here and never looks inside.
//!
//! # Collaborators
//!
//! - **Console & clock**: console output, millisecond clock, wall-clock time
//! - **Cvars & command line**: console variables, argument introspection, command buffer
//! - **Filesystem**: file handles, whole-file reads, directory listings
//! - **Collision model**: leaf/cluster/area lookups, PVS rows, area portals, inline models
//! - **World**: entity linkage, area queries, traces, point contents
//! - **Network**: temporary address bans
//! - **Optional**: sound registry, presentation-side tags, debug polygons, bot library
//!
//! Optional collaborators have default implementations so a dedicated server
//! without them still links; required ones must be provided.

use svgame_abi::layout::{Orientation, PcToken, QTime, SharedEntity, TraceResult, Vec3, VmCvar};

/// Handle to an open file owned by the filesystem collaborator.
pub type FileHandle = i32;

/// Membership computed by the world collaborator when an entity is linked.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityLink {
    /// World-space bounds written back to the shared header
    pub absmin: Vec3,
    pub absmax: Vec3,
    /// First area the entity touches (-1 when none)
    pub area_num: i32,
    /// Second area, set only for entities spanning an area portal (-1 otherwise)
    pub area_num2: i32,
    /// Visibility clusters touched
    pub clusters: Vec<i32>,
}

/// Host Abstraction Layer trait
///
/// Implementations provide the platform services a game module can request:
/// - Console output and clocks
/// - Console variables and command-line introspection
/// - File access
/// - Collision/visibility primitives and world linkage
/// - Sound, tag, debug-drawing and bot-library pass-throughs
///
/// The trait is called only from the single active module call, so
/// implementations may use interior mutability without locking.
pub trait ServerHal {
    // === Console & clock ===

    /// Write module output to the server console.
    fn print(&self, msg: &str);

    /// Milliseconds since host start.
    fn milliseconds(&self) -> i32;

    /// Wall-clock time as (seconds since the Unix epoch, broken-down local time).
    fn real_time(&self) -> (i32, QTime);

    // === Cvars ===

    /// Register (or look up) a cvar and return its current snapshot.
    fn cvar_register(&self, name: &str, default_value: &str, flags: i32) -> VmCvar;

    /// Current snapshot of a previously registered cvar.
    ///
    /// Returns `None` for an unknown handle.
    fn cvar_snapshot(&self, handle: i32) -> Option<VmCvar>;

    fn cvar_set(&self, name: &str, value: &str);

    fn cvar_integer_value(&self, name: &str) -> i32;

    fn cvar_string(&self, name: &str) -> String;

    /// Value that takes effect on the next map load (falls back to the current value).
    fn cvar_latched_string(&self, name: &str) -> String;

    /// Info string of all server-info flagged cvars.
    fn server_info(&self) -> String;

    // === Command line ===

    fn argc(&self) -> i32;

    /// Argument `n` of the current command, empty when out of range.
    fn argv(&self, n: i32) -> String;

    /// Inject text into the command buffer (see `svgame_abi::exec`).
    fn exec_text(&self, when: i32, text: &str);

    // === Filesystem ===

    /// Open a file; returns the handle and the file length (or -1 on failure).
    fn fs_open(&self, path: &str, mode: i32) -> (FileHandle, i32);

    /// Read into `buf`; returns bytes read.
    fn fs_read(&self, handle: FileHandle, buf: &mut [u8]) -> usize;

    /// Write `data`; returns bytes written.
    fn fs_write(&self, handle: FileHandle, data: &[u8]) -> i32;

    fn fs_rename(&self, from: &str, to: &str);

    fn fs_close(&self, handle: FileHandle);

    /// Names under `path` matching `extension`.
    fn fs_file_list(&self, path: &str, extension: &str) -> Vec<String>;

    /// Read a whole file.
    fn fs_read_file(&self, path: &str) -> Result<Vec<u8>, HalError>;

    // === Collision model ===

    /// Entity description text of the loaded map.
    fn entity_string(&self) -> String;

    fn point_leafnum(&self, point: &Vec3) -> i32;

    fn leaf_cluster(&self, leafnum: i32) -> i32;

    fn leaf_area(&self, leafnum: i32) -> i32;

    /// PVS bit row for a cluster, `None` when the map has no vis data.
    fn cluster_pvs(&self, cluster: i32) -> Option<Vec<u8>>;

    fn areas_connected(&self, area1: i32, area2: i32) -> bool;

    fn adjust_area_portal_state(&self, area1: i32, area2: i32, open: bool);

    /// Bounds of inline model `index`, `None` when no such model exists.
    fn inline_model_bounds(&self, index: i32) -> Option<(Vec3, Vec3)>;

    // === World ===

    fn link_entity(&self, index: usize, ent: &SharedEntity) -> EntityLink;

    fn unlink_entity(&self, index: usize);

    /// Indices of linked entities whose bounds touch the box, at most `max_count`.
    fn entities_in_box(&self, mins: &Vec3, maxs: &Vec3, max_count: usize) -> Vec<i32>;

    fn entity_contact(&self, mins: &Vec3, maxs: &Vec3, ent: &SharedEntity, capsule: bool) -> bool;

    #[allow(clippy::too_many_arguments)]
    fn trace(
        &self,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        pass_entity: i32,
        content_mask: i32,
        capsule: bool,
    ) -> TraceResult;

    fn point_contents(&self, point: &Vec3, pass_entity: i32) -> i32;

    // === Network ===

    /// Ban a client address for `seconds`.
    fn temp_ban(&self, _address: &str, _seconds: i32) {
        // Default: bans are not supported
    }

    // === Sound ===

    fn register_sound(&self, _name: &str, _compressed: bool) -> i32 {
        0
    }

    fn sound_length(&self, _handle: i32) -> i32 {
        0
    }

    // === Presentation-side tags ===

    /// Tag lookup on the presentation side (only consulted on non-dedicated hosts).
    fn client_tag(&self, _client_num: i32, _tag_name: &str) -> Option<Orientation> {
        None
    }

    // === Debug drawing ===

    fn debug_polygon_create(&self, _color: i32, _points: &[Vec3]) -> i32 {
        0
    }

    fn debug_polygon_delete(&self, _id: i32) {}

    // === Bot library ===

    fn pc_load_source(&self, _filename: &str) -> i32 {
        0
    }

    fn pc_free_source(&self, _handle: i32) -> i32 {
        0
    }

    fn pc_read_token(&self, _handle: i32) -> Option<PcToken> {
        None
    }

    fn pc_source_file_and_line(&self, _handle: i32) -> Option<(String, i32)> {
        None
    }

    fn pc_unread_token(&self, _handle: i32) {}

    fn ea_command(&self, _client_num: i32, _command: &str) {}
}

/// HAL errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HalError {
    /// File or resource not found
    #[error("not found")]
    NotFound,
    /// Operation not supported on this platform
    #[error("not supported")]
    NotSupported,
    /// I/O error
    #[error("I/O error")]
    IoError,
    /// Invalid argument
    #[error("invalid argument")]
    InvalidArgument,
}

/// A minimal test HAL for unit testing
///
/// One leaf, one cluster, one area; every query answers with the empty or
/// "visible" result. Suitable for tests that don't need real geometry.
#[derive(Default)]
pub struct TestHal {
    time: std::cell::Cell<i32>,
}

impl TestHal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, ms: i32) {
        self.time.set(ms);
    }
}

impl ServerHal for TestHal {
    fn print(&self, _msg: &str) {
        // No-op for tests
    }

    fn milliseconds(&self) -> i32 {
        self.time.get()
    }

    fn real_time(&self) -> (i32, QTime) {
        (1737504000, QTime::default())
    }

    fn cvar_register(&self, _name: &str, default_value: &str, _flags: i32) -> VmCvar {
        VmCvar {
            handle: 1,
            modification_count: 1,
            value: default_value.parse().unwrap_or(0.0),
            integer: default_value.parse().unwrap_or(0),
            string: default_value.to_string(),
        }
    }

    fn cvar_snapshot(&self, _handle: i32) -> Option<VmCvar> {
        None
    }

    fn cvar_set(&self, _name: &str, _value: &str) {}

    fn cvar_integer_value(&self, _name: &str) -> i32 {
        0
    }

    fn cvar_string(&self, _name: &str) -> String {
        String::new()
    }

    fn cvar_latched_string(&self, _name: &str) -> String {
        String::new()
    }

    fn server_info(&self) -> String {
        String::new()
    }

    fn argc(&self) -> i32 {
        0
    }

    fn argv(&self, _n: i32) -> String {
        String::new()
    }

    fn exec_text(&self, _when: i32, _text: &str) {}

    fn fs_open(&self, _path: &str, _mode: i32) -> (FileHandle, i32) {
        (0, -1)
    }

    fn fs_read(&self, _handle: FileHandle, _buf: &mut [u8]) -> usize {
        0
    }

    fn fs_write(&self, _handle: FileHandle, _data: &[u8]) -> i32 {
        0
    }

    fn fs_rename(&self, _from: &str, _to: &str) {}

    fn fs_close(&self, _handle: FileHandle) {}

    fn fs_file_list(&self, _path: &str, _extension: &str) -> Vec<String> {
        Vec::new()
    }

    fn fs_read_file(&self, _path: &str) -> Result<Vec<u8>, HalError> {
        Err(HalError::NotFound)
    }

    fn entity_string(&self) -> String {
        String::new()
    }

    fn point_leafnum(&self, _point: &Vec3) -> i32 {
        0
    }

    fn leaf_cluster(&self, _leafnum: i32) -> i32 {
        0
    }

    fn leaf_area(&self, _leafnum: i32) -> i32 {
        0
    }

    fn cluster_pvs(&self, _cluster: i32) -> Option<Vec<u8>> {
        None
    }

    fn areas_connected(&self, _area1: i32, _area2: i32) -> bool {
        true
    }

    fn adjust_area_portal_state(&self, _area1: i32, _area2: i32, _open: bool) {}

    fn inline_model_bounds(&self, index: i32) -> Option<(Vec3, Vec3)> {
        (index == 0).then_some(([-1.0; 3], [1.0; 3]))
    }

    fn link_entity(&self, _index: usize, ent: &SharedEntity) -> EntityLink {
        EntityLink {
            absmin: ent.mins,
            absmax: ent.maxs,
            area_num: 0,
            area_num2: -1,
            clusters: vec![0],
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
            entity_num: svgame_abi::ENTITYNUM_NONE,
            ..Default::default()
        }
    }

    fn point_contents(&self, _point: &Vec3, _pass_entity: i32) -> i32 {
        0
    }
}
