//! Boundary Protocol Constants for the server/game module interface
//!
//! This crate defines:
//! - **Trap numbers** (Module → Host service calls)
//! - **Export numbers** (Host → Module entry points)
//! - **Limits** shared by both sides of the boundary
//! - **Record layouts** for the shared entity/client memory (see [`layout`])
//!
//! It is the **single source of truth** for the call protocol. Host and module
//! must enumerate every trap in lockstep; there is no "ignore unknown" path.
//!
//! # Trap Number Ranges
//!
//! | Range         | Category                                        |
//! |---------------|-------------------------------------------------|
//! | 0x000-0x00F   | Console, clock, cvars, command line             |
//! | 0x010-0x01F   | Filesystem                                      |
//! | 0x020-0x02F   | Session bootstrap and client slots              |
//! | 0x030-0x03F   | World linkage and collision                     |
//! | 0x040-0x04F   | Visibility and area portals                     |
//! | 0x050-0x05F   | Config strings and info strings                 |
//! | 0x060-0x06F   | Entity text, debug, real time, tags, sound      |
//! | 0x070-0x07F   | Out-of-band binary messages                     |
//! | 0x100-0x10F   | Raw memory and math helpers                     |
//! | 0x200-0x20F   | Bot library pass-throughs                       |
//!
//! # Usage
//!
//! ```rust
//! use svgame_abi::{trap, TrapOpcode};
//!
//! let op = TrapOpcode::from_u32(trap::G_LINK_ENTITY).unwrap();
//! assert_eq!(op.arity(), 1);
//! assert!(TrapOpcode::from_u32(0xFFFF).is_none());
//! ```

#![no_std]

extern crate alloc;

pub mod layout;

// =============================================================================
// Limits
// =============================================================================

/// Maximum number of client slots the host can be configured for.
pub const MAX_CLIENTS: usize = 64;

/// Compile-time maximum number of entity records.
pub const MAX_GENTITIES: usize = 1024;

/// Entity number meaning "no entity".
pub const ENTITYNUM_NONE: i32 = (MAX_GENTITIES - 1) as i32;

/// Entity number of the world.
pub const ENTITYNUM_WORLD: i32 = (MAX_GENTITIES - 2) as i32;

/// Number of config string slots.
pub const MAX_CONFIGSTRINGS: usize = 1024;

/// Reliable commands a client may have outstanding before it is dropped.
pub const MAX_RELIABLE_COMMANDS: usize = 64;

/// Largest out-of-band binary message a client slot can hold.
pub const MAX_BINARY_MESSAGE: usize = 32768;

/// Largest general string crossing the boundary.
pub const MAX_STRING_CHARS: usize = 1024;

/// Largest token produced by the entity-description tokenizer.
pub const MAX_TOKEN_CHARS: usize = 1024;

/// Longest game path.
pub const MAX_QPATH: usize = 64;

/// Longest cvar value mirrored into a module cvar record.
pub const MAX_CVAR_VALUE_STRING: usize = 256;

/// Maximum number of registered tag files per map.
pub const MAX_TAG_FILES: usize = 64;

/// Maximum number of tags across all registered tag files.
pub const MAX_SERVER_TAGS: usize = 256;

/// Tag file format version.
pub const TAG_VERSION: i32 = 1;

/// Tag file identifier.
pub const TAG_IDENT: [u8; 4] = *b"TAGS";

/// Reserved marker prefixing inline (brush) model names, e.g. `*12`.
pub const INLINE_MODEL_MARKER: char = '*';

// =============================================================================
// Out-of-band message status
// =============================================================================

/// Observable states of a client's binary message slot.
pub mod message_status {
    /// No message pending
    pub const MESSAGE_EMPTY: i32 = 0;
    /// A message is waiting to be consumed
    pub const MESSAGE_WAITING: i32 = 1;
    /// A message is waiting and the transport flagged an overflow
    pub const MESSAGE_WAITING_OVERFLOW: i32 = 2;
}

pub use message_status::*;

// =============================================================================
// Command buffer modes
// =============================================================================

/// When injected console text should run.
pub mod exec {
    /// Execute immediately, before returning
    pub const EXEC_NOW: i32 = 0;
    /// Insert at the front of the command buffer
    pub const EXEC_INSERT: i32 = 1;
    /// Append to the end of the command buffer
    pub const EXEC_APPEND: i32 = 2;
}

/// File open modes understood by the filesystem collaborator.
pub mod fs_mode {
    pub const FS_READ: i32 = 0;
    pub const FS_WRITE: i32 = 1;
    pub const FS_APPEND: i32 = 2;
    pub const FS_APPEND_SYNC: i32 = 3;
}

// =============================================================================
// Trap Numbers (Module → Host)
// =============================================================================

/// Trap numbers - the module passes one of these as the first call argument.
pub mod trap {
    // === Console, clock, cvars, command line (0x000 - 0x00F) ===
    /// Print a string to the server console
    pub const G_PRINT: u32 = 0x000;
    /// Abort the session with a module-supplied message
    pub const G_ERROR: u32 = 0x001;
    /// Host millisecond clock
    pub const G_MILLISECONDS: u32 = 0x002;
    /// Register a cvar and mirror it into a module cvar record
    pub const G_CVAR_REGISTER: u32 = 0x003;
    /// Refresh a module cvar record
    pub const G_CVAR_UPDATE: u32 = 0x004;
    /// Set a cvar by name
    pub const G_CVAR_SET: u32 = 0x005;
    /// Integer value of a cvar by name
    pub const G_CVAR_VARIABLE_INTEGER_VALUE: u32 = 0x006;
    /// Copy a cvar string value into a module buffer
    pub const G_CVAR_VARIABLE_STRING_BUFFER: u32 = 0x007;
    /// Copy a cvar's latched string value into a module buffer
    pub const G_CVAR_LATCHED_VARIABLE_STRING_BUFFER: u32 = 0x008;
    /// Number of arguments of the current console command
    pub const G_ARGC: u32 = 0x009;
    /// Copy argument n of the current console command into a module buffer
    pub const G_ARGV: u32 = 0x00A;
    /// Inject text into the console command buffer
    pub const G_SEND_CONSOLE_COMMAND: u32 = 0x00B;

    // === Filesystem (0x010 - 0x01F) ===
    pub const G_FS_FOPEN_FILE: u32 = 0x010;
    pub const G_FS_READ: u32 = 0x011;
    pub const G_FS_WRITE: u32 = 0x012;
    pub const G_FS_RENAME: u32 = 0x013;
    pub const G_FS_FCLOSE_FILE: u32 = 0x014;
    pub const G_FS_GETFILELIST: u32 = 0x015;

    // === Session bootstrap and client slots (0x020 - 0x02F) ===
    /// Declare entity/client record arrays (base, count, stride)
    pub const G_LOCATE_GAME_DATA: u32 = 0x020;
    /// Disconnect a client with a reason and optional ban length
    pub const G_DROP_CLIENT: u32 = 0x021;
    /// Queue a reliable server command for one client or all (-1)
    pub const G_SEND_SERVER_COMMAND: u32 = 0x022;
    pub const G_SET_USERINFO: u32 = 0x023;
    pub const G_GET_USERINFO: u32 = 0x024;
    /// Copy a client's last input command into module memory
    pub const G_GET_USERCMD: u32 = 0x025;
    /// Claim a client slot for a bot
    pub const G_BOT_ALLOCATE_CLIENT: u32 = 0x026;

    // === World linkage and collision (0x030 - 0x03F) ===
    pub const G_LINK_ENTITY: u32 = 0x030;
    pub const G_UNLINK_ENTITY: u32 = 0x031;
    pub const G_ENTITIES_IN_BOX: u32 = 0x032;
    pub const G_ENTITY_CONTACT: u32 = 0x033;
    pub const G_ENTITY_CONTACT_CAPSULE: u32 = 0x034;
    pub const G_TRACE: u32 = 0x035;
    pub const G_TRACE_CAPSULE: u32 = 0x036;
    pub const G_POINT_CONTENTS: u32 = 0x037;
    /// Attach an inline model (`*N`) to an entity
    pub const G_SET_BRUSH_MODEL: u32 = 0x038;

    // === Visibility and area portals (0x040 - 0x04F) ===
    /// PVS test that also requires area connectivity
    pub const G_IN_PVS: u32 = 0x040;
    /// PVS test that ignores area portals
    pub const G_IN_PVS_IGNORE_PORTALS: u32 = 0x041;
    pub const G_ADJUST_AREA_PORTAL_STATE: u32 = 0x042;
    pub const G_AREAS_CONNECTED: u32 = 0x043;

    // === Config strings and info strings (0x050 - 0x05F) ===
    pub const G_SET_CONFIGSTRING: u32 = 0x050;
    pub const G_GET_CONFIGSTRING: u32 = 0x051;
    pub const G_GET_SERVERINFO: u32 = 0x052;

    // === Entity text, debug, real time, tags, sound (0x060 - 0x06F) ===
    /// Next token of the map's entity description text
    pub const G_GET_ENTITY_TOKEN: u32 = 0x060;
    pub const G_DEBUG_POLYGON_CREATE: u32 = 0x061;
    pub const G_DEBUG_POLYGON_DELETE: u32 = 0x062;
    /// Wall-clock time, broken down into a module time record
    pub const G_REAL_TIME: u32 = 0x063;
    /// Round a vector to integral components in place
    pub const G_SNAPVECTOR: u32 = 0x064;
    pub const G_GETTAG: u32 = 0x065;
    pub const G_REGISTERTAG: u32 = 0x066;
    pub const G_REGISTERSOUND: u32 = 0x067;
    pub const G_GET_SOUND_LENGTH: u32 = 0x068;

    // === Out-of-band binary messages (0x070 - 0x07F) ===
    pub const G_SENDMESSAGE: u32 = 0x070;
    pub const G_MESSAGESTATUS: u32 = 0x071;
    /// Anti-cheat statistics report; accepted and answered with 0
    pub const G_STAT_REPORT: u32 = 0x072;

    // === Raw memory and math helpers (0x100 - 0x10F) ===
    pub const TRAP_MEMSET: u32 = 0x100;
    pub const TRAP_MEMCPY: u32 = 0x101;
    pub const TRAP_STRNCPY: u32 = 0x102;
    pub const TRAP_SIN: u32 = 0x103;
    pub const TRAP_COS: u32 = 0x104;
    pub const TRAP_ATAN2: u32 = 0x105;
    pub const TRAP_SQRT: u32 = 0x106;
    pub const TRAP_MATRIXMULTIPLY: u32 = 0x107;
    pub const TRAP_ANGLEVECTORS: u32 = 0x108;
    pub const TRAP_PERPENDICULARVECTOR: u32 = 0x109;
    pub const TRAP_FLOOR: u32 = 0x10A;
    pub const TRAP_CEIL: u32 = 0x10B;

    // === Bot library (0x200 - 0x20F) ===
    pub const BOTLIB_PC_LOAD_SOURCE: u32 = 0x200;
    pub const BOTLIB_PC_FREE_SOURCE: u32 = 0x201;
    pub const BOTLIB_PC_READ_TOKEN: u32 = 0x202;
    pub const BOTLIB_PC_SOURCE_FILE_AND_LINE: u32 = 0x203;
    pub const BOTLIB_PC_UNREAD_TOKEN: u32 = 0x204;
    pub const BOTLIB_GET_CONSOLE_MESSAGE: u32 = 0x205;
    pub const BOTLIB_USER_COMMAND: u32 = 0x206;
    pub const BOTLIB_EA_COMMAND: u32 = 0x207;
}

pub use trap::*;

/// Closed set of trap opcodes.
///
/// Each variant carries its wire number as the discriminant. Adding a trap
/// means adding a variant here, which forces every exhaustive `match` on the
/// host side to handle it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum TrapOpcode {
    Print = trap::G_PRINT,
    Error = trap::G_ERROR,
    Milliseconds = trap::G_MILLISECONDS,
    CvarRegister = trap::G_CVAR_REGISTER,
    CvarUpdate = trap::G_CVAR_UPDATE,
    CvarSet = trap::G_CVAR_SET,
    CvarIntegerValue = trap::G_CVAR_VARIABLE_INTEGER_VALUE,
    CvarStringBuffer = trap::G_CVAR_VARIABLE_STRING_BUFFER,
    CvarLatchedStringBuffer = trap::G_CVAR_LATCHED_VARIABLE_STRING_BUFFER,
    Argc = trap::G_ARGC,
    Argv = trap::G_ARGV,
    SendConsoleCommand = trap::G_SEND_CONSOLE_COMMAND,
    FsOpen = trap::G_FS_FOPEN_FILE,
    FsRead = trap::G_FS_READ,
    FsWrite = trap::G_FS_WRITE,
    FsRename = trap::G_FS_RENAME,
    FsClose = trap::G_FS_FCLOSE_FILE,
    FsFileList = trap::G_FS_GETFILELIST,
    LocateGameData = trap::G_LOCATE_GAME_DATA,
    DropClient = trap::G_DROP_CLIENT,
    SendServerCommand = trap::G_SEND_SERVER_COMMAND,
    SetUserinfo = trap::G_SET_USERINFO,
    GetUserinfo = trap::G_GET_USERINFO,
    GetUsercmd = trap::G_GET_USERCMD,
    BotAllocateClient = trap::G_BOT_ALLOCATE_CLIENT,
    LinkEntity = trap::G_LINK_ENTITY,
    UnlinkEntity = trap::G_UNLINK_ENTITY,
    EntitiesInBox = trap::G_ENTITIES_IN_BOX,
    EntityContact = trap::G_ENTITY_CONTACT,
    EntityContactCapsule = trap::G_ENTITY_CONTACT_CAPSULE,
    Trace = trap::G_TRACE,
    TraceCapsule = trap::G_TRACE_CAPSULE,
    PointContents = trap::G_POINT_CONTENTS,
    SetBrushModel = trap::G_SET_BRUSH_MODEL,
    InPvs = trap::G_IN_PVS,
    InPvsIgnorePortals = trap::G_IN_PVS_IGNORE_PORTALS,
    AdjustAreaPortalState = trap::G_ADJUST_AREA_PORTAL_STATE,
    AreasConnected = trap::G_AREAS_CONNECTED,
    SetConfigstring = trap::G_SET_CONFIGSTRING,
    GetConfigstring = trap::G_GET_CONFIGSTRING,
    GetServerinfo = trap::G_GET_SERVERINFO,
    GetEntityToken = trap::G_GET_ENTITY_TOKEN,
    DebugPolygonCreate = trap::G_DEBUG_POLYGON_CREATE,
    DebugPolygonDelete = trap::G_DEBUG_POLYGON_DELETE,
    RealTime = trap::G_REAL_TIME,
    SnapVector = trap::G_SNAPVECTOR,
    GetTag = trap::G_GETTAG,
    RegisterTag = trap::G_REGISTERTAG,
    RegisterSound = trap::G_REGISTERSOUND,
    GetSoundLength = trap::G_GET_SOUND_LENGTH,
    SendMessage = trap::G_SENDMESSAGE,
    MessageStatus = trap::G_MESSAGESTATUS,
    StatReport = trap::G_STAT_REPORT,
    Memset = trap::TRAP_MEMSET,
    Memcpy = trap::TRAP_MEMCPY,
    Strncpy = trap::TRAP_STRNCPY,
    Sin = trap::TRAP_SIN,
    Cos = trap::TRAP_COS,
    Atan2 = trap::TRAP_ATAN2,
    Sqrt = trap::TRAP_SQRT,
    MatrixMultiply = trap::TRAP_MATRIXMULTIPLY,
    AngleVectors = trap::TRAP_ANGLEVECTORS,
    PerpendicularVector = trap::TRAP_PERPENDICULARVECTOR,
    Floor = trap::TRAP_FLOOR,
    Ceil = trap::TRAP_CEIL,
    PcLoadSource = trap::BOTLIB_PC_LOAD_SOURCE,
    PcFreeSource = trap::BOTLIB_PC_FREE_SOURCE,
    PcReadToken = trap::BOTLIB_PC_READ_TOKEN,
    PcSourceFileAndLine = trap::BOTLIB_PC_SOURCE_FILE_AND_LINE,
    PcUnreadToken = trap::BOTLIB_PC_UNREAD_TOKEN,
    BotGetConsoleMessage = trap::BOTLIB_GET_CONSOLE_MESSAGE,
    BotUserCommand = trap::BOTLIB_USER_COMMAND,
    BotEaCommand = trap::BOTLIB_EA_COMMAND,
}

impl TrapOpcode {
    /// Every opcode, in wire order.
    pub const ALL: &'static [TrapOpcode] = &[
        TrapOpcode::Print,
        TrapOpcode::Error,
        TrapOpcode::Milliseconds,
        TrapOpcode::CvarRegister,
        TrapOpcode::CvarUpdate,
        TrapOpcode::CvarSet,
        TrapOpcode::CvarIntegerValue,
        TrapOpcode::CvarStringBuffer,
        TrapOpcode::CvarLatchedStringBuffer,
        TrapOpcode::Argc,
        TrapOpcode::Argv,
        TrapOpcode::SendConsoleCommand,
        TrapOpcode::FsOpen,
        TrapOpcode::FsRead,
        TrapOpcode::FsWrite,
        TrapOpcode::FsRename,
        TrapOpcode::FsClose,
        TrapOpcode::FsFileList,
        TrapOpcode::LocateGameData,
        TrapOpcode::DropClient,
        TrapOpcode::SendServerCommand,
        TrapOpcode::SetUserinfo,
        TrapOpcode::GetUserinfo,
        TrapOpcode::GetUsercmd,
        TrapOpcode::BotAllocateClient,
        TrapOpcode::LinkEntity,
        TrapOpcode::UnlinkEntity,
        TrapOpcode::EntitiesInBox,
        TrapOpcode::EntityContact,
        TrapOpcode::EntityContactCapsule,
        TrapOpcode::Trace,
        TrapOpcode::TraceCapsule,
        TrapOpcode::PointContents,
        TrapOpcode::SetBrushModel,
        TrapOpcode::InPvs,
        TrapOpcode::InPvsIgnorePortals,
        TrapOpcode::AdjustAreaPortalState,
        TrapOpcode::AreasConnected,
        TrapOpcode::SetConfigstring,
        TrapOpcode::GetConfigstring,
        TrapOpcode::GetServerinfo,
        TrapOpcode::GetEntityToken,
        TrapOpcode::DebugPolygonCreate,
        TrapOpcode::DebugPolygonDelete,
        TrapOpcode::RealTime,
        TrapOpcode::SnapVector,
        TrapOpcode::GetTag,
        TrapOpcode::RegisterTag,
        TrapOpcode::RegisterSound,
        TrapOpcode::GetSoundLength,
        TrapOpcode::SendMessage,
        TrapOpcode::MessageStatus,
        TrapOpcode::StatReport,
        TrapOpcode::Memset,
        TrapOpcode::Memcpy,
        TrapOpcode::Strncpy,
        TrapOpcode::Sin,
        TrapOpcode::Cos,
        TrapOpcode::Atan2,
        TrapOpcode::Sqrt,
        TrapOpcode::MatrixMultiply,
        TrapOpcode::AngleVectors,
        TrapOpcode::PerpendicularVector,
        TrapOpcode::Floor,
        TrapOpcode::Ceil,
        TrapOpcode::PcLoadSource,
        TrapOpcode::PcFreeSource,
        TrapOpcode::PcReadToken,
        TrapOpcode::PcSourceFileAndLine,
        TrapOpcode::PcUnreadToken,
        TrapOpcode::BotGetConsoleMessage,
        TrapOpcode::BotUserCommand,
        TrapOpcode::BotEaCommand,
    ];

    /// Convert from a wire number.
    ///
    /// Returns `None` for numbers outside the enumerated set.
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as u32 == value)
    }

    /// Wire number of this opcode.
    pub fn number(self) -> u32 {
        self as u32
    }

    /// Number of arguments following the opcode.
    pub fn arity(self) -> usize {
        use TrapOpcode::*;
        match self {
            Milliseconds | Argc | StatReport => 0,
            Print | Error | CvarUpdate | CvarIntegerValue | FsClose | BotAllocateClient
            | LinkEntity | UnlinkEntity | DebugPolygonDelete | RealTime | SnapVector
            | RegisterTag | GetSoundLength | MessageStatus | Sin | Cos | Sqrt | Floor | Ceil
            | PcLoadSource | PcFreeSource | PcUnreadToken => 1,
            CvarSet | SendConsoleCommand | FsRename | SendServerCommand | SetUserinfo
            | GetUsercmd | PointContents | SetBrushModel | InPvs | InPvsIgnorePortals
            | AdjustAreaPortalState | AreasConnected | SetConfigstring | GetServerinfo
            | GetEntityToken | RegisterSound | Atan2 | PerpendicularVector | PcReadToken
            | BotUserCommand | BotEaCommand => 2,
            CvarStringBuffer | CvarLatchedStringBuffer | Argv | FsOpen | FsRead | FsWrite
            | DropClient | GetUserinfo | EntityContact | EntityContactCapsule
            | GetConfigstring | DebugPolygonCreate | SendMessage | Memset | Memcpy | Strncpy
            | MatrixMultiply | PcSourceFileAndLine | BotGetConsoleMessage => 3,
            CvarRegister | FsFileList | EntitiesInBox | GetTag | AngleVectors => 4,
            LocateGameData => 5,
            Trace | TraceCapsule => 7,
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn name(self) -> &'static str {
        use TrapOpcode::*;
        match self {
            Print => "G_PRINT",
            Error => "G_ERROR",
            Milliseconds => "G_MILLISECONDS",
            CvarRegister => "G_CVAR_REGISTER",
            CvarUpdate => "G_CVAR_UPDATE",
            CvarSet => "G_CVAR_SET",
            CvarIntegerValue => "G_CVAR_VARIABLE_INTEGER_VALUE",
            CvarStringBuffer => "G_CVAR_VARIABLE_STRING_BUFFER",
            CvarLatchedStringBuffer => "G_CVAR_LATCHED_VARIABLE_STRING_BUFFER",
            Argc => "G_ARGC",
            Argv => "G_ARGV",
            SendConsoleCommand => "G_SEND_CONSOLE_COMMAND",
            FsOpen => "G_FS_FOPEN_FILE",
            FsRead => "G_FS_READ",
            FsWrite => "G_FS_WRITE",
            FsRename => "G_FS_RENAME",
            FsClose => "G_FS_FCLOSE_FILE",
            FsFileList => "G_FS_GETFILELIST",
            LocateGameData => "G_LOCATE_GAME_DATA",
            DropClient => "G_DROP_CLIENT",
            SendServerCommand => "G_SEND_SERVER_COMMAND",
            SetUserinfo => "G_SET_USERINFO",
            GetUserinfo => "G_GET_USERINFO",
            GetUsercmd => "G_GET_USERCMD",
            BotAllocateClient => "G_BOT_ALLOCATE_CLIENT",
            LinkEntity => "G_LINK_ENTITY",
            UnlinkEntity => "G_UNLINK_ENTITY",
            EntitiesInBox => "G_ENTITIES_IN_BOX",
            EntityContact => "G_ENTITY_CONTACT",
            EntityContactCapsule => "G_ENTITY_CONTACT_CAPSULE",
            Trace => "G_TRACE",
            TraceCapsule => "G_TRACE_CAPSULE",
            PointContents => "G_POINT_CONTENTS",
            SetBrushModel => "G_SET_BRUSH_MODEL",
            InPvs => "G_IN_PVS",
            InPvsIgnorePortals => "G_IN_PVS_IGNORE_PORTALS",
            AdjustAreaPortalState => "G_ADJUST_AREA_PORTAL_STATE",
            AreasConnected => "G_AREAS_CONNECTED",
            SetConfigstring => "G_SET_CONFIGSTRING",
            GetConfigstring => "G_GET_CONFIGSTRING",
            GetServerinfo => "G_GET_SERVERINFO",
            GetEntityToken => "G_GET_ENTITY_TOKEN",
            DebugPolygonCreate => "G_DEBUG_POLYGON_CREATE",
            DebugPolygonDelete => "G_DEBUG_POLYGON_DELETE",
            RealTime => "G_REAL_TIME",
            SnapVector => "G_SNAPVECTOR",
            GetTag => "G_GETTAG",
            RegisterTag => "G_REGISTERTAG",
            RegisterSound => "G_REGISTERSOUND",
            GetSoundLength => "G_GET_SOUND_LENGTH",
            SendMessage => "G_SENDMESSAGE",
            MessageStatus => "G_MESSAGESTATUS",
            StatReport => "G_STAT_REPORT",
            Memset => "TRAP_MEMSET",
            Memcpy => "TRAP_MEMCPY",
            Strncpy => "TRAP_STRNCPY",
            Sin => "TRAP_SIN",
            Cos => "TRAP_COS",
            Atan2 => "TRAP_ATAN2",
            Sqrt => "TRAP_SQRT",
            MatrixMultiply => "TRAP_MATRIXMULTIPLY",
            AngleVectors => "TRAP_ANGLEVECTORS",
            PerpendicularVector => "TRAP_PERPENDICULARVECTOR",
            Floor => "TRAP_FLOOR",
            Ceil => "TRAP_CEIL",
            PcLoadSource => "BOTLIB_PC_LOAD_SOURCE",
            PcFreeSource => "BOTLIB_PC_FREE_SOURCE",
            PcReadToken => "BOTLIB_PC_READ_TOKEN",
            PcSourceFileAndLine => "BOTLIB_PC_SOURCE_FILE_AND_LINE",
            PcUnreadToken => "BOTLIB_PC_UNREAD_TOKEN",
            BotGetConsoleMessage => "BOTLIB_GET_CONSOLE_MESSAGE",
            BotUserCommand => "BOTLIB_USER_COMMAND",
            BotEaCommand => "BOTLIB_EA_COMMAND",
        }
    }
}

// =============================================================================
// Export Numbers (Host → Module)
// =============================================================================

/// Entry points the host calls on the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum GameExport {
    /// `(level_time, random_seed, is_restart)`
    Init = 0,
    /// `(is_restart)`
    Shutdown = 1,
    /// `(client_num, first_time, is_bot)` - returns 0 or a module address of a denial reason
    ClientConnect = 2,
    /// `(client_num)`
    ClientBegin = 3,
    /// `(client_num)`
    ClientUserinfoChanged = 4,
    /// `(client_num)`
    ClientDisconnect = 5,
    /// `(client_num)`
    ClientCommand = 6,
    /// `(client_num)`
    ClientThink = 7,
    /// `(level_time)`
    RunFrame = 8,
    /// No args; returns non-zero when the module claimed the command
    ConsoleCommand = 9,
    /// `(entity_num, client_num)`
    SnapshotCallback = 10,
    /// `(level_time)`
    BotAiStartFrame = 11,
    /// `(client_num, length, command_time)` with the payload delivered alongside
    MessageReceived = 12,
}

impl GameExport {
    /// Convert from u32 value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(GameExport::Init),
            1 => Some(GameExport::Shutdown),
            2 => Some(GameExport::ClientConnect),
            3 => Some(GameExport::ClientBegin),
            4 => Some(GameExport::ClientUserinfoChanged),
            5 => Some(GameExport::ClientDisconnect),
            6 => Some(GameExport::ClientCommand),
            7 => Some(GameExport::ClientThink),
            8 => Some(GameExport::RunFrame),
            9 => Some(GameExport::ConsoleCommand),
            10 => Some(GameExport::SnapshotCallback),
            11 => Some(GameExport::BotAiStartFrame),
            12 => Some(GameExport::MessageReceived),
            _ => None,
        }
    }
}
