//! Decoded trap requests
//!
//! A raw request is an opcode plus a flat vector of 32-bit words. [`Trap`]
//! gives every opcode its shape: which words are scalars, which are module
//! addresses ([`ModuleAddr`]) and which are float bit patterns. Decoding
//! checks the opcode against the closed set and the vector against the
//! opcode's arity. Extra trailing words are ignored.

use svgame_abi::TrapOpcode;

use crate::error::TrapError;
use crate::memory::{addr_arg, float_arg, ModuleAddr};

/// One trap request with typed arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum Trap {
    // === Console, clock, cvars, command line ===
    Print { text: ModuleAddr },
    Error { text: ModuleAddr },
    Milliseconds,
    CvarRegister { cvar: ModuleAddr, name: ModuleAddr, default_value: ModuleAddr, flags: i32 },
    CvarUpdate { cvar: ModuleAddr },
    CvarSet { name: ModuleAddr, value: ModuleAddr },
    CvarIntegerValue { name: ModuleAddr },
    CvarStringBuffer { name: ModuleAddr, buf: ModuleAddr, size: i32 },
    CvarLatchedStringBuffer { name: ModuleAddr, buf: ModuleAddr, size: i32 },
    Argc,
    Argv { n: i32, buf: ModuleAddr, size: i32 },
    SendConsoleCommand { when: i32, text: ModuleAddr },

    // === Filesystem ===
    FsOpen { path: ModuleAddr, handle_out: ModuleAddr, mode: i32 },
    FsRead { buf: ModuleAddr, len: i32, handle: i32 },
    FsWrite { buf: ModuleAddr, len: i32, handle: i32 },
    FsRename { from: ModuleAddr, to: ModuleAddr },
    FsClose { handle: i32 },
    FsFileList { path: ModuleAddr, extension: ModuleAddr, buf: ModuleAddr, size: i32 },

    // === Session bootstrap and client slots ===
    LocateGameData {
        entities: ModuleAddr,
        num_entities: i32,
        entity_size: i32,
        clients: ModuleAddr,
        client_size: i32,
    },
    DropClient { client: i32, reason: ModuleAddr, ban_seconds: i32 },
    SendServerCommand { client: i32, text: ModuleAddr },
    SetUserinfo { client: i32, value: ModuleAddr },
    GetUserinfo { client: i32, buf: ModuleAddr, size: i32 },
    GetUsercmd { client: i32, cmd: ModuleAddr },
    BotAllocateClient { client: i32 },

    // === World linkage and collision ===
    LinkEntity { ent: ModuleAddr },
    UnlinkEntity { ent: ModuleAddr },
    EntitiesInBox { mins: ModuleAddr, maxs: ModuleAddr, list: ModuleAddr, max_count: i32 },
    EntityContact { mins: ModuleAddr, maxs: ModuleAddr, ent: ModuleAddr, capsule: bool },
    Trace {
        results: ModuleAddr,
        start: ModuleAddr,
        mins: ModuleAddr,
        maxs: ModuleAddr,
        end: ModuleAddr,
        pass_entity: i32,
        content_mask: i32,
        capsule: bool,
    },
    PointContents { point: ModuleAddr, pass_entity: i32 },
    SetBrushModel { ent: ModuleAddr, name: ModuleAddr },

    // === Visibility and area portals ===
    InPvs { p1: ModuleAddr, p2: ModuleAddr, ignore_portals: bool },
    AdjustAreaPortalState { ent: ModuleAddr, open: bool },
    AreasConnected { area1: i32, area2: i32 },

    // === Config strings and info strings ===
    SetConfigstring { index: i32, value: ModuleAddr },
    GetConfigstring { index: i32, buf: ModuleAddr, size: i32 },
    GetServerinfo { buf: ModuleAddr, size: i32 },

    // === Entity text, debug, real time, tags, sound ===
    GetEntityToken { buf: ModuleAddr, size: i32 },
    DebugPolygonCreate { color: i32, num_points: i32, points: ModuleAddr },
    DebugPolygonDelete { id: i32 },
    RealTime { qtime: ModuleAddr },
    SnapVector { v: ModuleAddr },
    GetTag { client: i32, tag_file: i32, name: ModuleAddr, orientation: ModuleAddr },
    RegisterTag { filename: ModuleAddr },
    RegisterSound { name: ModuleAddr, compressed: bool },
    GetSoundLength { handle: i32 },

    // === Out-of-band binary messages ===
    SendMessage { client: i32, buf: ModuleAddr, len: i32 },
    MessageStatus { client: i32 },
    StatReport,

    // === Raw memory and math helpers ===
    Memset { dst: ModuleAddr, value: i32, len: i32 },
    Memcpy { dst: ModuleAddr, src: ModuleAddr, len: i32 },
    Strncpy { dst: ModuleAddr, src: ModuleAddr, len: i32 },
    Sin { x: f32 },
    Cos { x: f32 },
    Atan2 { y: f32, x: f32 },
    Sqrt { x: f32 },
    MatrixMultiply { in1: ModuleAddr, in2: ModuleAddr, out: ModuleAddr },
    AngleVectors { angles: ModuleAddr, forward: ModuleAddr, right: ModuleAddr, up: ModuleAddr },
    PerpendicularVector { dst: ModuleAddr, src: ModuleAddr },
    Floor { x: f32 },
    Ceil { x: f32 },

    // === Bot library ===
    PcLoadSource { filename: ModuleAddr },
    PcFreeSource { handle: i32 },
    PcReadToken { handle: i32, token: ModuleAddr },
    PcSourceFileAndLine { handle: i32, filename: ModuleAddr, line: ModuleAddr },
    PcUnreadToken { handle: i32 },
    BotGetConsoleMessage { client: i32, buf: ModuleAddr, size: i32 },
    BotUserCommand { client: i32, cmd: ModuleAddr },
    BotEaCommand { client: i32, command: ModuleAddr },
}

impl Trap {
    /// Decode a raw request.
    ///
    /// An opcode outside the enumerated set is fatal whatever the arguments.
    pub fn decode(opcode: u32, args: &[i32]) -> Result<Self, TrapError> {
        let op = TrapOpcode::from_u32(opcode).ok_or(TrapError::UnknownOpcode { opcode })?;
        let expected = op.arity();
        if args.len() < expected {
            return Err(TrapError::ArgumentCount {
                expected,
                got: args.len(),
            });
        }

        let i = |n: usize| args[n];
        let a = |n: usize| addr_arg(args[n]);
        let f = |n: usize| float_arg(args[n]);
        let b = |n: usize| args[n] != 0;

        use TrapOpcode as Op;
        let trap = match op {
            Op::Print => Trap::Print { text: a(0) },
            Op::Error => Trap::Error { text: a(0) },
            Op::Milliseconds => Trap::Milliseconds,
            Op::CvarRegister => Trap::CvarRegister {
                cvar: a(0),
                name: a(1),
                default_value: a(2),
                flags: i(3),
            },
            Op::CvarUpdate => Trap::CvarUpdate { cvar: a(0) },
            Op::CvarSet => Trap::CvarSet {
                name: a(0),
                value: a(1),
            },
            Op::CvarIntegerValue => Trap::CvarIntegerValue { name: a(0) },
            Op::CvarStringBuffer => Trap::CvarStringBuffer {
                name: a(0),
                buf: a(1),
                size: i(2),
            },
            Op::CvarLatchedStringBuffer => Trap::CvarLatchedStringBuffer {
                name: a(0),
                buf: a(1),
                size: i(2),
            },
            Op::Argc => Trap::Argc,
            Op::Argv => Trap::Argv {
                n: i(0),
                buf: a(1),
                size: i(2),
            },
            Op::SendConsoleCommand => Trap::SendConsoleCommand {
                when: i(0),
                text: a(1),
            },

            Op::FsOpen => Trap::FsOpen {
                path: a(0),
                handle_out: a(1),
                mode: i(2),
            },
            Op::FsRead => Trap::FsRead {
                buf: a(0),
                len: i(1),
                handle: i(2),
            },
            Op::FsWrite => Trap::FsWrite {
                buf: a(0),
                len: i(1),
                handle: i(2),
            },
            Op::FsRename => Trap::FsRename { from: a(0), to: a(1) },
            Op::FsClose => Trap::FsClose { handle: i(0) },
            Op::FsFileList => Trap::FsFileList {
                path: a(0),
                extension: a(1),
                buf: a(2),
                size: i(3),
            },

            Op::LocateGameData => Trap::LocateGameData {
                entities: a(0),
                num_entities: i(1),
                entity_size: i(2),
                clients: a(3),
                client_size: i(4),
            },
            Op::DropClient => Trap::DropClient {
                client: i(0),
                reason: a(1),
                ban_seconds: i(2),
            },
            Op::SendServerCommand => Trap::SendServerCommand {
                client: i(0),
                text: a(1),
            },
            Op::SetUserinfo => Trap::SetUserinfo {
                client: i(0),
                value: a(1),
            },
            Op::GetUserinfo => Trap::GetUserinfo {
                client: i(0),
                buf: a(1),
                size: i(2),
            },
            Op::GetUsercmd => Trap::GetUsercmd {
                client: i(0),
                cmd: a(1),
            },
            Op::BotAllocateClient => Trap::BotAllocateClient { client: i(0) },

            Op::LinkEntity => Trap::LinkEntity { ent: a(0) },
            Op::UnlinkEntity => Trap::UnlinkEntity { ent: a(0) },
            Op::EntitiesInBox => Trap::EntitiesInBox {
                mins: a(0),
                maxs: a(1),
                list: a(2),
                max_count: i(3),
            },
            Op::EntityContact | Op::EntityContactCapsule => Trap::EntityContact {
                mins: a(0),
                maxs: a(1),
                ent: a(2),
                capsule: op == Op::EntityContactCapsule,
            },
            Op::Trace | Op::TraceCapsule => Trap::Trace {
                results: a(0),
                start: a(1),
                mins: a(2),
                maxs: a(3),
                end: a(4),
                pass_entity: i(5),
                content_mask: i(6),
                capsule: op == Op::TraceCapsule,
            },
            Op::PointContents => Trap::PointContents {
                point: a(0),
                pass_entity: i(1),
            },
            Op::SetBrushModel => Trap::SetBrushModel { ent: a(0), name: a(1) },

            Op::InPvs | Op::InPvsIgnorePortals => Trap::InPvs {
                p1: a(0),
                p2: a(1),
                ignore_portals: op == Op::InPvsIgnorePortals,
            },
            Op::AdjustAreaPortalState => Trap::AdjustAreaPortalState {
                ent: a(0),
                open: b(1),
            },
            Op::AreasConnected => Trap::AreasConnected {
                area1: i(0),
                area2: i(1),
            },

            Op::SetConfigstring => Trap::SetConfigstring {
                index: i(0),
                value: a(1),
            },
            Op::GetConfigstring => Trap::GetConfigstring {
                index: i(0),
                buf: a(1),
                size: i(2),
            },
            Op::GetServerinfo => Trap::GetServerinfo { buf: a(0), size: i(1) },

            Op::GetEntityToken => Trap::GetEntityToken { buf: a(0), size: i(1) },
            Op::DebugPolygonCreate => Trap::DebugPolygonCreate {
                color: i(0),
                num_points: i(1),
                points: a(2),
            },
            Op::DebugPolygonDelete => Trap::DebugPolygonDelete { id: i(0) },
            Op::RealTime => Trap::RealTime { qtime: a(0) },
            Op::SnapVector => Trap::SnapVector { v: a(0) },
            Op::GetTag => Trap::GetTag {
                client: i(0),
                tag_file: i(1),
                name: a(2),
                orientation: a(3),
            },
            Op::RegisterTag => Trap::RegisterTag { filename: a(0) },
            Op::RegisterSound => Trap::RegisterSound {
                name: a(0),
                compressed: b(1),
            },
            Op::GetSoundLength => Trap::GetSoundLength { handle: i(0) },

            Op::SendMessage => Trap::SendMessage {
                client: i(0),
                buf: a(1),
                len: i(2),
            },
            Op::MessageStatus => Trap::MessageStatus { client: i(0) },
            Op::StatReport => Trap::StatReport,

            Op::Memset => Trap::Memset {
                dst: a(0),
                value: i(1),
                len: i(2),
            },
            Op::Memcpy => Trap::Memcpy {
                dst: a(0),
                src: a(1),
                len: i(2),
            },
            Op::Strncpy => Trap::Strncpy {
                dst: a(0),
                src: a(1),
                len: i(2),
            },
            Op::Sin => Trap::Sin { x: f(0) },
            Op::Cos => Trap::Cos { x: f(0) },
            Op::Atan2 => Trap::Atan2 { y: f(0), x: f(1) },
            Op::Sqrt => Trap::Sqrt { x: f(0) },
            Op::MatrixMultiply => Trap::MatrixMultiply {
                in1: a(0),
                in2: a(1),
                out: a(2),
            },
            Op::AngleVectors => Trap::AngleVectors {
                angles: a(0),
                forward: a(1),
                right: a(2),
                up: a(3),
            },
            Op::PerpendicularVector => Trap::PerpendicularVector { dst: a(0), src: a(1) },
            Op::Floor => Trap::Floor { x: f(0) },
            Op::Ceil => Trap::Ceil { x: f(0) },

            Op::PcLoadSource => Trap::PcLoadSource { filename: a(0) },
            Op::PcFreeSource => Trap::PcFreeSource { handle: i(0) },
            Op::PcReadToken => Trap::PcReadToken {
                handle: i(0),
                token: a(1),
            },
            Op::PcSourceFileAndLine => Trap::PcSourceFileAndLine {
                handle: i(0),
                filename: a(1),
                line: a(2),
            },
            Op::PcUnreadToken => Trap::PcUnreadToken { handle: i(0) },
            Op::BotGetConsoleMessage => Trap::BotGetConsoleMessage {
                client: i(0),
                buf: a(1),
                size: i(2),
            },
            Op::BotUserCommand => Trap::BotUserCommand {
                client: i(0),
                cmd: a(1),
            },
            Op::BotEaCommand => Trap::BotEaCommand {
                client: i(0),
                command: a(1),
            },
        };
        Ok(trap)
    }
}
