//! Error types for the boundary core
//!
//! Two severity tiers cross the boundary:
//! - **Fatal** ([`TrapError`], wrapped with its opcode in [`TrapFault`]):
//!   protocol violations, memory-safety violations, malformed inputs. The
//!   current module invocation is aborted and the session is dropped.
//! - **Soft** ([`TrapResult::Ignored`]): well-defined no-ops such as messaging
//!   a nonexistent client.
//!
//! [`SessionError`] is the lifecycle tier returned to the server's top level.

use svgame_abi::TrapOpcode;

/// A fatal condition raised while serving a trap.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TrapError {
    /// Opcode outside the enumerated set.
    #[error("bad game system trap: {opcode:#x}")]
    UnknownOpcode { opcode: u32 },

    /// Fewer arguments than the opcode's fixed arity.
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    /// `[addr, addr+len)` is not inside module memory.
    #[error("access {addr:#x}+{len} outside module memory of {memory_size} bytes")]
    OutOfBounds {
        addr: u32,
        len: usize,
        memory_size: usize,
    },

    /// No NUL terminator before the end of module memory.
    #[error("unterminated string at {addr:#x}")]
    UnterminatedString { addr: u32 },

    /// Entity index outside the located record array.
    #[error("bad entity index {index} (capacity {capacity})")]
    BadEntityIndex { index: i64, capacity: usize },

    /// Address does not sit on an entity record boundary.
    #[error("address {addr:#x} is not an entity record")]
    MisalignedEntityAddress { addr: u32 },

    /// Client index outside `[0, max_clients)`.
    #[error("bad client index {index} (max clients {capacity})")]
    BadClientIndex { index: i64, capacity: usize },

    /// Address does not sit on a client record boundary.
    #[error("address {addr:#x} is not a client record")]
    MisalignedClientAddress { addr: u32 },

    /// Entity or client records referenced before the module located them.
    #[error("game data has not been located")]
    NotLocated,

    /// Declared stride cannot hold the shared header.
    #[error("record stride {stride} is smaller than the {header}-byte shared header")]
    BadStride { stride: i32, header: usize },

    /// Declared record count outside the compile-time maximum.
    #[error("record count {count} outside [0, {max}]")]
    BadRecordCount { count: i32, max: usize },

    #[error("bad config string index {index}")]
    BadConfigStringIndex { index: i32 },

    #[error("buffer size {size} < 1")]
    BadBufferSize { size: i32 },

    #[error("negative length {length}")]
    NegativeLength { length: i32 },

    /// Binary message longer than the client slot holds.
    #[error("client {client}: bad binary message length {length}")]
    BinaryMessageLength { client: i32, length: i32 },

    /// Inline model name without the reserved marker.
    #[error("{name:?} isn't a brush model")]
    NotBrushModel { name: String },

    #[error("bad inline model {index}")]
    BadInlineModel { index: i32 },

    #[error("illegal cvar handle {handle}")]
    BadCvarHandle { handle: i32 },

    #[error("cvar {handle} value of {length} bytes does not fit the module record")]
    CvarValueTooLong { handle: i32, length: usize },

    #[error("MAX_TAG_FILES reached")]
    TagFileLimit,

    #[error("MAX_SERVER_TAGS reached")]
    ServerTagLimit,

    /// The module itself reported an error.
    #[error("{message}")]
    ModuleError { message: String },
}

/// A fatal trap error tagged with the opcode that raised it.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{name} ({opcode:#x}): {error}")]
pub struct TrapFault {
    pub opcode: u32,
    pub name: &'static str,
    #[source]
    pub error: TrapError,
}

impl TrapFault {
    pub fn new(opcode: u32, error: TrapError) -> Self {
        let name = TrapOpcode::from_u32(opcode)
            .map(TrapOpcode::name)
            .unwrap_or("UNKNOWN");
        Self {
            opcode,
            name,
            error,
        }
    }
}

/// Outcome of a single trap.
#[derive(Clone, Debug, PartialEq)]
pub enum TrapResult {
    /// Success with a value (0 for void traps)
    Ok(i32),
    /// Soft no-op with well-defined semantics
    Ignored,
    /// Unrecoverable; aborts the module invocation
    Fatal(TrapFault),
}

impl TrapResult {
    /// Collapse to the wire-level result seen by the module.
    ///
    /// `Ignored` encodes as 0.
    pub fn into_wire(self) -> Result<i32, TrapFault> {
        match self {
            TrapResult::Ok(value) => Ok(value),
            TrapResult::Ignored => Ok(0),
            TrapResult::Fatal(fault) => Err(fault),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, TrapResult::Fatal(_))
    }

    /// Wire value for the trap log (fatal as -1).
    pub fn log_value(&self) -> i64 {
        match self {
            TrapResult::Ok(value) => *value as i64,
            TrapResult::Ignored => 0,
            TrapResult::Fatal(_) => -1,
        }
    }
}

/// Error returned by a module invocation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ModuleError {
    /// A trap issued during the call was fatal
    #[error(transparent)]
    Trap(#[from] TrapFault),
    /// The module's execution strategy faulted on its own
    #[error("module fault: {0}")]
    Fault(String),
}

/// Errors surfaced to the server's top level.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The current server session must be dropped
    #[error("session dropped: {0}")]
    Drop(#[from] ModuleError),

    /// No module instance could be created; there is no game without one
    #[error("VM_Create on {module} failed: {reason}")]
    CreateFailed { module: String, reason: String },

    /// The old instance was discarded and no new one could be created
    #[error("VM_Restart on {module} failed: {reason}")]
    RestartFailed { module: String, reason: String },

    /// A module entry point was invoked with no running instance
    #[error("no game module is running")]
    NotRunning,

    /// Host-side caller passed a client index outside `[0, max_clients)`
    #[error("bad client index {index}")]
    BadClient { index: usize },

    /// Deferred calls kept requeueing themselves past the per-call cap
    #[error("more than {limit} deferred module calls")]
    DeferredLimit { limit: usize },
}

impl From<TrapFault> for SessionError {
    fn from(fault: TrapFault) -> Self {
        SessionError::Drop(ModuleError::Trap(fault))
    }
}

/// Configuration errors.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}
