//! Game module boundary core
//!
//! This crate implements the host side of the server/game-module boundary:
//! - Address translation into module memory
//! - Entity and client record mirrors over module-declared strides
//! - Trap decoding and dispatch to host services
//! - Module lifecycle (create, warm restart, shutdown)
//! - Per-client slots, config strings, tags and the trap audit log
//!
//! The module is reached only through [`GameModule`]; every host service it
//! can use goes through [`svgame_hal::ServerHal`].

mod client;
mod config;
mod dispatch;
mod entity_string;
mod error;
mod lifecycle;
mod memory;
mod mirror;
mod module;
mod server;
mod services;
mod state;
mod syslog;
mod tags;
mod trap;

// Re-export ABI and HAL types
pub use svgame_abi::{layout, GameExport, TrapOpcode};
pub use svgame_hal::{EntityLink, HalError, ServerHal};

pub use client::{info_value_for_key, BinaryMessage, ClientSlot, ClientState};
pub use config::HostConfig;
pub use dispatch::TrapDispatcher;
pub use entity_string::EntityParser;
pub use error::{ConfigError, ModuleError, SessionError, TrapError, TrapFault, TrapResult};
pub use lifecycle::{LifecycleState, ModuleSession};
pub use memory::{addr_arg, float_arg, float_result, ModuleAddr, ModuleMemory, NULL_ADDR};
pub use mirror::{ClientMirror, EntityMirror, GameData, RecordKind, StrideTable};
pub use module::{GameModule, ModuleCall, ModuleLoader, TrapHandler};
pub use server::GameServer;
pub use services::atoi;
pub use state::{DeferredCall, ServerEntity, ServerRunState, ServerState, MAX_DEFERRED_CALLS};
pub use syslog::{EventId, TrapEvent, TrapEventType, TrapLog};
pub use tags::{encode_tag_file, TagRegistry};
pub use trap::Trap;
