//! Boundary services
//!
//! Thin adapters from decoded traps to [`ServerHal`](svgame_hal::ServerHal) collaborators and host
//! state. Each handler translates its module-relative arguments through
//! [`ModuleMemory`](crate::memory::ModuleMemory), performs one host action,
//! and writes any results back into module memory.
//!
//! Handlers are split by trap range:
//! - `console` - print, error, cvars, command line
//! - `filesystem` - file handles and listings
//! - `clients` - game data location, client slots, out-of-band messages
//! - `world` - entity linkage, collision, visibility, area portals
//! - `info` - config strings, server info, entity text, tags, sound, time
//! - `qmath` - raw memory and math helpers
//! - `botlib` - bot library pass-throughs

mod botlib;
mod clients;
mod console;
mod filesystem;
mod info;
mod qmath;
mod world;

pub use world::atoi;

use crate::client::ClientSlot;
use crate::error::TrapError;
use crate::state::ServerState;

/// Client slot for an index the caller is assumed to have validated.
///
/// Out of range is fatal.
pub(crate) fn required_client(server: &mut ServerState, client: i32) -> Result<&mut ClientSlot, TrapError> {
    let capacity = server.clients.len();
    server.client_mut(client).ok_or(TrapError::BadClientIndex {
        index: client as i64,
        capacity,
    })
}

#[cfg(test)]
pub(crate) mod fixture {
    use svgame_hal::TestHal;

    use crate::config::HostConfig;
    use crate::dispatch::TrapDispatcher;
    use crate::error::TrapResult;
    use crate::memory::{ModuleAddr, ModuleMemory};
    use crate::mirror::GameData;
    use crate::state::ServerState;

    /// Dispatcher inputs over the stub HAL and 64 KiB of module memory.
    pub struct Fixture {
        pub hal: TestHal,
        pub config: HostConfig,
        pub server: ServerState,
        pub data: GameData,
        pub mem: ModuleMemory,
    }

    impl Fixture {
        pub fn new() -> Self {
            let config = HostConfig {
                max_clients: 8,
                ..Default::default()
            };
            Self {
                hal: TestHal::new(),
                server: ServerState::new(&config),
                config,
                data: GameData::default(),
                mem: ModuleMemory::new(64 * 1024),
            }
        }

        pub fn trap(&mut self, opcode: u32, args: &[i32]) -> TrapResult {
            let mut dispatcher = TrapDispatcher::new(&self.hal, &self.config, &mut self.server, &mut self.data);
            dispatcher.dispatch(&mut self.mem, opcode, args)
        }

        pub fn put_str(&mut self, addr: ModuleAddr, text: &str) {
            let buf = self.mem.translate_mut(addr, text.len() + 1).unwrap();
            buf[..text.len()].copy_from_slice(text.as_bytes());
            buf[text.len()] = 0;
        }

        pub fn put_vec3(&mut self, addr: ModuleAddr, v: [f32; 3]) {
            self.mem.write_vec3(addr, &v).unwrap();
        }
    }
}
