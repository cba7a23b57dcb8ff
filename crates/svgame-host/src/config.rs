//! Host configuration.
//!
//! Loaded once at server start from JSON. Values are read by the boundary
//! core only; the module sees them through cvars, never directly.

use serde::{Deserialize, Serialize};
use svgame_abi::MAX_CLIENTS;

use crate::error::ConfigError;

/// Configuration of the boundary core, stored at [`HostConfig::PATH`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Name passed to the module loader
    pub module_name: String,

    /// Configured maximum client count (bounds every client index)
    pub max_clients: usize,

    /// Slots below this index are reserved and never handed to bots
    pub private_clients: usize,

    /// True when no detached render client runs in this process
    pub dedicated: bool,

    /// Trap requests/responses kept for diagnosis
    pub trap_log_capacity: usize,

    /// Active game type
    pub game_type: u32,

    /// Bitmask of game types that are single player
    pub single_player_game_types: u32,

    /// Bitmask of game types that are co-op
    pub coop_game_types: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_name: String::from("qagame"),
            max_clients: 20,
            private_clients: 0,
            dedicated: true,
            trap_log_capacity: 4096,
            game_type: 0,
            single_player_game_types: 0,
            coop_game_types: 0,
        }
    }
}

impl HostConfig {
    /// Conventional location of the config file.
    pub const PATH: &'static str = "config/svgame.json";

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: HostConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.module_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "module_name",
                reason: String::from("must not be empty"),
            });
        }
        if self.max_clients == 0 || self.max_clients > MAX_CLIENTS {
            return Err(ConfigError::Invalid {
                field: "max_clients",
                reason: format!("{} outside 1..={}", self.max_clients, MAX_CLIENTS),
            });
        }
        if self.private_clients >= self.max_clients {
            return Err(ConfigError::Invalid {
                field: "private_clients",
                reason: format!("{} must be below max_clients {}", self.private_clients, self.max_clients),
            });
        }
        if self.game_type >= 32 {
            return Err(ConfigError::Invalid {
                field: "game_type",
                reason: format!("{} does not fit the game type bitmasks", self.game_type),
            });
        }
        Ok(())
    }

    /// Whether the active game type is single player.
    pub fn is_single_player(&self) -> bool {
        game_type_bit(self.game_type) & self.single_player_game_types != 0
    }

    /// Whether the active game type is co-op (single player without save games).
    pub fn is_coop(&self) -> bool {
        game_type_bit(self.game_type) & self.coop_game_types != 0
    }
}

fn game_type_bit(game_type: u32) -> u32 {
    1u32.checked_shl(game_type).unwrap_or(0)
}
