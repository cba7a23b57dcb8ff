//! Per-client host state
//!
//! One [`ClientSlot`] per configured client. The module never sees these
//! directly; traps read and write them by client index.

use std::collections::VecDeque;

use svgame_abi::layout::UserCmd;
use svgame_abi::{
    MAX_BINARY_MESSAGE, MAX_RELIABLE_COMMANDS, MESSAGE_EMPTY, MESSAGE_WAITING, MESSAGE_WAITING_OVERFLOW,
};

/// Connection state of a client slot, in order of progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientState {
    /// Slot can be reused
    #[default]
    Free,
    /// Dropped; slot is held until the disconnect is fully processed
    Zombie,
    /// Has passed the connect handshake, no gamestate yet
    Connected,
    /// Gamestate sent, waiting for the first input command
    Primed,
    /// In the game
    Active,
}

/// Single-slot out-of-band message buffer.
///
/// Holds at most one pending message; every send overwrites. The status
/// seen by the module is empty, waiting, or waiting with the overflow flag
/// set by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BinaryMessage {
    data: Vec<u8>,
    overflowed: bool,
}

impl BinaryMessage {
    /// Replace the pending message. The caller has checked the length.
    pub fn store(&mut self, payload: &[u8]) {
        debug_assert!(payload.len() <= MAX_BINARY_MESSAGE);
        self.data.clear();
        self.data.extend_from_slice(payload);
        self.overflowed = false;
    }

    /// Back to empty.
    pub fn clear(&mut self) {
        self.data.clear();
        self.overflowed = false;
    }

    /// Flag that the pending message did not fit the last outgoing packet.
    pub fn mark_overflowed(&mut self) {
        if !self.data.is_empty() {
            self.overflowed = true;
        }
    }

    /// Consume the pending message.
    pub fn take(&mut self) -> Option<Vec<u8>> {
        if self.data.is_empty() {
            return None;
        }
        self.overflowed = false;
        Some(core::mem::take(&mut self.data))
    }

    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    pub fn status(&self) -> i32 {
        if self.data.is_empty() {
            MESSAGE_EMPTY
        } else if self.overflowed {
            MESSAGE_WAITING_OVERFLOW
        } else {
            MESSAGE_WAITING
        }
    }
}

/// Host-side record of one client slot.
#[derive(Clone, Debug, Default)]
pub struct ClientSlot {
    pub state: ClientState,
    /// Network address, used for temporary bans
    pub address: String,
    pub name: String,
    pub userinfo: String,
    pub is_bot: bool,
    /// Index of the module entity this client owns, if any
    pub gentity: Option<usize>,
    pub last_usercmd: UserCmd,
    /// Reliable commands queued for delivery, at most `MAX_RELIABLE_COMMANDS`
    pub reliable_commands: Vec<String>,
    /// Commands addressed to a bot, drained by the bot console trap; the
    /// oldest is discarded once `MAX_RELIABLE_COMMANDS` are waiting
    pub bot_console: VecDeque<String>,
    /// Reason given when the client was last dropped
    pub drop_reason: Option<String>,
    pub binary_message: BinaryMessage,
}

impl ClientSlot {
    /// Whether reliable commands are delivered to this slot.
    pub fn receives_commands(&self) -> bool {
        self.state >= ClientState::Primed
    }

    /// Queue a reliable command, mirroring it to the bot console for bots.
    ///
    /// Returns false without queueing when the reliable window is full.
    pub fn add_server_command(&mut self, text: &str) -> bool {
        if self.reliable_commands.len() >= MAX_RELIABLE_COMMANDS {
            return false;
        }
        self.reliable_commands.push(String::from(text));
        if self.is_bot {
            if self.bot_console.len() >= MAX_RELIABLE_COMMANDS {
                self.bot_console.pop_front();
            }
            self.bot_console.push_back(String::from(text));
        }
        true
    }

    /// Hand every queued reliable command to the transport.
    pub fn take_reliable_commands(&mut self) -> Vec<String> {
        std::mem::take(&mut self.reliable_commands)
    }

    /// Store new userinfo and refresh the cached name.
    pub fn set_userinfo(&mut self, userinfo: &str) {
        self.userinfo = String::from(userinfo);
        self.name = info_value_for_key(userinfo, "name").unwrap_or_default();
    }

    /// Return the slot to its initial state.
    pub fn reset(&mut self) {
        *self = ClientSlot::default();
    }
}

/// Look up `key` in a `\key\value\key\value` info string.
pub fn info_value_for_key(info: &str, key: &str) -> Option<String> {
    let mut parts = info.strip_prefix('\\').unwrap_or(info).split('\\');
    while let Some(k) = parts.next() {
        let value = parts.next()?;
        if k.eq_ignore_ascii_case(key) {
            return Some(String::from(value));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_message_states() {
        let mut msg = BinaryMessage::default();
        assert_eq!(msg.status(), MESSAGE_EMPTY);

        msg.store(b"hello");
        assert_eq!(msg.status(), MESSAGE_WAITING);
        msg.mark_overflowed();
        assert_eq!(msg.status(), MESSAGE_WAITING_OVERFLOW);

        msg.store(b"again");
        assert_eq!(msg.status(), MESSAGE_WAITING);
        assert_eq!(msg.take().as_deref(), Some(&b"again"[..]));
        assert_eq!(msg.status(), MESSAGE_EMPTY);
    }

    #[test]
    fn test_overflow_flag_needs_a_message() {
        let mut msg = BinaryMessage::default();
        msg.mark_overflowed();
        assert_eq!(msg.status(), MESSAGE_EMPTY);
    }

    #[test]
    fn test_info_lookup() {
        let info = "\\name\\Player\\rate\\25000";
        assert_eq!(info_value_for_key(info, "NAME").as_deref(), Some("Player"));
        assert_eq!(info_value_for_key(info, "rate").as_deref(), Some("25000"));
        assert_eq!(info_value_for_key(info, "snaps"), None);
    }

    #[test]
    fn test_bot_commands_reach_console_queue() {
        let mut slot = ClientSlot {
            is_bot: true,
            ..Default::default()
        };
        assert!(slot.add_server_command("print \"hi\""));
        assert_eq!(slot.reliable_commands.len(), 1);
        assert_eq!(slot.bot_console.pop_front().as_deref(), Some("print \"hi\""));
    }

    #[test]
    fn test_reliable_window_is_bounded() {
        let mut slot = ClientSlot::default();
        for i in 0..MAX_RELIABLE_COMMANDS {
            assert!(slot.add_server_command(&format!("print \"{i}\"")));
        }
        assert!(!slot.add_server_command("print \"late\""));
        assert_eq!(slot.reliable_commands.len(), MAX_RELIABLE_COMMANDS);

        assert_eq!(slot.take_reliable_commands().len(), MAX_RELIABLE_COMMANDS);
        assert!(slot.add_server_command("print \"late\""));
    }

    #[test]
    fn test_bot_console_keeps_newest() {
        let mut slot = ClientSlot {
            is_bot: true,
            ..Default::default()
        };
        for i in 0..=MAX_RELIABLE_COMMANDS {
            slot.add_server_command(&format!("print \"{i}\""));
            slot.take_reliable_commands();
        }
        assert_eq!(slot.bot_console.len(), MAX_RELIABLE_COMMANDS);
        assert_eq!(slot.bot_console.front().map(String::as_str), Some("print \"1\""));
    }
}
