//! Trap Event Log (TrapLog)
//!
//! Records every trap (request + response) for diagnosis. When a fatal
//! error drops the session, the recent history shows what the module was
//! doing. Oldest events are trimmed once the configured capacity is reached.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Monotonic event identifier.
pub type EventId = u64;

/// A trap event (request or response).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrapEvent {
    /// Unique event ID (monotonic)
    pub id: EventId,
    /// Host milliseconds when the event was recorded
    pub timestamp: i32,
    /// Event type (request or response)
    pub event_type: TrapEventType,
}

/// Type of trap event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrapEventType {
    /// Trap request from the module
    Request {
        /// Trap opcode
        opcode: u32,
        /// First arguments (missing ones are 0)
        args: [i32; 4],
    },
    /// Trap response to the module
    Response {
        /// ID of the request this responds to
        request_id: EventId,
        /// Wire result (-1 = fatal)
        result: i64,
    },
}

/// Trap event log for diagnosis.
pub struct TrapLog {
    events: VecDeque<TrapEvent>,
    next_id: EventId,
    capacity: usize,
}

impl TrapLog {
    /// Create an empty log keeping at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 0,
            capacity,
        }
    }

    /// Log a trap request.
    ///
    /// Returns the event ID for correlating with the response.
    pub fn log_request(&mut self, opcode: u32, args: &[i32], timestamp: i32) -> EventId {
        let mut head = [0i32; 4];
        for (slot, arg) in head.iter_mut().zip(args) {
            *slot = *arg;
        }
        self.push(timestamp, TrapEventType::Request { opcode, args: head })
    }

    /// Log a trap response.
    pub fn log_response(&mut self, request_id: EventId, result: i64, timestamp: i32) {
        self.push(timestamp, TrapEventType::Response { request_id, result });
    }

    fn push(&mut self, timestamp: i32, event_type: TrapEventType) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        if self.capacity == 0 {
            return id;
        }
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(TrapEvent {
            id,
            timestamp,
            event_type,
        });
        id
    }

    /// Get all retained events.
    pub fn events(&self) -> &VecDeque<TrapEvent> {
        &self.events
    }

    /// Get the most recent N events, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<&TrapEvent> {
        self.events.iter().rev().take(count).collect()
    }

    /// Opcode of the most recent request, if any is retained.
    pub fn last_request(&self) -> Option<u32> {
        self.events.iter().rev().find_map(|e| match e.event_type {
            TrapEventType::Request { opcode, .. } => Some(opcode),
            TrapEventType::Response { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get the next event ID.
    pub fn next_id(&self) -> EventId {
        self.next_id
    }

    /// Serialize the retained events for a crash report.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.events).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_response_correlation() {
        let mut log = TrapLog::new(16);
        let id = log.log_request(0x035, &[1, 2, 3, 4, 5, 6, 7], 100);
        log.log_response(id, 0, 100);

        assert_eq!(log.len(), 2);
        match &log.events()[0].event_type {
            TrapEventType::Request { opcode, args } => {
                assert_eq!(*opcode, 0x035);
                assert_eq!(*args, [1, 2, 3, 4]);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &log.events()[1].event_type {
            TrapEventType::Response { request_id, .. } => assert_eq!(*request_id, id),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_trims_oldest() {
        let mut log = TrapLog::new(3);
        for op in 0..5u32 {
            log.log_request(op, &[], 0);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.events()[0].id, 2);
        assert_eq!(log.last_request(), Some(4));
        assert_eq!(log.next_id(), 5);
    }

    #[test]
    fn test_full_log_slides_one_event_at_a_time() {
        let mut log = TrapLog::new(4);
        for op in 0..100u32 {
            let id = log.log_request(op, &[], 0);
            log.log_response(id, 0, 0);
            assert!(log.len() <= 4);
        }
        let ids: Vec<EventId> = log.events().iter().map(|e| e.id).collect();
        assert_eq!(ids, [196, 197, 198, 199]);
        assert_eq!(log.last_request(), Some(99));
    }

    #[test]
    fn test_zero_capacity_keeps_ids_moving() {
        let mut log = TrapLog::new(0);
        log.log_request(1, &[], 0);
        assert!(log.is_empty());
        assert_eq!(log.next_id(), 1);
    }

    #[test]
    fn test_json_dump() {
        let mut log = TrapLog::new(4);
        log.log_request(0x001, &[8], 7);
        let json = log.to_json();
        assert!(json.contains("\"opcode\":1"), "{json}");
    }
}
