//! A bounded, presentation-facing log of recent channel events.
//!
//! Not authoritative: the reconciler's state is the source of truth. The
//! log exists so a UI can show "what just came over the wire".

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ChannelEvent;

/// How many events the log keeps by default.
pub const EVENT_LOG_CAPACITY: usize = 50;

/// One logged event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Arrival time, milliseconds since the Unix epoch.
    pub received_at_ms: u64,
    pub event: ChannelEvent,
}

/// Keeps the most recent `capacity` events, oldest evicted first.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    /// Creates an empty log. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records `event` with the current wall-clock time.
    pub fn push(&mut self, event: ChannelEvent) {
        self.push_at(now_ms(), event);
    }

    /// Records `event` with an explicit arrival time.
    pub fn push_at(&mut self, received_at_ms: u64, event: ChannelEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            received_at_ms,
            event,
        });
    }

    /// Entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// A copy of the entries, oldest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENT_LOG_CAPACITY)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_protocol::{RoomEvent, RoomId};

    fn started(id: u64) -> ChannelEvent {
        ChannelEvent::Room(RoomEvent::RoomStarted { id: RoomId(id) })
    }

    #[test]
    fn test_push_beyond_capacity_evicts_oldest() {
        let mut log = EventLog::new(3);
        for id in 1..=5 {
            log.push_at(id * 10, started(id));
        }
        let times: Vec<u64> = log.iter().map(|e| e.received_at_ms).collect();
        assert_eq!(times, vec![30, 40, 50]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_default_capacity_is_fifty() {
        let mut log = EventLog::default();
        for id in 0..60 {
            log.push(started(id));
        }
        assert_eq!(log.len(), EVENT_LOG_CAPACITY);
        assert_eq!(log.to_vec()[0].event, started(10));
    }

    #[test]
    fn test_push_records_arrival_time() {
        let mut log = EventLog::new(1);
        log.push(started(1));
        assert!(log.to_vec()[0].received_at_ms > 0);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let log = EventLog::new(0);
        assert_eq!(log.capacity(), 1);
        assert!(log.is_empty());
    }
}
