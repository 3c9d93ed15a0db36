//! Append-only edit log with a bounded visible window
//!
//! Records accepted edits in acceptance order. Clients only ever see the
//! most recent HISTORY_WINDOW records, so internal retention is capped at
//! that window; older records fall off the front.

use std::collections::VecDeque;

use shared::{EditRecord, HISTORY_WINDOW};

pub struct EditLog {
    records: VecDeque<EditRecord>,
    capacity: usize,
    total_appended: u64,
}

impl EditLog {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            total_appended: 0,
        }
    }

    /// Appends a record, evicting the oldest retained record if the window
    /// is full. Never rejects a record.
    pub fn append(&mut self, record: EditRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        self.total_appended += 1;
    }

    /// The last min(k, len) records, oldest first.
    pub fn recent(&self, k: usize) -> Vec<EditRecord> {
        let skip = self.records.len().saturating_sub(k);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lifetime count of accepted edits, including evicted ones.
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }
}

impl Default for EditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: u32) -> EditRecord {
        EditRecord {
            row: n % 10,
            col: n / 10,
            character: 'x',
            player_id: 1,
            player_name: "Alice".to_string(),
            timestamp: n as u64,
        }
    }

    #[test]
    fn test_recent_on_empty_log() {
        let log = EditLog::new();
        assert!(log.recent(10).is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_recent_returns_all_when_fewer_than_k() {
        let mut log = EditLog::new();
        log.append(record(1));
        log.append(record(2));

        let recent = log.recent(50);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, 1);
        assert_eq!(recent[1].timestamp, 2);
    }

    #[test]
    fn test_recent_is_oldest_first_suffix() {
        let mut log = EditLog::new();
        for n in 1..=10 {
            log.append(record(n));
        }

        let recent = log.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].timestamp, 8);
        assert_eq!(recent[1].timestamp, 9);
        assert_eq!(recent[2].timestamp, 10);
    }

    #[test]
    fn test_window_eviction_preserves_order() {
        let mut log = EditLog::with_capacity(5);
        for n in 1..=8 {
            log.append(record(n));
        }

        assert_eq!(log.len(), 5);
        assert_eq!(log.total_appended(), 8);

        let recent = log.recent(5);
        let timestamps: Vec<u64> = recent.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_default_capacity_matches_exposed_window() {
        let mut log = EditLog::new();
        for n in 1..=(HISTORY_WINDOW as u32 + 20) {
            log.append(record(n));
        }

        assert_eq!(log.len(), HISTORY_WINDOW);
        let recent = log.recent(HISTORY_WINDOW);
        assert_eq!(recent.first().unwrap().timestamp, 21);
        assert_eq!(recent.last().unwrap().timestamp, HISTORY_WINDOW as u64 + 20);
    }
}
