use std::collections::VecDeque;

use limn_types::{ElementHandle, HistoryEntry};

/// How many resize observations the log retains. Oldest entries are evicted
/// first; this is the only admission control the feed gets.
pub const HISTORY_CAPACITY: usize = 200;

/// Bounded, order-preserving log of recent resize observations.
#[derive(Debug)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Appends an observation.
    ///
    /// A container resize is typically followed at once by resizes of its
    /// descendants; when the new path strictly extends the newest entry's
    /// path, that entry is dropped so only the most specific of the cascade
    /// survives.
    pub fn record(&mut self, handle: ElementHandle, path: String) {
        if let Some(newest) = self.entries.back()
            && path.len() > newest.path.len()
            && path.starts_with(newest.path.as_str())
        {
            self.entries.pop_back();
        }

        self.entries.push_back(HistoryEntry { handle, path });

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(raw: u64) -> ElementHandle {
        ElementHandle::new(raw).expect("non-zero")
    }

    fn paths(log: &HistoryLog) -> Vec<&str> {
        log.iter().map(|entry| entry.path.as_str()).collect()
    }

    #[test]
    fn cascade_keeps_most_specific_entry() {
        let mut log = HistoryLog::new();
        log.record(handle(1), "Page".to_string());
        log.record(handle(2), "Page/Grid".to_string());
        log.record(handle(3), "Page/Grid/Border".to_string());
        assert_eq!(paths(&log), vec!["Page/Grid/Border"]);
    }

    #[test]
    fn equal_paths_are_not_compressed() {
        let mut log = HistoryLog::new();
        log.record(handle(1), "Page/Grid".to_string());
        log.record(handle(1), "Page/Grid".to_string());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn sibling_paths_are_not_compressed() {
        let mut log = HistoryLog::new();
        log.record(handle(1), "Page/Grid[0]".to_string());
        log.record(handle(2), "Page/Grid[1]".to_string());
        assert_eq!(paths(&log), vec!["Page/Grid[0]", "Page/Grid[1]"]);
    }

    #[test]
    fn compression_only_looks_at_the_newest_entry() {
        let mut log = HistoryLog::new();
        log.record(handle(1), "Page".to_string());
        log.record(handle(2), "Other".to_string());
        log.record(handle(3), "Page/Grid".to_string());
        assert_eq!(paths(&log), vec!["Page", "Other", "Page/Grid"]);
    }

    #[test]
    fn an_empty_path_is_absorbed_by_the_next_observation() {
        let mut log = HistoryLog::new();
        log.record(handle(1), String::new());
        log.record(handle(2), "Page".to_string());
        assert_eq!(paths(&log), vec!["Page"]);
    }

    #[test]
    fn eviction_drops_oldest_and_preserves_order() {
        let mut log = HistoryLog::with_capacity(3);
        for (i, path) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            log.record(handle(i as u64 + 1), path.to_string());
        }
        assert_eq!(log.len(), 3);
        assert_eq!(paths(&log), vec!["c", "d", "e"]);
    }
}
