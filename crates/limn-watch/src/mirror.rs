use std::collections::HashMap;

use limn_types::{ElementHandle, ElementRecord};

/// Handle-indexed shadow of the host's parent/child relationships.
///
/// Latest write wins per handle. The map is not required to form a
/// connected tree: an element's ancestors may have been removed already,
/// or never reported at all.
#[derive(Debug, Default)]
pub struct ElementMirror {
    records: HashMap<ElementHandle, ElementRecord>,
}

impl ElementMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, handle: ElementHandle, record: ElementRecord) {
        self.records.insert(handle, record);
    }

    /// Removing an absent handle is a no-op; feeds are duplicated and racy
    /// with attach/detach timing.
    pub fn remove(&mut self, handle: ElementHandle) -> Option<ElementRecord> {
        self.records.remove(&handle)
    }

    pub fn get(&self, handle: ElementHandle) -> Option<&ElementRecord> {
        self.records.get(&handle)
    }

    pub fn contains(&self, handle: ElementHandle) -> bool {
        self.records.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_str::CompactString;

    fn handle(raw: u64) -> ElementHandle {
        ElementHandle::new(raw).expect("non-zero")
    }

    fn record(display: &str, child_count: u32) -> ElementRecord {
        ElementRecord {
            parent: None,
            display: CompactString::from(display),
            child_count,
            child_index: 0,
        }
    }

    #[test]
    fn upsert_latest_write_wins() {
        let mut mirror = ElementMirror::new();
        mirror.upsert(handle(1), record("Grid", 1));
        mirror.upsert(handle(1), record("Grid", 2));
        assert_eq!(mirror.len(), 1);
        assert_eq!(mirror.get(handle(1)).expect("present").child_count, 2);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut mirror = ElementMirror::new();
        assert!(mirror.remove(handle(7)).is_none());
        mirror.upsert(handle(7), record("Border", 0));
        assert!(mirror.remove(handle(7)).is_some());
        assert!(mirror.remove(handle(7)).is_none());
        assert!(mirror.is_empty());
    }
}
