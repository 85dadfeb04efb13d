//! The local versioned record cache.

use std::collections::HashMap;
use wiredb_protocol::VersionedRecord;

/// Last-known records for one namespace, keyed by record key.
///
/// A cache is exclusively owned by one engine instance. Entries are only
/// ever replaced wholesale, and every stored record came from the
/// authority (an acknowledgment or a push notification). Tombstones keep
/// their slot; nothing is evicted automatically. Callers own the
/// capacity policy through [`RecordCache::evict_tombstones`].
#[derive(Debug, Default)]
pub struct RecordCache {
    entries: HashMap<String, VersionedRecord>,
}

impl RecordCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last-known record for a key, tombstones included.
    pub fn get(&self, key: &str) -> Option<&VersionedRecord> {
        self.entries.get(key)
    }

    /// Returns the last-known record for a key if it is live.
    pub fn live(&self, key: &str) -> Option<&VersionedRecord> {
        self.entries.get(key).filter(|r| r.is_live())
    }

    /// Replaces the entry with a record taken from an acknowledgment.
    ///
    /// Acknowledged records are authoritative by definition, so this is
    /// an unconditional wholesale replacement.
    pub fn apply_authoritative(&mut self, key: &str, record: VersionedRecord) {
        self.entries.insert(key.to_string(), record);
    }

    /// Reconciles a pushed record into the cache.
    ///
    /// Version arbitration: a push carrying a serial below the cached
    /// one is stale and is dropped, keeping the entry's serial
    /// monotone. Returns whether the record was applied.
    pub fn apply_remote(&mut self, key: &str, record: VersionedRecord) -> bool {
        if let Some(current) = self.entries.get(key) {
            if record.serial < current.serial {
                return false;
            }
        }
        self.entries.insert(key.to_string(), record);
        true
    }

    /// Drops every tombstoned entry, returning how many were removed.
    pub fn evict_tombstones(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, record| record.is_live());
        before - self.entries.len()
    }

    /// Number of cached entries, tombstones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiredb_protocol::Value;

    fn record(serial: u64, deleted: bool) -> VersionedRecord {
        VersionedRecord {
            value: Value::from(serial as i64),
            last_update: serial,
            serial,
            deleted,
        }
    }

    #[test]
    fn authoritative_replaces_wholesale() {
        let mut cache = RecordCache::new();
        cache.apply_authoritative("k", record(5, false));
        cache.apply_authoritative("k", record(2, false));
        // Acknowledgments always win, even when older-looking.
        assert_eq!(cache.get("k").unwrap().serial, 2);
    }

    #[test]
    fn stale_push_is_dropped() {
        let mut cache = RecordCache::new();
        assert!(cache.apply_remote("k", record(4, false)));
        assert!(!cache.apply_remote("k", record(2, false)));
        assert_eq!(cache.get("k").unwrap().serial, 4);
    }

    #[test]
    fn equal_serial_push_is_applied() {
        let mut cache = RecordCache::new();
        cache.apply_remote("k", record(3, false));
        assert!(cache.apply_remote("k", record(3, true)));
        assert!(cache.get("k").unwrap().deleted);
    }

    #[test]
    fn tombstones_keep_their_slot() {
        let mut cache = RecordCache::new();
        cache.apply_authoritative("k", record(2, true));
        assert!(cache.get("k").is_some());
        assert!(cache.live("k").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicting_tombstones_spares_live_entries() {
        let mut cache = RecordCache::new();
        cache.apply_authoritative("a", record(1, false));
        cache.apply_authoritative("b", record(2, true));
        cache.apply_authoritative("c", record(3, true));

        assert_eq!(cache.evict_tombstones(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.live("a").is_some());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Under any push interleaving the cached serial is monotone.
            #[test]
            fn pushed_serials_never_decrease(
                serials in proptest::collection::vec((1u64..64, any::<bool>()), 1..64)
            ) {
                let mut cache = RecordCache::new();
                let mut high_water = 0u64;

                for (serial, deleted) in serials {
                    cache.apply_remote("k", record(serial, deleted));
                    let cached = cache.get("k").unwrap().serial;
                    prop_assert!(cached >= high_water);
                    high_water = cached;
                }
            }
        }
    }
}
