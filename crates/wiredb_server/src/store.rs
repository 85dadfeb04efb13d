//! Per-namespace record storage and serial arbitration.

use std::collections::HashMap;
use wiredb_protocol::VersionedRecord;

/// Outcome of a create against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateResult {
    /// The record was stored; this is the stored revision.
    Applied(VersionedRecord),
    /// A live record already occupies the key.
    Exists(VersionedRecord),
}

/// Outcome of an update against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResult {
    /// The revision extended the chain and was stored.
    Applied(VersionedRecord),
    /// The revision does not extend the current record; the current
    /// record is returned as the rebase point.
    Stale(VersionedRecord),
    /// No record has ever existed under the key.
    Unknown,
}

/// Outcome of a delete against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteResult {
    /// The record was tombstoned; this is the tombstone.
    Deleted(VersionedRecord),
    /// Nothing live to delete. Carries the tombstone when the key was
    /// already deleted.
    Missing(Option<VersionedRecord>),
}

/// The records of one namespace.
///
/// Writes are arbitrated on the record serial: an accepted mutation
/// extends the stored serial by exactly 1, so every concurrent writer
/// but one is forced through the client-side rebase loop. Deleted
/// records keep their slot as tombstones, which lets a later create
/// continue the serial chain instead of restarting it.
#[derive(Debug, Default)]
pub struct NamespaceStore {
    records: HashMap<String, VersionedRecord>,
}

impl NamespaceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored record for a key, tombstones included.
    pub fn get(&self, key: &str) -> Option<&VersionedRecord> {
        self.records.get(key)
    }

    /// Returns the keys with live records, sorted.
    pub fn live_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_live())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Stores the initial revision of a record.
    ///
    /// The stored serial is normalized: 1 for a fresh key, and
    /// `tombstone.serial + 1` when reviving a deleted key, so the
    /// per-key serial chain never restarts.
    pub fn create(&mut self, key: &str, incoming: VersionedRecord) -> CreateResult {
        match self.records.get(key).cloned() {
            Some(current) if current.is_live() => CreateResult::Exists(current),
            Some(tombstone) => {
                let stored = VersionedRecord {
                    serial: tombstone.serial + 1,
                    deleted: false,
                    ..incoming
                };
                self.records.insert(key.to_string(), stored.clone());
                CreateResult::Applied(stored)
            }
            None => {
                let stored = VersionedRecord {
                    serial: 1,
                    deleted: false,
                    ..incoming
                };
                self.records.insert(key.to_string(), stored.clone());
                CreateResult::Applied(stored)
            }
        }
    }

    /// Stores the next revision of a record.
    ///
    /// Accepted iff the current record is live and `incoming.serial`
    /// extends it by exactly 1. A tombstoned current record is returned
    /// as `Stale` so the client learns of the deletion.
    pub fn update(&mut self, key: &str, incoming: VersionedRecord) -> UpdateResult {
        match self.records.get(key).cloned() {
            None => UpdateResult::Unknown,
            Some(current) if !current.is_live() => UpdateResult::Stale(current),
            Some(current) if incoming.serial == current.serial + 1 => {
                let stored = VersionedRecord {
                    deleted: false,
                    ..incoming
                };
                self.records.insert(key.to_string(), stored.clone());
                UpdateResult::Applied(stored)
            }
            Some(current) => UpdateResult::Stale(current),
        }
    }

    /// Tombstones the record under a key, retaining its slot and value.
    pub fn delete(&mut self, key: &str) -> DeleteResult {
        match self.records.get(key).cloned() {
            Some(current) if current.is_live() => {
                let tombstone = current.tombstoned();
                self.records.insert(key.to_string(), tombstone.clone());
                DeleteResult::Deleted(tombstone)
            }
            Some(tombstone) => DeleteResult::Missing(Some(tombstone)),
            None => DeleteResult::Missing(None),
        }
    }

    /// Number of slots, tombstones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no record was ever stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiredb_protocol::Value;

    fn incoming(value: &str, serial: u64) -> VersionedRecord {
        VersionedRecord {
            value: Value::from(value),
            last_update: 1000,
            serial,
            deleted: false,
        }
    }

    #[test]
    fn create_normalizes_the_serial_to_one() {
        let mut store = NamespaceStore::new();
        let result = store.create("k", incoming("v", 9));
        match result {
            CreateResult::Applied(stored) => assert_eq!(stored.serial, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn create_on_a_live_key_is_rejected() {
        let mut store = NamespaceStore::new();
        store.create("k", incoming("first", 1));

        match store.create("k", incoming("second", 1)) {
            CreateResult::Exists(current) => assert_eq!(current.value, Value::from("first")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn revival_continues_the_serial_chain() {
        let mut store = NamespaceStore::new();
        store.create("k", incoming("v1", 1));
        store.update("k", incoming("v2", 2));
        store.delete("k"); // serial 3

        match store.create("k", incoming("v3", 1)) {
            CreateResult::Applied(stored) => {
                assert_eq!(stored.serial, 4);
                assert!(stored.is_live());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn update_accepts_exactly_the_next_serial() {
        let mut store = NamespaceStore::new();
        store.create("k", incoming("v1", 1));

        match store.update("k", incoming("v2", 2)) {
            UpdateResult::Applied(stored) => assert_eq!(stored.serial, 2),
            other => panic!("unexpected result: {other:?}"),
        }

        // Same serial again: the chain has moved on.
        match store.update("k", incoming("late", 2)) {
            UpdateResult::Stale(current) => {
                assert_eq!(current.serial, 2);
                assert_eq!(current.value, Value::from("v2"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn update_of_an_unknown_key() {
        let mut store = NamespaceStore::new();
        assert_eq!(store.update("ghost", incoming("v", 1)), UpdateResult::Unknown);
    }

    #[test]
    fn update_of_a_tombstoned_key_reports_the_tombstone() {
        let mut store = NamespaceStore::new();
        store.create("k", incoming("v", 1));
        store.delete("k");

        match store.update("k", incoming("v2", 3)) {
            UpdateResult::Stale(current) => assert!(current.deleted),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn delete_retains_the_slot_and_value() {
        let mut store = NamespaceStore::new();
        store.create("k", incoming("keep", 1));

        match store.delete("k") {
            DeleteResult::Deleted(tombstone) => {
                assert!(tombstone.deleted);
                assert_eq!(tombstone.serial, 2);
                assert_eq!(tombstone.value, Value::from("keep"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(store.len(), 1);

        // Second delete has nothing live to remove.
        match store.delete("k") {
            DeleteResult::Missing(Some(tombstone)) => assert!(tombstone.deleted),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn delete_of_an_unknown_key() {
        let mut store = NamespaceStore::new();
        assert_eq!(store.delete("ghost"), DeleteResult::Missing(None));
    }

    #[test]
    fn live_keys_are_sorted_and_skip_tombstones() {
        let mut store = NamespaceStore::new();
        store.create("b", incoming("v", 1));
        store.create("a", incoming("v", 1));
        store.create("c", incoming("v", 1));
        store.delete("b");

        assert_eq!(store.live_keys(), vec!["a", "c"]);
    }
}
