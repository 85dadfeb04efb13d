//! The versioned record exchanged between client and server.

use crate::Value;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A value paired with its version metadata.
///
/// `VersionedRecord` is the unit of exchange for every operation. The
/// `serial` is the per-key revision counter the server arbitrates
/// conflicts on: it starts at 1 on creation and every accepted mutation
/// increments it by exactly 1. Deleted records are not removed; they keep
/// their slot with `deleted` set (a tombstone).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedRecord {
    /// Opaque application payload.
    pub value: Value,
    /// Unix-millisecond timestamp of the last accepted mutation. Set by
    /// whichever party performs the write; the server may override it.
    pub last_update: u64,
    /// Per-key revision counter, starting at 1 on creation.
    pub serial: u64,
    /// Tombstone flag. A deleted record retains its slot.
    pub deleted: bool,
}

impl VersionedRecord {
    /// Creates the initial revision of a record, stamped now.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            last_update: now_millis(),
            serial: 1,
            deleted: false,
        }
    }

    /// Builds the next live revision carrying `value`.
    ///
    /// The serial advances by exactly 1 and the timestamp is restamped.
    pub fn revised(&self, value: Value) -> Self {
        Self {
            value,
            last_update: now_millis(),
            serial: self.serial + 1,
            deleted: false,
        }
    }

    /// Builds the tombstone revision of this record.
    ///
    /// The value is retained in the slot; only the flag and serial change.
    pub fn tombstoned(&self) -> Self {
        Self {
            value: self.value.clone(),
            last_update: now_millis(),
            serial: self.serial + 1,
            deleted: true,
        }
    }

    /// Returns true if the record is not a tombstone.
    pub fn is_live(&self) -> bool {
        !self.deleted
    }
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
