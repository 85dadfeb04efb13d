//! The record authority.

use crate::auth::{AccessPolicy, Action, AllowAll, Operation};
use crate::error::{ServerError, ServerResult};
use crate::store::{CreateResult, DeleteResult, NamespaceStore, UpdateResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use wiredb_protocol::{
    ClientRequest, FetchAck, IndexAck, RecordPush, VersionedRecord, WriteAck,
};

/// An acknowledgment produced by [`Authority::handle_request`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServerAck {
    /// Acknowledgment for `index`.
    Index(IndexAck),
    /// Acknowledgment for `retrieve`.
    Fetch(FetchAck),
    /// Acknowledgment for `create`, `update`, or `delete`.
    Write(WriteAck),
}

/// The in-memory record authority.
///
/// Holds one [`NamespaceStore`] per namespace (created on first touch),
/// answers every acknowledged request, and broadcasts each accepted
/// mutation to the namespace's registered subscribers. Permission
/// checks go through the configured [`AccessPolicy`]; a denial becomes
/// the `None` sentinel in the acknowledgment.
///
/// # Example
///
/// ```
/// use wiredb_server::Authority;
/// use wiredb_protocol::{Value, VersionedRecord};
///
/// let authority = Authority::new();
/// let ack = authority.handle_create(
///     "chat",
///     "room1",
///     VersionedRecord::new(Value::from("hi")),
/// );
/// assert_eq!(ack.success, Some(true));
/// ```
pub struct Authority {
    stores: RwLock<HashMap<String, NamespaceStore>>,
    subscribers: RwLock<HashMap<String, Vec<UnboundedSender<RecordPush>>>>,
    policy: Box<dyn AccessPolicy>,
}

impl Authority {
    /// Creates an authority that permits every operation.
    pub fn new() -> Self {
        Self::with_policy(AllowAll)
    }

    /// Creates an authority with an explicit access policy.
    pub fn with_policy(policy: impl AccessPolicy + 'static) -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
            policy: Box::new(policy),
        }
    }

    /// Subscribes a connection to a namespace's push notifications.
    ///
    /// The wire `register` event: fire-and-forget, no acknowledgment.
    pub fn handle_register(&self, namespace: &str, sender: UnboundedSender<RecordPush>) {
        debug!(namespace = %namespace, "subscriber registered");
        self.subscribers
            .write()
            .entry(namespace.to_string())
            .or_default()
            .push(sender);
    }

    /// Answers `index`: the namespace's live keys, sorted.
    pub fn handle_index(&self, namespace: &str) -> IndexAck {
        let stores = self.stores.read();
        let keys = stores
            .get(namespace)
            .map(NamespaceStore::live_keys)
            .unwrap_or_default();
        IndexAck::new(keys)
    }

    /// Answers `retrieve`.
    ///
    /// Tombstones are reported with `exists = false` but still attached,
    /// so clients learn of deletions they missed.
    pub fn handle_retrieve(&self, namespace: &str, key: &str) -> FetchAck {
        if self.denies(Operation::Retrieve, namespace, key) {
            return FetchAck::denied();
        }
        let stores = self.stores.read();
        match stores.get(namespace).and_then(|store| store.get(key)) {
            Some(record) if record.is_live() => FetchAck::found(record.clone()),
            Some(tombstone) => FetchAck::missing(Some(tombstone.clone())),
            None => FetchAck::missing(None),
        }
    }

    /// Answers `create`.
    pub fn handle_create(
        &self,
        namespace: &str,
        key: &str,
        record: VersionedRecord,
    ) -> WriteAck {
        if self.denies(Operation::Create, namespace, key) {
            return WriteAck::denied();
        }
        let result = self
            .stores
            .write()
            .entry(namespace.to_string())
            .or_default()
            .create(key, record);
        match result {
            CreateResult::Applied(stored) => {
                self.broadcast(namespace, key, &stored);
                WriteAck::applied(stored)
            }
            CreateResult::Exists(current) => WriteAck::rejected(Some(current)),
        }
    }

    /// Answers `update`.
    ///
    /// A rejected update carries the current record as the rebase point
    /// for the client's retry loop.
    pub fn handle_update(
        &self,
        namespace: &str,
        key: &str,
        record: VersionedRecord,
    ) -> WriteAck {
        if self.denies(Operation::Update, namespace, key) {
            return WriteAck::denied();
        }
        let result = self
            .stores
            .write()
            .entry(namespace.to_string())
            .or_default()
            .update(key, record);
        match result {
            UpdateResult::Applied(stored) => {
                self.broadcast(namespace, key, &stored);
                WriteAck::applied(stored)
            }
            UpdateResult::Stale(current) => {
                debug!(
                    namespace = %namespace,
                    key = %key,
                    serial = current.serial,
                    "rejected stale update"
                );
                WriteAck::rejected(Some(current))
            }
            UpdateResult::Unknown => WriteAck::rejected(None),
        }
    }

    /// Answers `delete`.
    pub fn handle_delete(&self, namespace: &str, key: &str) -> WriteAck {
        if self.denies(Operation::Delete, namespace, key) {
            return WriteAck::denied();
        }
        let result = self
            .stores
            .write()
            .entry(namespace.to_string())
            .or_default()
            .delete(key);
        match result {
            DeleteResult::Deleted(tombstone) => {
                self.broadcast(namespace, key, &tombstone);
                WriteAck::applied(tombstone)
            }
            DeleteResult::Missing(record) => WriteAck::rejected(record),
        }
    }

    /// Dispatches an acknowledged request to its handler.
    ///
    /// `register` carries no acknowledgment and is rejected here; route
    /// it to [`Authority::handle_register`] with the connection's push
    /// sender instead.
    pub fn handle_request(&self, request: ClientRequest) -> ServerResult<ServerAck> {
        match request {
            ClientRequest::Register { .. } => Err(ServerError::InvalidRequest(
                "register carries no acknowledgment".into(),
            )),
            ClientRequest::Index { namespace } => {
                Ok(ServerAck::Index(self.handle_index(&namespace)))
            }
            ClientRequest::Retrieve { namespace, key } => {
                Ok(ServerAck::Fetch(self.handle_retrieve(&namespace, &key)))
            }
            ClientRequest::Create {
                namespace,
                key,
                record,
            } => Ok(ServerAck::Write(self.handle_create(&namespace, &key, record))),
            ClientRequest::Update {
                namespace,
                key,
                record,
            } => Ok(ServerAck::Write(self.handle_update(&namespace, &key, record))),
            ClientRequest::Delete { namespace, key } => {
                Ok(ServerAck::Write(self.handle_delete(&namespace, &key)))
            }
        }
    }

    /// Returns the stored record for a key, tombstones included.
    pub fn record(&self, namespace: &str, key: &str) -> Option<VersionedRecord> {
        self.stores
            .read()
            .get(namespace)
            .and_then(|store| store.get(key))
            .cloned()
    }

    fn denies(&self, operation: Operation, namespace: &str, key: &str) -> bool {
        let permitted = self.policy.allows(Action {
            operation,
            namespace,
            key,
        });
        if !permitted {
            debug!(
                namespace = %namespace,
                key = %key,
                operation = operation.name(),
                "denied by policy"
            );
        }
        !permitted
    }

    /// Sends a push notification to every live subscriber of the
    /// namespace, pruning disconnected ones.
    fn broadcast(&self, namespace: &str, key: &str, record: &VersionedRecord) {
        let mut subscribers = self.subscribers.write();
        if let Some(senders) = subscribers.get_mut(namespace) {
            senders.retain(|sender| {
                sender
                    .send(RecordPush {
                        namespace: namespace.to_string(),
                        key: key.to_string(),
                        record: record.clone(),
                    })
                    .is_ok()
            });
        }
    }
}

impl Default for Authority {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use wiredb_protocol::Value;

    fn record(value: &str) -> VersionedRecord {
        VersionedRecord::new(Value::from(value))
    }

    #[test]
    fn create_retrieve_flow() {
        let authority = Authority::new();

        let ack = authority.handle_create("chat", "room1", record("hi"));
        assert_eq!(ack.success, Some(true));

        let ack = authority.handle_retrieve("chat", "room1");
        assert_eq!(ack.exists, Some(true));
        assert_eq!(ack.record.unwrap().value, Value::from("hi"));
    }

    #[test]
    fn namespaces_are_disjoint() {
        let authority = Authority::new();
        authority.handle_create("chat", "room1", record("hi"));

        let ack = authority.handle_retrieve("metrics", "room1");
        assert_eq!(ack.exists, Some(false));
        assert!(ack.record.is_none());
    }

    #[test]
    fn stale_update_returns_the_rebase_point() {
        let authority = Authority::new();
        authority.handle_create("chat", "room1", record("v1"));

        // serial 2 extends the chain
        let current = authority.record("chat", "room1").unwrap();
        let ack = authority.handle_update("chat", "room1", current.revised(Value::from("v2")));
        assert_eq!(ack.success, Some(true));

        // replaying serial 2 is stale; the ack carries serial 2's record
        let ack = authority.handle_update("chat", "room1", current.revised(Value::from("late")));
        assert_eq!(ack.success, Some(false));
        let rebase = ack.record.unwrap();
        assert_eq!(rebase.serial, 2);
        assert_eq!(rebase.value, Value::from("v2"));
    }

    #[test]
    fn accepted_mutations_are_broadcast_in_order() {
        let authority = Authority::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        authority.handle_register("chat", tx);

        authority.handle_create("chat", "room1", record("hi"));
        let current = authority.record("chat", "room1").unwrap();
        authority.handle_update("chat", "room1", current.revised(Value::from("bye")));
        authority.handle_delete("chat", "room1");

        let serials: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|push| push.record.serial)
            .collect();
        assert_eq!(serials, vec![1, 2, 3]);
    }

    #[test]
    fn rejected_writes_are_not_broadcast() {
        let authority = Authority::new();
        authority.handle_create("chat", "room1", record("hi"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        authority.handle_register("chat", tx);

        authority.handle_create("chat", "room1", record("again"));
        authority.handle_update("chat", "ghost", record("v"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn subscribers_of_other_namespaces_hear_nothing() {
        let authority = Authority::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        authority.handle_register("metrics", tx);

        authority.handle_create("chat", "room1", record("hi"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnected_subscribers_are_pruned() {
        let authority = Authority::new();
        let (tx, rx) = mpsc::unbounded_channel();
        authority.handle_register("chat", tx);
        drop(rx);

        authority.handle_create("chat", "room1", record("hi"));
        assert!(authority.subscribers.read().get("chat").unwrap().is_empty());
    }

    #[test]
    fn policy_denials_produce_the_sentinel() {
        let no_deletes = |action: Action<'_>| action.operation != Operation::Delete;
        let authority = Authority::with_policy(no_deletes);

        authority.handle_create("chat", "room1", record("hi"));
        let ack = authority.handle_delete("chat", "room1");
        assert_eq!(ack.success, None);

        // The record survived the denied delete.
        assert!(authority.record("chat", "room1").unwrap().is_live());
    }

    #[test]
    fn request_dispatch() {
        let authority = Authority::new();

        let ack = authority
            .handle_request(ClientRequest::Create {
                namespace: "chat".into(),
                key: "room1".into(),
                record: record("hi"),
            })
            .unwrap();
        assert!(matches!(ack, ServerAck::Write(_)));

        let ack = authority
            .handle_request(ClientRequest::Index {
                namespace: "chat".into(),
            })
            .unwrap();
        match ack {
            ServerAck::Index(index) => assert_eq!(index.keys, vec!["room1"]),
            other => panic!("unexpected ack: {other:?}"),
        }

        let err = authority
            .handle_request(ClientRequest::Register {
                namespace: "chat".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }
}
