//! The per-namespace synchronization engine.

use crate::cache::RecordCache;
use crate::channel::MessageChannel;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use wiredb_protocol::{FetchOutcome, RecordPush, Value, VersionedRecord, WriteOutcome};

/// A client handle to one namespace of the remote record store.
///
/// Construction subscribes the connection to the namespace's push
/// notifications and starts reconciling them into the private cache;
/// the five record operations then run against the authority over the
/// channel. Operations suspend only while awaiting an acknowledgment
/// and never block a thread.
///
/// There is no coordination between concurrently in-flight operations
/// on the same key: two overlapping [`update`](Database::update) calls
/// each run an independent retry loop and may rebase off each other's
/// writes. Callers needing stronger ordering should serialize their own
/// calls per key.
pub struct Database<C: MessageChannel> {
    channel: Arc<C>,
    namespace: String,
    cache: Arc<RwLock<RecordCache>>,
    config: ClientConfig,
    listener: JoinHandle<()>,
}

impl<C: MessageChannel> Database<C> {
    /// Connects to a namespace with the default configuration.
    ///
    /// Must be called within a Tokio runtime; the push listener is a
    /// spawned task.
    pub fn connect(channel: C, namespace: impl Into<String>) -> ClientResult<Self> {
        Self::connect_with_config(channel, namespace, ClientConfig::default())
    }

    /// Connects to a namespace with an explicit configuration.
    pub fn connect_with_config(
        channel: C,
        namespace: impl Into<String>,
        config: ClientConfig,
    ) -> ClientResult<Self> {
        let channel = Arc::new(channel);
        let namespace = namespace.into();
        let cache = Arc::new(RwLock::new(RecordCache::new()));

        // Take the push stream before registering so no notification can
        // slip past the listener.
        let mut updates = channel.updates();
        let listener = tokio::spawn({
            let cache = Arc::clone(&cache);
            let namespace = namespace.clone();
            async move {
                while let Some(push) = updates.recv().await {
                    reconcile_push(&cache, &namespace, push);
                }
            }
        });

        let db = Self {
            channel,
            namespace,
            cache,
            config,
            listener,
        };
        db.channel.register(&db.namespace)?;
        Ok(db)
    }

    /// The namespace this handle is scoped to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Requests the namespace's full key list from the authority.
    ///
    /// The list is returned verbatim; the cache is not consulted or
    /// touched.
    pub async fn keys(&self) -> ClientResult<Vec<String>> {
        let ack = self.channel.index(&self.namespace).await?;
        Ok(ack.keys)
    }

    /// Fetches the current value for a key.
    ///
    /// Always round-trips to the authority so the answer is fresh; the
    /// cache is updated as a side effect. Resolves `None` for keys that
    /// do not exist or are tombstoned.
    pub async fn retrieve(&self, key: &str) -> ClientResult<Option<Value>> {
        Ok(self
            .fetch(key)
            .await?
            .filter(VersionedRecord::is_live)
            .map(|record| record.value))
    }

    /// Creates a record under `key`.
    ///
    /// Fails with [`ClientError::KeyExists`] without contacting the
    /// authority when the cache already holds a live record for the
    /// key. A cached tombstone does not count: create is the revival
    /// path for deleted keys.
    pub async fn create(&self, key: &str, initial: Value) -> ClientResult<Value> {
        if self.cache.read().live(key).is_some() {
            return Err(ClientError::KeyExists(key.to_string()));
        }

        let record = VersionedRecord::new(initial);
        let ack = self.channel.create(&self.namespace, key, record).await?;
        match ack.outcome() {
            WriteOutcome::Denied => Err(ClientError::PermissionDenied {
                operation: "create",
                key: key.to_string(),
            }),
            WriteOutcome::Rejected(_) => Err(ClientError::KeyExists(key.to_string())),
            WriteOutcome::Applied(record) => {
                let value = record.value.clone();
                self.cache.write().apply_authoritative(key, record);
                Ok(value)
            }
        }
    }

    /// Applies `mutator` to the record under `key` and commits the
    /// result, rebasing on conflicts until the write lands.
    ///
    /// The base is the cached record when one is known, otherwise a
    /// fresh fetch; a missing or tombstoned base fails with
    /// [`ClientError::UnknownKey`]. Each rejected attempt reveals the
    /// authority's current record: the engine caches it, reapplies the
    /// mutator on top, and resubmits with the next serial. The loop
    /// terminates only on success, denial, or an exhausted retry budget
    /// (see [`ClientConfig::max_conflict_retries`]).
    pub async fn update<F>(&self, key: &str, mutator: F) -> ClientResult<Value>
    where
        F: Fn(&Value) -> Value,
    {
        let cached = self.cache.read().get(key).cloned();
        let base = match cached {
            Some(record) => Some(record),
            None => self.fetch(key).await?,
        };
        let mut base = match base {
            Some(record) if record.is_live() => record,
            _ => return Err(ClientError::UnknownKey(key.to_string())),
        };

        let mut attempts: u32 = 0;
        loop {
            let candidate = base.revised(mutator(&base.value));
            let ack = self.channel.update(&self.namespace, key, candidate).await?;
            match ack.outcome() {
                WriteOutcome::Denied => {
                    return Err(ClientError::PermissionDenied {
                        operation: "update",
                        key: key.to_string(),
                    });
                }
                WriteOutcome::Applied(record) => {
                    let value = record.value.clone();
                    self.cache.write().apply_authoritative(key, record);
                    return Ok(value);
                }
                WriteOutcome::Rejected(Some(current)) => {
                    // A concurrent writer advanced the serial first; the
                    // rejection carries the record to rebase onto.
                    self.cache.write().apply_authoritative(key, current.clone());
                    if current.deleted {
                        return Err(ClientError::UnknownKey(key.to_string()));
                    }
                    attempts += 1;
                    if let Some(budget) = self.config.max_conflict_retries {
                        if attempts > budget {
                            return Err(ClientError::ConflictRetriesExhausted {
                                key: key.to_string(),
                                attempts,
                            });
                        }
                    }
                    debug!(
                        key = %key,
                        serial = current.serial,
                        attempt = attempts,
                        "rebasing update after write conflict"
                    );
                    base = current;
                }
                WriteOutcome::Rejected(None) => {
                    return Err(ClientError::UnknownKey(key.to_string()));
                }
            }
        }
    }

    /// Tombstones the record under `key`.
    ///
    /// Resolves with the authority's verdict: `true` when the record
    /// was deleted, `false` when there was nothing live to delete. The
    /// returned tombstone, when present, is cached.
    pub async fn delete(&self, key: &str) -> ClientResult<bool> {
        let ack = self.channel.delete(&self.namespace, key).await?;
        match ack.outcome() {
            WriteOutcome::Denied => Err(ClientError::PermissionDenied {
                operation: "delete",
                key: key.to_string(),
            }),
            WriteOutcome::Applied(record) => {
                self.cache.write().apply_authoritative(key, record);
                Ok(true)
            }
            WriteOutcome::Rejected(record) => {
                if let Some(record) = record {
                    self.cache.write().apply_authoritative(key, record);
                }
                Ok(false)
            }
        }
    }

    /// Returns the last-known record for a key, tombstones included.
    ///
    /// Purely local; never contacts the authority.
    pub fn cached(&self, key: &str) -> Option<VersionedRecord> {
        self.cache.read().get(key).cloned()
    }

    /// Number of cached entries, tombstones included.
    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Drops tombstoned cache entries, returning how many were removed.
    ///
    /// The cache grows with every key observed and never evicts on its
    /// own; this is the explicit reclamation hook.
    pub fn evict_tombstones(&self) -> usize {
        self.cache.write().evict_tombstones()
    }

    /// Round-trips `retrieve` and folds the answer into the cache.
    ///
    /// Returns the live record, `None` when the key is absent or
    /// tombstoned. Any record the authority attaches (tombstones
    /// included) is cached.
    async fn fetch(&self, key: &str) -> ClientResult<Option<VersionedRecord>> {
        let ack = self.channel.retrieve(&self.namespace, key).await?;
        match ack.outcome() {
            FetchOutcome::Denied => Err(ClientError::PermissionDenied {
                operation: "retrieve",
                key: key.to_string(),
            }),
            FetchOutcome::Found(record) => {
                self.cache.write().apply_authoritative(key, record.clone());
                Ok(Some(record))
            }
            FetchOutcome::Missing(record) => {
                if let Some(record) = record {
                    self.cache.write().apply_authoritative(key, record);
                }
                Ok(None)
            }
        }
    }
}

impl<C: MessageChannel> Drop for Database<C> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Applies one push notification to the cache, enforcing namespace
/// isolation and serial arbitration.
fn reconcile_push(cache: &RwLock<RecordCache>, namespace: &str, push: RecordPush) {
    if push.namespace != namespace {
        trace!(
            theirs = %push.namespace,
            ours = %namespace,
            "ignoring cross-namespace notification"
        );
        return;
    }
    if cache.write().apply_remote(&push.key, push.record) {
        trace!(key = %push.key, "reconciled pushed record");
    } else {
        debug!(key = %push.key, "dropped stale pushed record");
    }
}
