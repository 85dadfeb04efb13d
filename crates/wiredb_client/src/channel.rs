//! Transport channel abstraction.
//!
//! The engine talks to the authority through [`MessageChannel`], which
//! models the bidirectional event channel: fire-and-forget emission
//! (`register`), request/single-acknowledgment emission (everything
//! else), and unsolicited push delivery (`updates`). Connection
//! establishment, reconnection, and framing live behind implementations
//! of this trait.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use wiredb_protocol::{ClientRequest, FetchAck, IndexAck, RecordPush, VersionedRecord, WriteAck};

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors produced by a transport channel.
///
/// An acknowledgment that never arrives is not an error here: the
/// operation simply stays pending. Channels report only failures they
/// can observe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel is closed and cannot carry requests.
    #[error("channel closed")]
    Closed,

    /// The underlying transport failed.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// A bidirectional event channel to the record authority.
///
/// One method per wire event; each acknowledged method resolves exactly
/// once with the server's typed acknowledgment. Implementations decide
/// the wire encoding (the protocol crate's codec is the expected frame
/// format) and are free to multiplex many in-flight requests.
pub trait MessageChannel: Send + Sync + 'static {
    /// Emits the fire-and-forget `register` event, subscribing the
    /// connection to push notifications for `namespace`.
    fn register(&self, namespace: &str) -> ChannelResult<()>;

    /// Emits `index` and resolves with its acknowledgment.
    fn index(&self, namespace: &str) -> impl Future<Output = ChannelResult<IndexAck>> + Send;

    /// Emits `retrieve` and resolves with its acknowledgment.
    fn retrieve(
        &self,
        namespace: &str,
        key: &str,
    ) -> impl Future<Output = ChannelResult<FetchAck>> + Send;

    /// Emits `create` and resolves with its acknowledgment.
    fn create(
        &self,
        namespace: &str,
        key: &str,
        record: VersionedRecord,
    ) -> impl Future<Output = ChannelResult<WriteAck>> + Send;

    /// Emits `update` and resolves with its acknowledgment.
    fn update(
        &self,
        namespace: &str,
        key: &str,
        record: VersionedRecord,
    ) -> impl Future<Output = ChannelResult<WriteAck>> + Send;

    /// Emits `delete` and resolves with its acknowledgment.
    fn delete(
        &self,
        namespace: &str,
        key: &str,
    ) -> impl Future<Output = ChannelResult<WriteAck>> + Send;

    /// Hands over the unsolicited push notification stream.
    ///
    /// The engine calls this exactly once, at construction, before it
    /// emits `register`. Notifications must be delivered in the order
    /// the server emitted them.
    fn updates(&self) -> mpsc::UnboundedReceiver<RecordPush>;
}

/// A scripted channel for testing.
///
/// Acknowledgments are queued per event and consumed in FIFO order, so a
/// test can script a whole conflict-retry exchange up front. Every
/// emitted request is logged for inspection, and pushes can be injected
/// through [`MockChannel::push`]. Clones share all state.
#[derive(Clone, Default)]
pub struct MockChannel {
    inner: Arc<MockState>,
}

struct MockState {
    requests: Mutex<Vec<ClientRequest>>,
    index_acks: Mutex<VecDeque<IndexAck>>,
    fetch_acks: Mutex<VecDeque<FetchAck>>,
    create_acks: Mutex<VecDeque<WriteAck>>,
    update_acks: Mutex<VecDeque<WriteAck>>,
    delete_acks: Mutex<VecDeque<WriteAck>>,
    push_tx: mpsc::UnboundedSender<RecordPush>,
    push_rx: Mutex<Option<mpsc::UnboundedReceiver<RecordPush>>>,
}

impl Default for MockState {
    fn default() -> Self {
        let (push_tx, push_rx) = mpsc::unbounded_channel();
        Self {
            requests: Mutex::new(Vec::new()),
            index_acks: Mutex::new(VecDeque::new()),
            fetch_acks: Mutex::new(VecDeque::new()),
            create_acks: Mutex::new(VecDeque::new()),
            update_acks: Mutex::new(VecDeque::new()),
            delete_acks: Mutex::new(VecDeque::new()),
            push_tx,
            push_rx: Mutex::new(Some(push_rx)),
        }
    }
}

impl MockChannel {
    /// Creates a new mock channel with empty scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an `index` acknowledgment.
    pub fn queue_index_ack(&self, ack: IndexAck) {
        self.inner.index_acks.lock().push_back(ack);
    }

    /// Queues a `retrieve` acknowledgment.
    pub fn queue_fetch_ack(&self, ack: FetchAck) {
        self.inner.fetch_acks.lock().push_back(ack);
    }

    /// Queues a `create` acknowledgment.
    pub fn queue_create_ack(&self, ack: WriteAck) {
        self.inner.create_acks.lock().push_back(ack);
    }

    /// Queues an `update` acknowledgment.
    pub fn queue_update_ack(&self, ack: WriteAck) {
        self.inner.update_acks.lock().push_back(ack);
    }

    /// Queues a `delete` acknowledgment.
    pub fn queue_delete_ack(&self, ack: WriteAck) {
        self.inner.delete_acks.lock().push_back(ack);
    }

    /// Injects an unsolicited push notification.
    pub fn push(&self, push: RecordPush) {
        // Delivery only fails once the receiver is gone, which a test
        // may legitimately provoke.
        let _ = self.inner.push_tx.send(push);
    }

    /// Returns every request emitted so far, in order.
    pub fn requests(&self) -> Vec<ClientRequest> {
        self.inner.requests.lock().clone()
    }

    /// Returns the wire event names of every request emitted so far.
    pub fn request_events(&self) -> Vec<&'static str> {
        self.inner.requests.lock().iter().map(|r| r.event()).collect()
    }

    fn log(&self, request: ClientRequest) {
        self.inner.requests.lock().push(request);
    }

    fn next<T>(queue: &Mutex<VecDeque<T>>, event: &str) -> ChannelResult<T> {
        queue
            .lock()
            .pop_front()
            .ok_or_else(|| ChannelError::Transport(format!("no scripted ack for `{event}`")))
    }
}

impl MessageChannel for MockChannel {
    fn register(&self, namespace: &str) -> ChannelResult<()> {
        self.log(ClientRequest::Register {
            namespace: namespace.to_string(),
        });
        Ok(())
    }

    async fn index(&self, namespace: &str) -> ChannelResult<IndexAck> {
        self.log(ClientRequest::Index {
            namespace: namespace.to_string(),
        });
        Self::next(&self.inner.index_acks, "index")
    }

    async fn retrieve(&self, namespace: &str, key: &str) -> ChannelResult<FetchAck> {
        self.log(ClientRequest::Retrieve {
            namespace: namespace.to_string(),
            key: key.to_string(),
        });
        Self::next(&self.inner.fetch_acks, "retrieve")
    }

    async fn create(
        &self,
        namespace: &str,
        key: &str,
        record: VersionedRecord,
    ) -> ChannelResult<WriteAck> {
        self.log(ClientRequest::Create {
            namespace: namespace.to_string(),
            key: key.to_string(),
            record,
        });
        Self::next(&self.inner.create_acks, "create")
    }

    async fn update(
        &self,
        namespace: &str,
        key: &str,
        record: VersionedRecord,
    ) -> ChannelResult<WriteAck> {
        self.log(ClientRequest::Update {
            namespace: namespace.to_string(),
            key: key.to_string(),
            record,
        });
        Self::next(&self.inner.update_acks, "update")
    }

    async fn delete(&self, namespace: &str, key: &str) -> ChannelResult<WriteAck> {
        self.log(ClientRequest::Delete {
            namespace: namespace.to_string(),
            key: key.to_string(),
        });
        Self::next(&self.inner.delete_acks, "delete")
    }

    fn updates(&self) -> mpsc::UnboundedReceiver<RecordPush> {
        self.inner
            .push_rx
            .lock()
            .take()
            .expect("updates() may only be taken once per mock channel")
    }
}
