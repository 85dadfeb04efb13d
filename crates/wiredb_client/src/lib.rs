//! # WireDB Client
//!
//! Client-side synchronization engine for WireDB.
//!
//! This crate provides:
//! - [`Database`], the per-namespace synchronization engine
//! - A local versioned record cache with push reconciliation
//! - The optimistic-concurrency rebase-and-retry update protocol
//! - [`MessageChannel`], the transport abstraction (plus a scripted mock)
//!
//! ## Architecture
//!
//! One [`Database`] instance is scoped to exactly one namespace for its
//! lifetime. It owns a private cache of the last-known record per key;
//! every cache write is an authoritative record from the server (an
//! acknowledgment or a push notification), never a client-only guess.
//!
//! Writes use optimistic concurrency: each record carries a serial that
//! must advance by exactly 1 per accepted mutation. When the server
//! rejects an update because a concurrent writer got there first, the
//! engine rebases the mutator onto the server's current record and
//! retries until the write lands or the authority denies it.
//!
//! ## Key invariants
//!
//! - The server is authoritative; conflicts are resolved by rebasing
//! - A cached record's serial never decreases
//! - Cache entries are replaced wholesale, never partially mutated
//! - Notifications for foreign namespaces never touch the cache

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod channel;
mod config;
mod database;
mod error;

pub use cache::RecordCache;
pub use channel::{ChannelError, ChannelResult, MessageChannel, MockChannel};
pub use config::ClientConfig;
pub use database::Database;
pub use error::{ClientError, ClientResult};

pub use wiredb_protocol::{Value, VersionedRecord};
