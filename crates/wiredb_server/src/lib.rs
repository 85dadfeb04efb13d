//! # WireDB Server
//!
//! In-memory reference authority for WireDB.
//!
//! This crate implements the server side of the wire contract:
//! - Per-namespace record stores with serial-based conflict arbitration
//! - The tri-state acknowledgment convention (`None` = denial)
//! - Push broadcast of every accepted mutation to namespace subscribers
//! - An [`AccessPolicy`] hook deciding which operations are denied
//!
//! The authority is the sole arbiter of truth: a write is accepted only
//! when its serial extends the stored record's by exactly 1, and a
//! rejected update returns the current record so clients can rebase.
//!
//! It exists to exercise clients end-to-end (in-process, no network) and
//! to back embedded deployments; it is not a production storage engine,
//! and nothing is persisted.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod error;
mod server;
mod store;

pub use auth::{AccessPolicy, Action, AllowAll, Operation};
pub use error::{ServerError, ServerResult};
pub use server::{Authority, ServerAck};
pub use store::{CreateResult, DeleteResult, NamespaceStore, UpdateResult};
