//! # WireDB Protocol
//!
//! Wire contract types and CBOR codecs for WireDB.
//!
//! This crate provides:
//! - [`VersionedRecord`], the unit of exchange between client and server
//! - Request, acknowledgment, and push-notification payloads
//! - Decoded acknowledgment outcomes ([`FetchOutcome`], [`WriteOutcome`])
//! - CBOR encoding/decoding helpers
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## The tri-state sentinel
//!
//! Acknowledgment payloads carry `Option<bool>` fields (`exists`,
//! `success`) where `None` signals a permission denial and
//! `Some(true)`/`Some(false)` the ordinary outcome. That overload is part
//! of the wire contract; it is decoded exactly once, via
//! [`FetchAck::outcome`] and [`WriteAck::outcome`], so code above the
//! protocol boundary only ever sees the discriminated outcome enums.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod messages;
mod outcome;
mod record;

pub use codec::{decode, encode, CodecError, CodecResult};
pub use messages::{ClientRequest, FetchAck, IndexAck, RecordPush, WriteAck};
pub use outcome::{FetchOutcome, WriteOutcome};
pub use record::{now_millis, VersionedRecord};

/// The opaque application payload carried by a [`VersionedRecord`].
pub type Value = ciborium::value::Value;
