//! CBOR framing helpers.
//!
//! Transports frame every protocol type as a single CBOR item. The
//! helpers here work over any serde type so acknowledgments and pushes
//! share one code path with requests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors produced while framing or parsing protocol messages.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The value could not be encoded as CBOR.
    #[error("encode error: {0}")]
    Encode(String),

    /// The bytes were not a valid encoding of the expected type.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Encodes a protocol message as a CBOR frame.
pub fn encode<T: Serialize>(message: &T) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decodes a protocol message from a CBOR frame.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ClientRequest, RecordPush, WriteAck};
    use crate::record::VersionedRecord;
    use crate::Value;

    #[test]
    fn request_frames_under_its_event_name() {
        let request = ClientRequest::Retrieve {
            namespace: "chat".into(),
            key: "room1".into(),
        };

        let bytes = encode(&request).unwrap();
        let raw: Value = decode(&bytes).unwrap();

        let map = raw.as_map().unwrap();
        let tag = map
            .iter()
            .find(|(k, _)| k.as_text() == Some("event"))
            .and_then(|(_, v)| v.as_text())
            .unwrap();
        assert_eq!(tag, "retrieve");

        let back: ClientRequest = decode(&bytes).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn denial_sentinel_survives_framing() {
        let bytes = encode(&WriteAck::denied()).unwrap();
        let back: WriteAck = decode(&bytes).unwrap();
        assert_eq!(back.success, None);
    }

    #[test]
    fn push_notification_frames() {
        let push = RecordPush {
            namespace: "chat".into(),
            key: "room1".into(),
            record: VersionedRecord::new(Value::from("hi")),
        };
        let back: RecordPush = decode(&encode(&push).unwrap()).unwrap();
        assert_eq!(back, push);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result: CodecResult<ClientRequest> = decode(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
