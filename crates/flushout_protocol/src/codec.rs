//! CBOR wire encoding.
//!
//! Every hop between a proxy and the master is modeled as an encode on
//! one side and a decode on the other, so no value is ever shared between
//! replicas.

use crate::command::Command;
use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::{ApplyResult, CompletionBatch, Snapshot};
use flushout_document::Schema;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a value to CBOR bytes.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> ProtocolResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| ProtocolError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

/// Decode a value from CBOR bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::from_reader(bytes).map_err(|e| ProtocolError::decoding_failed(e.to_string()))
}

/// A message that can cross the wire.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Encodes this message to CBOR bytes.
    fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode(self)
    }

    /// Decodes a message from CBOR bytes.
    fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        decode(bytes)
    }
}

impl WireMessage for Command {}
impl WireMessage for CompletionBatch {}
impl WireMessage for ApplyResult {}
impl<S: Schema> WireMessage for Snapshot<S> {}

/// Copies a message through an encode/decode cycle.
pub fn transfer<T: WireMessage>(message: &T) -> ProtocolResult<T> {
    T::decode(&message.encode()?)
}
